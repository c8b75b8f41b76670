use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::SelectionConfig;
use crate::debug::DebugRenderer;
use crate::refine::find_clearest_frame;
use crate::video::frame::Frame;
use crate::video::FrameSource;

/// One representative keyframe for an accepted scene change.
#[derive(Debug, Clone)]
pub struct ScoredFrame {
    /// Frame number of the sampled frame at which the change was accepted.
    pub index: u32,
    /// Timestamp of `index`, in seconds.
    pub timestamp: f64,
    /// Clarity of the frame stored in `payload`.
    pub clarity: f64,
    /// Larger of the global and block-wise change rates, in [0, 1].
    pub change_magnitude: f64,
    /// Frame number whose pixels are stored in `payload`.
    pub clearest_index: u32,
    /// Encoded payload dimensions.
    pub width: u32,
    pub height: u32,
    /// JPEG bytes.
    pub payload: Vec<u8>,
}

/// Result of a selection pass.
#[derive(Debug)]
pub enum Selection {
    /// At least one scene change was accepted. Sorted by ascending timestamp.
    Keyframes(Vec<ScoredFrame>),
    NoScenesDetected,
}

impl Selection {
    pub fn frames(&self) -> &[ScoredFrame] {
        match self {
            Selection::Keyframes(frames) => frames,
            Selection::NoScenesDetected => &[],
        }
    }

    pub fn into_frames(self) -> Vec<ScoredFrame> {
        match self {
            Selection::Keyframes(frames) => frames,
            Selection::NoScenesDetected => Vec::new(),
        }
    }
}

/// Mutable state of one pass over one video.
struct SelectionState {
    previous_sampled: Option<Frame>,
    last_accepted_timestamp: f64,
    accumulated: Vec<ScoredFrame>,
}

impl SelectionState {
    fn new() -> Self {
        Self {
            previous_sampled: None,
            last_accepted_timestamp: 0.0,
            accumulated: Vec::new(),
        }
    }

    /// Whether enough time has passed since the last accepted change.
    fn admits(&self, timestamp: f64, min_interval: f64) -> bool {
        timestamp - self.last_accepted_timestamp >= min_interval
    }
}

/// Walk every frame of `source`, detect scene changes on sampled frames and keep
/// the sharpest frame near each accepted change.
///
/// Read failures end the pass like end of stream does. Malformed frames are
/// skipped. The result holds at most `output_cap` keyframes in timestamp order.
pub fn select_keyframes<S: FrameSource + ?Sized>(
    source: &mut S,
    config: &SelectionConfig,
) -> Result<Selection> {
    config.validate().context("invalid selection config")?;

    info!(
        fps = source.fps(),
        frame_count = ?source.frame_count(),
        sample_stride = config.sample_stride,
        window_radius = config.window_radius,
        min_interval_seconds = config.min_interval_seconds,
        output_cap = config.output_cap,
        "keyframe selection starting"
    );

    let detector = config.detector();
    let encoder = config.encoder();
    let debug_renderer = match &config.debug_frames_dir {
        Some(dir) => Some(DebugRenderer::new(dir, config.debug_font.as_deref())?),
        None => None,
    };

    let mut state = SelectionState::new();
    let mut frames_read = 0u32;

    loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!(position = source.position(), %e, "frame read failed, ending scan");
                break;
            }
        };
        frames_read += 1;

        if frame.frame_number % config.sample_stride != 0 {
            continue;
        }
        if frame.is_malformed() {
            warn!(frame_number = frame.frame_number, "skipping malformed frame");
            continue;
        }

        let Some(previous) = state.previous_sampled.take() else {
            state.previous_sampled = Some(frame);
            continue;
        };

        let change = match detector.compare(&previous, &frame) {
            Ok(change) => change,
            Err(e) => {
                // The current frame becomes the new baseline.
                warn!(frame_number = frame.frame_number, %e, "skipping comparison");
                state.previous_sampled = Some(frame);
                continue;
            }
        };

        if !change.is_new_scene {
            state.previous_sampled = Some(frame);
            continue;
        }
        if !state.admits(frame.timestamp_seconds, config.min_interval_seconds) {
            debug!(
                frame_number = frame.frame_number,
                timestamp = frame.timestamp_seconds,
                last_accepted = state.last_accepted_timestamp,
                "scene change rate limited"
            );
            state.previous_sampled = Some(frame);
            continue;
        }

        let clearest = find_clearest_frame(&mut *source, frame.frame_number, config.window_radius)
            .with_context(|| {
                format!("failed to refine scene change at frame {}", frame.frame_number)
            })?;

        if let Some(clearest) = clearest {
            let encoded = encoder.encode(&clearest.frame.image)?;

            if let Some(renderer) = &debug_renderer {
                renderer
                    .save_scene(&frame, &change, detector.grid_size, &clearest)
                    .context("failed to save debug frame")?;
            }

            info!(
                frame_number = frame.frame_number,
                timestamp = frame.timestamp_seconds,
                change_rate = change.change_rate,
                max_block_change = change.max_block_change,
                clearest = clearest.frame.frame_number,
                clarity = clearest.clarity,
                "scene change accepted"
            );

            state.accumulated.push(ScoredFrame {
                index: frame.frame_number,
                timestamp: frame.timestamp_seconds,
                clarity: clearest.clarity,
                change_magnitude: change.magnitude(),
                clearest_index: clearest.frame.frame_number,
                width: encoded.width,
                height: encoded.height,
                payload: encoded.bytes,
            });
            state.last_accepted_timestamp = frame.timestamp_seconds;
        }

        state.previous_sampled = Some(frame);
    }

    let candidates = state.accumulated.len();
    let keyframes = cap_and_resort(state.accumulated, config.output_cap);

    info!(frames_read, candidates, kept = keyframes.len(), "keyframe selection complete");

    if keyframes.is_empty() {
        warn!("no scenes detected");
        return Ok(Selection::NoScenesDetected);
    }
    Ok(Selection::Keyframes(keyframes))
}

/// Keep the `cap` sharpest frames, then restore chronological order.
///
/// Frames are left untouched when there are no more than `cap`. Among equal
/// clarities the earlier frame is kept.
fn cap_and_resort(mut frames: Vec<ScoredFrame>, cap: usize) -> Vec<ScoredFrame> {
    if frames.len() <= cap {
        return frames;
    }
    frames.sort_by(|a, b| b.clarity.total_cmp(&a.clarity));
    frames.truncate(cap);
    frames.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    frames
}
