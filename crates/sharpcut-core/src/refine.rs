use anyhow::{Context, Result};
use tracing::{debug, error, warn};

use crate::analysis::clarity::clarity;
use crate::video::frame::Frame;
use crate::video::FrameSource;

/// The sharpest frame found in a window, owned independently of the source.
pub struct ClearestFrame {
    pub frame: Frame,
    pub clarity: f64,
}

/// Holds a source's read cursor and puts it back where it was.
///
/// `release` restores and reports failure; dropping an unreleased guard
/// restores and logs failure instead.
struct CursorGuard<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
    saved: u32,
    armed: bool,
}

impl<'a, S: FrameSource + ?Sized> CursorGuard<'a, S> {
    fn acquire(source: &'a mut S) -> Self {
        let saved = source.position();
        Self {
            source,
            saved,
            armed: true,
        }
    }

    fn source(&mut self) -> &mut S {
        &mut *self.source
    }

    fn release(mut self) -> Result<()> {
        self.armed = false;
        let saved = self.saved;
        self.source
            .seek(saved)
            .with_context(|| format!("failed to restore read cursor to frame {saved}"))
    }
}

impl<S: FrameSource + ?Sized> Drop for CursorGuard<'_, S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.source.seek(self.saved) {
            error!(saved = self.saved, %e, "failed to restore read cursor");
        }
    }
}

/// Search `[center - radius, center + radius]` (clamped at 0) for the frame
/// with the highest clarity. The source's read cursor is unchanged afterwards.
///
/// Returns `None` when no frame in the window could be read and scored.
/// Equal scores keep the earliest frame.
pub fn find_clearest_frame<S: FrameSource + ?Sized>(
    source: &mut S,
    center: u32,
    radius: u32,
) -> Result<Option<ClearestFrame>> {
    let start = center.saturating_sub(radius);
    let end = center.saturating_add(radius);

    let mut guard = CursorGuard::acquire(source);
    let best = scan_window(guard.source(), start, end);
    guard.release()?;

    match &best {
        Some(b) => debug!(
            center,
            start,
            end,
            clearest = b.frame.frame_number,
            clarity = b.clarity,
            "window refined"
        ),
        None => warn!(center, start, end, "window yielded no readable frames"),
    }
    Ok(best)
}

fn scan_window<S: FrameSource + ?Sized>(
    source: &mut S,
    start: u32,
    end: u32,
) -> Option<ClearestFrame> {
    if let Err(e) = source.seek(start) {
        warn!(start, %e, "failed to seek to window start");
        return None;
    }

    let mut best: Option<ClearestFrame> = None;
    for _ in start..=end {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(start, end, "window scan reached end of stream");
                break;
            }
            Err(e) => {
                warn!(start, end, %e, "frame read failed during window scan");
                break;
            }
        };

        let score = match clarity(&frame) {
            Ok(score) => score,
            Err(e) => {
                warn!(%e, "skipping malformed frame in window");
                continue;
            }
        };

        if best.as_ref().map_or(true, |b| score > b.clarity) {
            best = Some(ClearestFrame {
                frame,
                clarity: score,
            });
        }
    }
    best
}
