use image::GrayImage;
use tracing::debug;

use super::{luminance, AnalysisError};
use crate::video::frame::Frame;

/// Fraction of `max_threshold` a single block must exceed to force a scene change.
const BLOCK_OVERRIDE_FACTOR: f64 = 0.8;

/// Outcome of comparing two sampled frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneChange {
    pub is_new_scene: bool,
    /// Mean absolute luminance difference over the whole frame, in [0, 1].
    pub change_rate: f64,
    /// Largest per-block mean difference, in [0, 1].
    pub max_block_change: f64,
    /// (row, col) of the block that produced `max_block_change`.
    pub hottest_block: (u32, u32),
}

impl SceneChange {
    pub fn magnitude(&self) -> f64 {
        self.change_rate.max(self.max_block_change)
    }
}

/// Decides whether two consecutive sampled frames straddle a scene boundary.
///
/// A change is accepted when the global rate falls inside
/// `[min_threshold, max_threshold]`, or when any block of the `grid_size` x
/// `grid_size` grid changed by more than `0.8 * max_threshold`. The block
/// clause can fire even when the global rate is above `max_threshold`.
#[derive(Debug, Clone, Copy)]
pub struct SceneChangeDetector {
    pub min_threshold: f64,
    pub max_threshold: f64,
    pub grid_size: u32,
}

impl Default for SceneChangeDetector {
    fn default() -> Self {
        Self {
            min_threshold: 0.10,
            max_threshold: 0.90,
            grid_size: 4,
        }
    }
}

impl SceneChangeDetector {
    pub fn compare(&self, previous: &Frame, current: &Frame) -> Result<SceneChange, AnalysisError> {
        for frame in [previous, current] {
            if frame.is_malformed() {
                return Err(AnalysisError::EmptyFrame {
                    frame_number: frame.frame_number,
                });
            }
        }
        if previous.dimensions() != current.dimensions() {
            return Err(AnalysisError::DimensionMismatch {
                expected: previous.dimensions(),
                actual: current.dimensions(),
            });
        }

        let diff = abs_diff(&luminance(&previous.image), &luminance(&current.image));
        let (w, h) = diff.dimensions();

        let change_rate = normalized_mean(&diff, 0, 0, w, h);

        let block_w = w.checked_div(self.grid_size).unwrap_or(0);
        let block_h = h.checked_div(self.grid_size).unwrap_or(0);
        let (max_block_change, hottest_block) = if block_w == 0 || block_h == 0 {
            (change_rate, (0, 0))
        } else {
            let mut best = (f64::MIN, (0, 0));
            for row in 0..self.grid_size {
                for col in 0..self.grid_size {
                    let value =
                        normalized_mean(&diff, col * block_w, row * block_h, block_w, block_h);
                    if value > best.0 {
                        best = (value, (row, col));
                    }
                }
            }
            best
        };

        let in_band = self.min_threshold <= change_rate && change_rate <= self.max_threshold;
        let block_override = max_block_change > self.max_threshold * BLOCK_OVERRIDE_FACTOR;

        debug!(
            previous = previous.frame_number,
            current = current.frame_number,
            change_rate,
            max_block_change,
            in_band,
            block_override,
            "compared frames"
        );

        Ok(SceneChange {
            is_new_scene: in_band || block_override,
            change_rate,
            max_block_change,
            hottest_block,
        })
    }
}

fn abs_diff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut out = GrayImage::new(a.width(), a.height());
    for ((o, pa), pb) in out.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        o.0[0] = pa.0[0].abs_diff(pb.0[0]);
    }
    out
}

/// Mean of a sub-rectangle divided by the maximum pixel value.
fn normalized_mean(diff: &GrayImage, x0: u32, y0: u32, w: u32, h: u32) -> f64 {
    let mut sum = 0u64;
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            sum += diff.get_pixel(x, y).0[0] as u64;
        }
    }
    let count = (w as u64) * (h as u64);
    if count == 0 {
        return 0.0;
    }
    sum as f64 / count as f64 / u8::MAX as f64
}
