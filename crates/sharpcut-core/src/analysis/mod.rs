pub mod clarity;
pub mod scene;

use image::{GrayImage, RgbImage};

/// Reasons a frame can't be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("frame {frame_number} has no pixel data")]
    EmptyFrame { frame_number: u32 },
    #[error("frame dimensions differ: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Single-channel luminance of an RGB image.
pub fn luminance(image: &RgbImage) -> GrayImage {
    image::imageops::grayscale(image)
}
