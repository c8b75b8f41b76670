use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

/// A compressed, self-contained JPEG image.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Scales frames to a fixed width and compresses them to JPEG.
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    pub target_width: u32,
    pub quality: u8,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self {
            target_width: 1280,
            quality: 95,
        }
    }
}

impl FrameEncoder {
    /// Output dimensions for an input of `width` x `height`, preserving aspect ratio.
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let scaled = (height as u64 * self.target_width as u64 / width.max(1) as u64) as u32;
        (self.target_width, scaled.max(1))
    }

    pub fn encode(&self, image: &RgbImage) -> Result<EncodedImage> {
        let (width, height) = self.target_size(image.width(), image.height());
        let resized = if (width, height) == image.dimensions() {
            image.clone()
        } else {
            imageops::resize(image, width, height, FilterType::Triangle)
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality)
            .encode_image(&resized)
            .context("failed to encode frame as JPEG")?;

        debug!(width, height, quality = self.quality, bytes = bytes.len(), "frame encoded");
        Ok(EncodedImage {
            width,
            height,
            bytes,
        })
    }
}
