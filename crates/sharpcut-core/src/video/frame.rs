use image::RgbImage;

/// A single decoded video frame with metadata.
#[derive(Clone)]
pub struct Frame {
    /// The frame's image data.
    pub image: RgbImage,
    /// Absolute frame number from the start of the source (0-based).
    pub frame_number: u32,
    /// Elapsed seconds from the start of the source.
    pub timestamp_seconds: f64,
}

impl Frame {
    pub fn new(image: RgbImage, frame_number: u32, fps: f64) -> Self {
        Self {
            image,
            frame_number,
            timestamp_seconds: timestamp_for(frame_number, fps),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// True when the frame has no pixels or its buffer doesn't cover its dimensions.
    pub fn is_malformed(&self) -> bool {
        let (w, h) = self.image.dimensions();
        w == 0 || h == 0 || self.image.as_raw().len() != (w as usize) * (h as usize) * 3
    }
}

pub fn timestamp_for(frame_number: u32, fps: f64) -> f64 {
    if fps > 0.0 {
        frame_number as f64 / fps
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_follows_fps() {
        let frame = Frame::new(RgbImage::new(4, 4), 150, 30.0);
        assert!((frame.timestamp_seconds - 5.0).abs() < 1e-9);
    }

    #[test]
    fn zero_fps_gives_zero_timestamp() {
        assert_eq!(timestamp_for(42, 0.0), 0.0);
    }

    #[test]
    fn empty_image_is_malformed() {
        let frame = Frame::new(RgbImage::new(0, 0), 0, 30.0);
        assert!(frame.is_malformed());
        assert!(!Frame::new(RgbImage::new(2, 2), 0, 30.0).is_malformed());
    }
}
