use anyhow::Result;
use image::RgbImage;
use tracing::debug;

use super::frame::Frame;
use super::FrameSource;

/// A frame source backed by images already held in memory.
///
/// Every read hands out an owned copy, so callers may keep frames across reads.
pub struct MemorySource {
    images: Vec<RgbImage>,
    fps: f64,
    cursor: u32,
}

impl MemorySource {
    pub fn new(images: Vec<RgbImage>, fps: f64) -> Self {
        debug!(frames = images.len(), fps, "memory source created");
        Self {
            images,
            fps,
            cursor: 0,
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(image) = self.images.get(self.cursor as usize) else {
            return Ok(None);
        };
        let frame = Frame::new(image.clone(), self.cursor, self.fps);
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn seek(&mut self, frame_number: u32) -> Result<()> {
        self.cursor = frame_number;
        Ok(())
    }

    fn position(&self) -> u32 {
        self.cursor
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> Option<u32> {
        u32::try_from(self.images.len()).ok()
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn solid(v: u8) -> RgbImage {
        RgbImage::from_pixel(4, 4, Rgb([v, v, v]))
    }

    #[test]
    fn reads_in_order_then_ends() {
        let mut source = MemorySource::new(vec![solid(0), solid(1)], 10.0);
        let a = source.next_frame().unwrap().unwrap();
        let b = source.next_frame().unwrap().unwrap();
        assert_eq!(a.frame_number, 0);
        assert_eq!(b.frame_number, 1);
        assert!((b.timestamp_seconds - 0.1).abs() < 1e-9);
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.position(), 2);
    }

    #[test]
    fn seek_moves_cursor() {
        let mut source = MemorySource::new((0..5).map(solid).collect(), 10.0);
        source.seek(3).unwrap();
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.frame_number, 3);
        assert_eq!(frame.image.get_pixel(0, 0), &Rgb([3, 3, 3]));
    }

    #[test]
    fn seek_past_end_reads_nothing() {
        let mut source = MemorySource::new(vec![solid(0)], 10.0);
        source.seek(10).unwrap();
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.frame_count(), Some(1));
    }
}
