pub mod decoder;
pub mod frame;
pub mod memory;

use anyhow::Result;

use self::frame::Frame;

/// Sequential, seekable access to decoded frames.
///
/// There is one read cursor per source. `position` is the frame number the next
/// `next_frame` call returns.
pub trait FrameSource {
    /// Read the next frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Move the read cursor so the next read returns `frame_number`.
    fn seek(&mut self, frame_number: u32) -> Result<()>;

    fn position(&self) -> u32;

    fn fps(&self) -> f64;

    /// Total frame count if the container reports one. Advisory only.
    fn frame_count(&self) -> Option<u32>;
}
