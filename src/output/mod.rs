mod dummy;
mod image_file;
mod video_file;

pub use dummy::DummyWriter;
pub use image_file::ImageFileWriter;
pub use video_file::VideoFileWriter;

use crate::error::Result;
use crate::keying::Frame;

/// Kind of destination behind a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkType {
    ImageFile,
    VideoFile,
    /// Accepts and discards every frame
    Dummy,
}

/// Trait for output destinations
pub trait MediaSink {
    /// Write a frame to the output
    fn write(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and finalize the output; no frames may be written afterwards
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn media_type(&self) -> SinkType;
}
