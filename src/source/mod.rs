mod image_file;
mod video_file;

pub use image_file::ImageFileReader;
pub use video_file::{Decoder, FfmpegOpener, RawStream, StreamOpener, VideoFileReader};

use crate::error::Result;
use crate::keying::Frame;
use std::path::Path;

/// Kind of media behind a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    ImageFile,
    VideoFile,
    /// Reserved; no capture device reader exists yet
    Webcam,
}

/// Trait for frame sources
///
/// A looped source rewinds transparently when exhausted and keeps producing
/// frames. A source that is not looped returns `Ok(None)` once it runs out.
pub trait MediaSource {
    /// Read the next frame
    fn read_next(&mut self) -> Result<Option<Frame>>;

    /// Rewind so the next read returns the first frame again
    fn reset(&mut self) -> Result<()>;

    fn media_type(&self) -> SourceType;

    /// Fixed at construction
    fn is_looped(&self) -> bool;

    fn path(&self) -> &Path;

    /// Native frame rate, if the media has one
    fn frame_rate(&self) -> Option<f64> {
        None
    }
}
