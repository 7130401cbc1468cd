//! Extension-based media detection and source/sink construction

use crate::error::{KeyError, Result};
use crate::ffmpeg::DEFAULT_FPS;
use crate::output::{DummyWriter, ImageFileWriter, MediaSink, VideoFileWriter};
use crate::source::{ImageFileReader, MediaSource, VideoFileReader};
use std::path::Path;

/// Raster image extensions accepted for input and output
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// Video container extensions accepted for input and output
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Lowercased file extension without the dot
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Classify `path` by its extension
pub fn classify(path: &Path) -> Result<MediaKind> {
    let ext = file_extension(path);
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaKind::Video)
    } else {
        Err(KeyError::config(format!(
            "File type is not supported: {} (.{})",
            path.display(),
            ext
        )))
    }
}

/// Open a frame source for `path`
pub fn open_source(path: &Path, looped: bool) -> Result<Box<dyn MediaSource>> {
    let source: Box<dyn MediaSource> = match classify(path)? {
        MediaKind::Image => Box::new(ImageFileReader::new(path, looped)?),
        MediaKind::Video => Box::new(VideoFileReader::new(path, looped)?),
    };
    Ok(source)
}

/// Create the output sink; no path means preview only
///
/// `width`/`height` is the foreground frame size, `fps` its frame rate if known.
pub fn create_sink(
    path: Option<&Path>,
    width: u32,
    height: u32,
    fps: Option<f64>,
) -> Result<Box<dyn MediaSink>> {
    let Some(path) = path else {
        return Ok(Box::new(DummyWriter));
    };

    let sink: Box<dyn MediaSink> = match classify(path)? {
        MediaKind::Image => Box::new(ImageFileWriter::new(path, width, height)?),
        MediaKind::Video => Box::new(VideoFileWriter::new(
            path,
            width,
            height,
            fps.unwrap_or(DEFAULT_FPS),
        )?),
    };
    Ok(sink)
}
