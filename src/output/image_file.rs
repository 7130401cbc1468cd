use super::{MediaSink, SinkType};
use crate::error::{KeyError, Result};
use crate::keying::Frame;
use image::ImageFormat;
use std::path::{Path, PathBuf};

/// Saves frames to a single image file
pub struct ImageFileWriter {
    path: PathBuf,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl ImageFileWriter {
    pub fn new<P: AsRef<Path>>(image_file: P, width: u32, height: u32) -> Result<Self> {
        let path = image_file.as_ref();
        let format = ImageFormat::from_path(path)
            .ok()
            .filter(|format| format.writing_enabled())
            .ok_or_else(|| {
                KeyError::codec(format!("No encoder for this image file: {}", path.display()))
            })?;

        tracing::info!("Writing image {} ({}x{})", path.display(), width, height);

        Ok(Self {
            path: path.to_path_buf(),
            format,
            width,
            height,
        })
    }
}

impl MediaSink for ImageFileWriter {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(KeyError::stream(format!(
                "Frame is {}x{} but {} expects {}x{}",
                frame.width(),
                frame.height(),
                self.path.display(),
                self.width,
                self.height
            )));
        }

        frame
            .save_with_format(&self.path, self.format)
            .map_err(|e| KeyError::stream(format!("Failed to write {}: {}", self.path.display(), e)))
    }

    fn media_type(&self) -> SinkType {
        SinkType::ImageFile
    }
}
