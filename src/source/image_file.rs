use super::{MediaSource, SourceType};
use crate::error::{KeyError, Result};
use crate::keying::Frame;
use image::ImageFormat;
use std::path::{Path, PathBuf};

/// Still image presented as a one-frame stream
///
/// The image is decoded on the first read and cached. A looped reader hands out
/// the cached copy forever; otherwise the second read reports exhaustion.
pub struct ImageFileReader {
    path: PathBuf,
    looped: bool,
    cache: Option<Frame>,
}

impl ImageFileReader {
    pub fn new<P: AsRef<Path>>(image_file: P, looped: bool) -> Result<Self> {
        let path = image_file.as_ref();
        if !path.exists() {
            return Err(KeyError::config(format!(
                "Input image doesn't exist: {}",
                path.display()
            )));
        }

        let readable = ImageFormat::from_path(path)
            .map(|format| format.reading_enabled())
            .unwrap_or(false);
        if !readable {
            return Err(KeyError::codec(format!(
                "No decoder for this image file: {}",
                path.display()
            )));
        }

        tracing::debug!("Opened image {} (looped={})", path.display(), looped);

        Ok(Self {
            path: path.to_path_buf(),
            looped,
            cache: None,
        })
    }
}

impl MediaSource for ImageFileReader {
    fn read_next(&mut self) -> Result<Option<Frame>> {
        match &self.cache {
            None => {
                let frame = image::open(&self.path)
                    .map_err(|e| {
                        KeyError::stream(format!("Failed to read {}: {}", self.path.display(), e))
                    })?
                    .to_rgb8();
                self.cache = Some(frame.clone());
                Ok(Some(frame))
            }
            Some(cached) if self.looped => Ok(Some(cached.clone())),
            Some(_) => Ok(None),
        }
    }

    fn reset(&mut self) -> Result<()> {
        // Force the image to be decoded again
        self.cache = None;
        Ok(())
    }

    fn media_type(&self) -> SourceType {
        SourceType::ImageFile
    }

    fn is_looped(&self) -> bool {
        self.looped
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
