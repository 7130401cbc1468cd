//! Live preview of composited frames

use crate::error::{KeyError, Result};
use crate::keying::Frame;
use std::path::{Path, PathBuf};

/// Receives every composited frame right after it was written to the sink
pub trait Preview {
    fn show(&mut self, frame: &Frame) -> Result<()>;
}

/// Preview that displays nothing
#[derive(Debug, Default)]
pub struct HeadlessPreview;

impl Preview for HeadlessPreview {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}

/// Keeps an image file on disk updated with the latest frame
///
/// Only every `every`-th frame is saved, starting with the first one.
pub struct SnapshotPreview {
    path: PathBuf,
    every: u64,
    seen: u64,
}

impl SnapshotPreview {
    pub fn new<P: AsRef<Path>>(path: P, every: u64) -> Result<Self> {
        let path = path.as_ref();
        image::ImageFormat::from_path(path)
            .ok()
            .filter(|format| format.writing_enabled())
            .ok_or_else(|| {
                KeyError::codec(format!("No encoder for preview file {}", path.display()))
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            every: every.max(1),
            seen: 0,
        })
    }
}

impl Preview for SnapshotPreview {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        let index = self.seen;
        self.seen += 1;
        if index % self.every != 0 {
            return Ok(());
        }

        frame.save(&self.path).map_err(|e| {
            KeyError::stream(format!("Failed to update preview {}: {}", self.path.display(), e))
        })
    }
}
