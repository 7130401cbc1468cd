use super::{MediaSink, SinkType};
use crate::error::{KeyError, Result};
use crate::ffmpeg;
use crate::keying::Frame;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

/// Encodes frames into a video file through an ffmpeg subprocess
pub struct VideoFileWriter {
    path: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    frames: u64,
}

impl VideoFileWriter {
    pub fn new<P: AsRef<Path>>(video_file: P, width: u32, height: u32, fps: f64) -> Result<Self> {
        let path = video_file.as_ref();
        if !ffmpeg::command_exists("ffmpeg") {
            return Err(KeyError::codec(format!(
                "No encoder for this video file (ffmpeg not in PATH): {}",
                path.display()
            )));
        }

        let args = ffmpeg::encode_args(path, width, height, fps);
        tracing::debug!(?args, "Starting encoder");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| KeyError::codec(format!("Failed to start ffmpeg: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| KeyError::stream("Failed to capture ffmpeg stdin"))?;

        tracing::info!(
            "Writing video {} ({}x{} @ {:.2} fps)",
            path.display(),
            width,
            height,
            fps
        );

        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            child: Some(child),
            stdin: Some(stdin),
            frames: 0,
        })
    }
}

impl MediaSink for VideoFileWriter {
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

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| KeyError::stream("Video writer is already finished"))?;
        stdin.write_all(frame.as_raw()).map_err(|e| {
            KeyError::stream(format!("Failed to write frame to {}: {}", self.path.display(), e))
        })?;

        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // Closing stdin lets the encoder flush and exit
        drop(self.stdin.take());

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait()?;
        if !status.success() {
            return Err(KeyError::stream(format!(
                "Encoder for {} exited with {}",
                self.path.display(),
                status
            )));
        }

        tracing::info!("Wrote {} frames to {}", self.frames, self.path.display());
        Ok(())
    }

    fn media_type(&self) -> SinkType {
        SinkType::VideoFile
    }
}

impl Drop for VideoFileWriter {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.finish() {
                tracing::warn!("Failed to finalize {}: {}", self.path.display(), e);
            }
        }
    }
}
