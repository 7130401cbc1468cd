use super::{MediaSource, SourceType};
use crate::error::{KeyError, Result};
use crate::ffmpeg::{self, VideoInfo};
use crate::keying::Frame;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

/// A producer of raw rgb24 frames
pub trait RawStream {
    fn reader(&mut self) -> &mut dyn Read;

    /// Reap the producer once its output has ended; an unclean exit is an error
    fn close(&mut self) -> std::io::Result<()>;
}

/// Starts a fresh [`RawStream`] from the beginning of the video
pub trait StreamOpener {
    type Stream: RawStream;

    fn open(&mut self) -> Result<Self::Stream>;
}

/// Running ffmpeg process emitting raw frames on stdout
pub struct Decoder {
    child: Child,
    stdout: BufReader<ChildStdout>,
    reaped: bool,
}

impl Decoder {
    fn spawn(path: &Path) -> Result<Self> {
        let mut child = Command::new("ffmpeg")
            .args(ffmpeg::decode_args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| KeyError::codec(format!("Failed to start ffmpeg: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| KeyError::stream("Failed to capture ffmpeg stdout"))?;

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            reaped: false,
        })
    }
}

impl RawStream for Decoder {
    fn reader(&mut self) -> &mut dyn Read {
        &mut self.stdout
    }

    fn close(&mut self) -> std::io::Result<()> {
        let status = self.child.wait()?;
        self.reaped = true;
        ffmpeg::check_exit(status)
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Spawns `ffmpeg` decoding a file
pub struct FfmpegOpener {
    path: PathBuf,
}

impl StreamOpener for FfmpegOpener {
    type Stream = Decoder;

    fn open(&mut self) -> Result<Decoder> {
        Decoder::spawn(&self.path)
    }
}

/// Video file decoded frame by frame, by default through an ffmpeg subprocess
pub struct VideoFileReader<O: StreamOpener = FfmpegOpener> {
    path: PathBuf,
    looped: bool,
    info: VideoInfo,
    opener: O,
    stream: Option<O::Stream>,
}

impl VideoFileReader {
    pub fn new<P: AsRef<Path>>(video_file: P, looped: bool) -> Result<Self> {
        let path = video_file.as_ref();
        if !path.exists() {
            return Err(KeyError::config(format!(
                "Input video doesn't exist: {}",
                path.display()
            )));
        }
        if !ffmpeg::command_exists("ffmpeg") {
            return Err(KeyError::codec("ffmpeg is not available in PATH"));
        }

        let info = ffmpeg::probe(path)?;
        tracing::info!(
            "Opened video {} ({}x{} @ {:.2} fps, looped={})",
            path.display(),
            info.width,
            info.height,
            info.fps,
            looped
        );

        let opener = FfmpegOpener {
            path: path.to_path_buf(),
        };
        Self::with_opener(path, looped, info, opener)
    }
}

impl<O: StreamOpener> VideoFileReader<O> {
    /// Reader over streams from `opener`, each carrying `info`-sized frames
    pub fn with_opener<P: AsRef<Path>>(
        path: P,
        looped: bool,
        info: VideoInfo,
        mut opener: O,
    ) -> Result<Self> {
        let stream = opener.open()?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            looped,
            info,
            opener,
            stream: Some(stream),
        })
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.info.frame_bytes()];
        let complete = ffmpeg::read_frame(stream.reader(), &mut buf).map_err(|e| {
            KeyError::stream(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        if !complete {
            // Output ended: only a clean exit counts as end of stream
            if let Some(mut stream) = self.stream.take() {
                stream.close().map_err(|e| {
                    KeyError::stream(format!("Failed to decode {}: {}", self.path.display(), e))
                })?;
            }
            return Ok(None);
        }

        Frame::from_raw(self.info.width, self.info.height, buf)
            .map(Some)
            .ok_or_else(|| KeyError::stream("Decoded frame has the wrong size"))
    }
}

impl<O: StreamOpener> MediaSource for VideoFileReader<O> {
    fn read_next(&mut self) -> Result<Option<Frame>> {
        if let Some(frame) = self.read_frame()? {
            return Ok(Some(frame));
        }

        if !self.looped {
            return Ok(None);
        }

        tracing::debug!("Rewinding {}", self.path.display());
        self.reset()?;
        match self.read_frame()? {
            Some(frame) => Ok(Some(frame)),
            None => Err(KeyError::stream(format!(
                "Failed to read {} after rewinding",
                self.path.display()
            ))),
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.stream = None;
        self.stream = Some(self.opener.open()?);
        Ok(())
    }

    fn media_type(&self) -> SourceType {
        SourceType::VideoFile
    }

    fn is_looped(&self) -> bool {
        self.looped
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn frame_rate(&self) -> Option<f64> {
        Some(self.info.fps)
    }
}
