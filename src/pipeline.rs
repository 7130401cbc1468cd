//! Frame synchronizer: pairs foreground and background frames and keys them out

use crate::error::{KeyError, Result};
use crate::keying::{Frame, KeySettings, ProcessingContext};
use crate::output::{MediaSink, SinkType};
use crate::preview::Preview;
use crate::source::{MediaSource, SourceType};
use image::imageops::{self, FilterType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Log timing statistics every this many frames
const STATS_INTERVAL: u64 = 30;

/// Shared abort flag, checked once per frame after the frame has been written
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag before starting another pass
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Outcome of one keying pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub cancelled: bool,
}

/// Reject source/sink pairings that cannot produce a sensible output
///
/// - a video foreground needs a video sink (or none)
/// - an image foreground needs an image background and an image sink (or none)
pub fn check_pairing(foreground: SourceType, background: SourceType, sink: SinkType) -> Result<()> {
    match foreground {
        SourceType::VideoFile => {
            if sink != SinkType::VideoFile && sink != SinkType::Dummy {
                return Err(KeyError::config(
                    "Mismatching media types: the input file is a video, but the output is not",
                ));
            }
        }
        SourceType::ImageFile => {
            if background != SourceType::ImageFile {
                return Err(KeyError::config("Background must be an image"));
            }
            if sink != SinkType::ImageFile && sink != SinkType::Dummy {
                return Err(KeyError::config(
                    "Mismatching media types: the input file is an image, but the output is not",
                ));
            }
        }
        SourceType::Webcam => {
            return Err(KeyError::config("Webcam input is not supported"));
        }
    }
    Ok(())
}

/// Pairing check plus the looping contract: the foreground must end, the background must not
pub fn check_compatibility(
    foreground: &dyn MediaSource,
    background: &dyn MediaSource,
    sink: SinkType,
) -> Result<()> {
    check_pairing(foreground.media_type(), background.media_type(), sink)?;

    if foreground.is_looped() {
        return Err(KeyError::config("Foreground source must not be looped"));
    }
    if !background.is_looped() {
        return Err(KeyError::config("Background source must be looped"));
    }
    Ok(())
}

/// Interpolation used to bring a `src` sized frame to `dst`
///
/// Shrinking (by pixel count) uses an area-averaging filter, enlarging uses
/// bicubic. Returns `None` when no resize is needed.
pub fn resize_filter(src: (u32, u32), dst: (u32, u32)) -> Option<FilterType> {
    if src == dst {
        return None;
    }
    let src_pixels = src.0 as u64 * src.1 as u64;
    let dst_pixels = dst.0 as u64 * dst.1 as u64;
    if src_pixels > dst_pixels {
        Some(FilterType::Triangle)
    } else {
        Some(FilterType::CatmullRom)
    }
}

/// Resize `background` to exactly `width` x `height`
pub fn fit_background(background: Frame, width: u32, height: u32) -> Frame {
    let _span = tracing::debug_span!("resize").entered();

    match resize_filter(background.dimensions(), (width, height)) {
        Some(filter) => imageops::resize(&background, width, height, filter),
        None => background,
    }
}

#[derive(Debug, Default)]
struct StageTimes {
    read: Duration,
    key: Duration,
    write: Duration,
}

/// Drives one keying pass over a foreground stream
pub struct FrameSynchronizer {
    foreground: Box<dyn MediaSource>,
    background: Box<dyn MediaSource>,
    sink: Box<dyn MediaSink>,
    context: ProcessingContext,
}

impl FrameSynchronizer {
    /// Validates the media pairing; nothing is read yet
    pub fn new(
        foreground: Box<dyn MediaSource>,
        background: Box<dyn MediaSource>,
        sink: Box<dyn MediaSink>,
    ) -> Result<Self> {
        check_compatibility(foreground.as_ref(), background.as_ref(), sink.media_type())?;

        Ok(Self {
            foreground,
            background,
            sink,
            context: ProcessingContext::new(),
        })
    }

    /// Key out every foreground frame until it runs out or `cancel` is raised
    pub fn run(
        &mut self,
        settings: &KeySettings,
        preview: &mut dyn Preview,
        cancel: &CancelToken,
    ) -> Result<RunSummary> {
        tracing::info!(
            "Keying {} over {} (key={}, tolerance={}, softness={}, defringe={})",
            self.foreground.path().display(),
            self.background.path().display(),
            settings.color,
            settings.params.tolerance(),
            settings.params.softness(),
            settings.params.defringe()
        );

        let mut frames = 0u64;
        let mut times = StageTimes::default();
        let mut cancelled = false;

        loop {
            let read_start = Instant::now();
            let Some(foreground) = self.foreground.read_next()? else {
                tracing::debug!("Foreground exhausted after {} frames", frames);
                break;
            };

            // Looped, so a short background (or a still image) repeats
            let background = self.background.read_next()?.ok_or_else(|| {
                KeyError::stream(format!(
                    "Background {} produced no frame",
                    self.background.path().display()
                ))
            })?;
            times.read += read_start.elapsed();

            let key_start = Instant::now();
            let (width, height) = foreground.dimensions();
            let background = fit_background(background, width, height);
            let output = self.context.key_frame(&foreground, &background, settings)?;
            times.key += key_start.elapsed();

            let write_start = Instant::now();
            self.sink.write(output)?;
            preview.show(output)?;
            times.write += write_start.elapsed();

            frames += 1;

            if frames % STATS_INTERVAL == 0 {
                log_stats(frames, &times);
            }

            if cancel.is_cancelled() {
                tracing::info!("Cancelled after {} frames", frames);
                cancelled = true;
                break;
            }
        }

        self.sink.finish()?;
        tracing::info!("Processed {} frames", frames);

        Ok(RunSummary { frames, cancelled })
    }
}

fn log_stats(frames: u64, times: &StageTimes) {
    let per_frame = |d: Duration| d.as_secs_f64() * 1000.0 / frames as f64;
    let read_ms = per_frame(times.read);
    let key_ms = per_frame(times.key);
    let write_ms = per_frame(times.write);
    let total_ms = read_ms + key_ms + write_ms;

    tracing::info!(
        "Frame {}: read={:.1}ms, key={:.1}ms, write={:.1}ms, total={:.1}ms, fps={:.1}",
        frames,
        read_ms,
        key_ms,
        write_ms,
        total_ms,
        1000.0 / total_ms
    );
}
