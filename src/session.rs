//! Keying session: acquisition followed by keying passes
//!
//! Each pass walks `Uninitialized -> Ready -> Running -> Done`. A finished pass
//! returns to `Uninitialized` so a new color can be picked; a running pass is
//! never sent back to `Ready`.

use crate::acquire::KeyAcquisition;
use crate::error::{KeyError, Result};
use crate::keying::KeySettings;
use crate::media::{self, MediaKind};
use crate::output::SinkType;
use crate::pipeline::{CancelToken, FrameSynchronizer, RunSummary};
use crate::preview::Preview;
use crate::source::SourceType;
use std::path::PathBuf;

/// Where a session reads from and writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPaths {
    pub foreground: PathBuf,
    pub background: PathBuf,
    /// `None` runs preview only
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunState {
    Uninitialized,
    /// Color and parameters captured
    Ready(KeySettings),
    Running,
    /// Source exhausted or cancelled
    Done(RunSummary),
}

pub struct Session {
    paths: MediaPaths,
    state: RunState,
    cancel: CancelToken,
}

impl Session {
    pub fn new(paths: MediaPaths, cancel: CancelToken) -> Self {
        Self {
            paths,
            state: RunState::Uninitialized,
            cancel,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn capture(&mut self, settings: KeySettings) -> Result<()> {
        match self.state {
            RunState::Uninitialized => {
                self.state = RunState::Ready(settings);
                Ok(())
            }
            other => Err(invalid_transition(other, "Ready")),
        }
    }

    fn start(&mut self) -> Result<KeySettings> {
        match self.state {
            RunState::Ready(settings) => {
                self.state = RunState::Running;
                Ok(settings)
            }
            other => Err(invalid_transition(other, "Running")),
        }
    }

    fn finish(&mut self, summary: RunSummary) -> Result<()> {
        match self.state {
            RunState::Running => {
                self.state = RunState::Done(summary);
                Ok(())
            }
            other => Err(invalid_transition(other, "Done")),
        }
    }

    /// Go back to picking a color after a finished pass
    pub fn restart(&mut self) -> Result<()> {
        match self.state {
            RunState::Done(_) | RunState::Uninitialized => {
                self.state = RunState::Uninitialized;
                Ok(())
            }
            other => Err(invalid_transition(other, "Uninitialized")),
        }
    }

    /// Run passes until the acquisition layer declines
    pub fn run(
        &mut self,
        acquisition: &mut dyn KeyAcquisition,
        preview: &mut dyn Preview,
    ) -> Result<Vec<RunSummary>> {
        let mut summaries = Vec::new();
        while let Some(summary) = self.run_pass(acquisition, preview)? {
            summaries.push(summary);
        }
        Ok(summaries)
    }

    /// Acquire settings and key the foreground once
    ///
    /// Returns `None` when the acquisition layer declines to start a pass.
    pub fn run_pass(
        &mut self,
        acquisition: &mut dyn KeyAcquisition,
        preview: &mut dyn Preview,
    ) -> Result<Option<RunSummary>> {
        self.restart()?;
        if !acquisition.wants_pass() {
            tracing::info!("No further passes requested, ending session");
            return Ok(None);
        }
        self.cancel.clear();
        self.check_media_kinds()?;

        // Reference frame for picking the color
        let reference = media::open_source(&self.paths.foreground, true)?
            .read_next()?
            .ok_or_else(|| {
                KeyError::stream(format!(
                    "No frame in {}",
                    self.paths.foreground.display()
                ))
            })?;

        let Some(settings) = acquisition.acquire(&reference)? else {
            tracing::info!("No key settings supplied, ending session");
            return Ok(None);
        };
        self.capture(settings)?;

        let foreground = media::open_source(&self.paths.foreground, false)?;
        let background = media::open_source(&self.paths.background, true)?;
        let sink = media::create_sink(
            self.paths.output.as_deref(),
            reference.width(),
            reference.height(),
            foreground.frame_rate(),
        )?;
        let mut synchronizer = FrameSynchronizer::new(foreground, background, sink)?;

        let settings = self.start()?;
        let summary = synchronizer.run(&settings, preview, &self.cancel)?;
        self.finish(summary)?;

        Ok(Some(summary))
    }

    /// Pairing check on extensions alone, before any file is opened
    fn check_media_kinds(&self) -> Result<()> {
        let foreground = media::classify(&self.paths.foreground)?;
        let background = media::classify(&self.paths.background)?;
        let sink = match &self.paths.output {
            None => SinkType::Dummy,
            Some(path) => match media::classify(path)? {
                MediaKind::Image => SinkType::ImageFile,
                MediaKind::Video => SinkType::VideoFile,
            },
        };

        let source_type = |kind| match kind {
            MediaKind::Image => SourceType::ImageFile,
            MediaKind::Video => SourceType::VideoFile,
        };
        crate::pipeline::check_pairing(source_type(foreground), source_type(background), sink)
    }
}

fn invalid_transition(from: RunState, to: &str) -> KeyError {
    KeyError::config(format!("Cannot move from {:?} to {}", from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::{ColorPick, PresetAcquisition};
    use crate::keying::{Frame, KeyColor, KeyParameters};
    use crate::preview::HeadlessPreview;
    use image::Rgb;

    fn settings() -> KeySettings {
        KeySettings {
            color: KeyColor::new(0, 255, 0),
            params: KeyParameters::default(),
        }
    }

    fn session(output: Option<PathBuf>) -> Session {
        Session::new(
            MediaPaths {
                foreground: "fg.png".into(),
                background: "bg.png".into(),
                output,
            },
            CancelToken::new(),
        )
    }

    #[test]
    fn test_state_transitions() {
        let mut session = session(None);
        assert_eq!(session.state(), RunState::Uninitialized);

        // Cannot start without settings
        assert!(session.start().is_err());

        session.capture(settings()).unwrap();
        assert_eq!(session.state(), RunState::Ready(settings()));
        assert!(session.capture(settings()).is_err());

        session.start().unwrap();
        assert_eq!(session.state(), RunState::Running);
        // Running never goes back to Ready or Uninitialized directly
        assert!(session.capture(settings()).is_err());
        assert!(session.restart().is_err());

        let summary = RunSummary {
            frames: 3,
            cancelled: false,
        };
        session.finish(summary).unwrap();
        assert_eq!(session.state(), RunState::Done(summary));

        session.restart().unwrap();
        assert_eq!(session.state(), RunState::Uninitialized);
    }

    #[test]
    fn test_image_pass_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let fg_path = dir.path().join("fg.png");
        let bg_path = dir.path().join("bg.bmp");
        let out_path = dir.path().join("out.png");

        // Green screen with a red block in the middle
        Frame::from_fn(8, 8, |x, y| {
            if (2..6).contains(&x) && (2..6).contains(&y) {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 255, 0])
            }
        })
        .save(&fg_path)
        .unwrap();
        Frame::from_pixel(3, 3, Rgb([0, 0, 255])).save(&bg_path).unwrap();

        let mut session = Session::new(
            MediaPaths {
                foreground: fg_path,
                background: bg_path,
                output: Some(out_path.clone()),
            },
            CancelToken::new(),
        );
        let mut acquisition =
            PresetAcquisition::new(ColorPick::At { x: 0, y: 0 }, KeyParameters::new(10, 0, 0).unwrap());

        let summaries = session.run(&mut acquisition, &mut HeadlessPreview).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].frames, 1);
        assert!(matches!(session.state(), RunState::Done(_)));

        let out = image::open(&out_path).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(3, 3), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_spent_acquisition_opens_nothing() {
        // Neither file exists; opening either would fail
        let mut session = Session::new(
            MediaPaths {
                foreground: "missing-fg.mp4".into(),
                background: "missing-bg.mp4".into(),
                output: Some("out.mp4".into()),
            },
            CancelToken::new(),
        );
        let mut acquisition =
            PresetAcquisition::new(ColorPick::default(), KeyParameters::default()).with_passes(0);

        let summaries = session.run(&mut acquisition, &mut HeadlessPreview).unwrap();
        assert!(summaries.is_empty());
        assert_eq!(session.state(), RunState::Uninitialized);
    }

    #[test]
    fn test_image_foreground_with_video_background_rejected() {
        let mut session = Session::new(
            MediaPaths {
                foreground: "missing-fg.png".into(),
                background: "missing-bg.mp4".into(),
                output: None,
            },
            CancelToken::new(),
        );
        let mut acquisition = PresetAcquisition::new(ColorPick::default(), KeyParameters::default());

        // Rejected on the pairing alone, before the missing files are noticed
        let err = session.run(&mut acquisition, &mut HeadlessPreview).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Background must be an image"));
    }
}
