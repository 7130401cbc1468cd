use greenkey::keying::{compute_mask, Frame, KeyColor, KeyParameters, KeySettings};
use greenkey::output::{MediaSink, SinkType};
use greenkey::pipeline::{fit_background, CancelToken, FrameSynchronizer};
use greenkey::preview::{HeadlessPreview, Preview};
use greenkey::source::{MediaSource, SourceType};
use greenkey::Result;
use image::Rgb;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// In-memory stream following the looping contract
struct MemorySource {
    frames: Vec<Frame>,
    cursor: usize,
    looped: bool,
    kind: SourceType,
    path: PathBuf,
    reads: Rc<Cell<usize>>,
}

impl MemorySource {
    fn new(frames: Vec<Frame>, kind: SourceType, looped: bool) -> Self {
        Self {
            frames,
            cursor: 0,
            looped,
            kind,
            path: PathBuf::from("memory"),
            reads: Rc::new(Cell::new(0)),
        }
    }

    fn video(frames: Vec<Frame>, looped: bool) -> Self {
        Self::new(frames, SourceType::VideoFile, looped)
    }

    fn image(frame: Frame, looped: bool) -> Self {
        Self::new(vec![frame], SourceType::ImageFile, looped)
    }
}

impl MediaSource for MemorySource {
    fn read_next(&mut self) -> Result<Option<Frame>> {
        self.reads.set(self.reads.get() + 1);
        if self.cursor >= self.frames.len() {
            if !self.looped {
                return Ok(None);
            }
            self.reset()?;
        }
        let frame = self.frames[self.cursor].clone();
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn reset(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn media_type(&self) -> SourceType {
        self.kind
    }

    fn is_looped(&self) -> bool {
        self.looped
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Sink that keeps every written frame
struct RecordingSink {
    kind: SinkType,
    frames: Rc<RefCell<Vec<Frame>>>,
    finished: Rc<Cell<u32>>,
}

impl RecordingSink {
    fn new(kind: SinkType) -> Self {
        Self {
            kind,
            frames: Rc::new(RefCell::new(Vec::new())),
            finished: Rc::new(Cell::new(0)),
        }
    }
}

impl MediaSink for RecordingSink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        self.frames.borrow_mut().push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished.set(self.finished.get() + 1);
        Ok(())
    }

    fn media_type(&self) -> SinkType {
        self.kind
    }
}

/// Cancels the run once it has seen `after` frames
struct CancellingPreview {
    cancel: CancelToken,
    after: usize,
    seen: usize,
}

impl Preview for CancellingPreview {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        self.seen += 1;
        if self.seen == self.after {
            self.cancel.cancel();
        }
        Ok(())
    }
}

fn settings(color: KeyColor, tolerance: u32, softness: u32, defringe: u32) -> KeySettings {
    KeySettings {
        color,
        params: KeyParameters::new(tolerance, softness, defringe).unwrap(),
    }
}

fn green_key() -> KeyColor {
    KeyColor::new(0, 255, 0)
}

fn textured(width: u32, height: u32) -> Frame {
    Frame::from_fn(width, height, |x, y| {
        Rgb([(40 + x * 7 % 200) as u8, (10 + y * 5 % 120) as u8, ((x + y) % 90) as u8])
    })
}

#[test]
fn test_three_frame_end_to_end() {
    let solid_green = Frame::from_pixel(16, 12, GREEN);
    let with_square = Frame::from_fn(16, 12, |x, y| {
        if (4..10).contains(&x) && (3..8).contains(&y) {
            RED
        } else {
            GREEN
        }
    });

    let foreground = MemorySource::video(
        vec![solid_green.clone(), with_square, solid_green],
        false,
    );
    let background = MemorySource::image(Frame::from_pixel(5, 5, BLUE), true);
    let sink = RecordingSink::new(SinkType::VideoFile);
    let written = sink.frames.clone();

    let mut synchronizer =
        FrameSynchronizer::new(Box::new(foreground), Box::new(background), Box::new(sink)).unwrap();
    let summary = synchronizer
        .run(&settings(green_key(), 10, 0, 0), &mut HeadlessPreview, &CancelToken::new())
        .unwrap();

    assert_eq!(summary.frames, 3);
    assert!(!summary.cancelled);

    let written = written.borrow();
    assert_eq!(written.len(), 3);
    assert!(written[0].pixels().all(|p| *p == BLUE));
    assert!(written[2].pixels().all(|p| *p == BLUE));
    for (x, y, pixel) in written[1].enumerate_pixels() {
        let expected = if (4..10).contains(&x) && (3..8).contains(&y) {
            RED
        } else {
            BLUE
        };
        assert_eq!(*pixel, expected, "at {},{}", x, y);
    }
}

#[test]
fn test_foreground_exhaustion_count() {
    let frames: Vec<Frame> = (0..7).map(|_| textured(8, 6)).collect();
    let foreground = MemorySource::video(frames, false);
    let fg_reads = foreground.reads.clone();
    // Shorter background video, replayed from the start
    let background = MemorySource::video(vec![textured(4, 4), textured(4, 4)], true);
    let bg_reads = background.reads.clone();
    let sink = RecordingSink::new(SinkType::Dummy);
    let written = sink.frames.clone();
    let finished = sink.finished.clone();

    let mut synchronizer =
        FrameSynchronizer::new(Box::new(foreground), Box::new(background), Box::new(sink)).unwrap();
    let summary = synchronizer
        .run(&settings(green_key(), 12, 2, 40), &mut HeadlessPreview, &CancelToken::new())
        .unwrap();

    assert_eq!(summary.frames, 7);
    assert_eq!(written.borrow().len(), 7);
    // Seven frames plus the read that reported exhaustion
    assert_eq!(fg_reads.get(), 8);
    assert_eq!(bg_reads.get(), 7);
    assert_eq!(finished.get(), 1);
}

#[test]
fn test_mismatched_sink_rejected_before_reading() {
    let foreground = MemorySource::video(vec![textured(4, 4)], false);
    let fg_reads = foreground.reads.clone();
    let background = MemorySource::image(textured(4, 4), true);
    let bg_reads = background.reads.clone();

    let err = FrameSynchronizer::new(
        Box::new(foreground),
        Box::new(background),
        Box::new(RecordingSink::new(SinkType::ImageFile)),
    )
    .err()
    .unwrap();

    assert!(err.is_configuration());
    assert_eq!(fg_reads.get(), 0);
    assert_eq!(bg_reads.get(), 0);
}

#[test]
fn test_looping_contract_enforced() {
    let looped_fg = FrameSynchronizer::new(
        Box::new(MemorySource::video(vec![textured(4, 4)], true)),
        Box::new(MemorySource::image(textured(4, 4), true)),
        Box::new(RecordingSink::new(SinkType::Dummy)),
    );
    assert!(looped_fg.err().unwrap().is_configuration());

    let unlooped_bg = FrameSynchronizer::new(
        Box::new(MemorySource::video(vec![textured(4, 4)], false)),
        Box::new(MemorySource::image(textured(4, 4), false)),
        Box::new(RecordingSink::new(SinkType::Dummy)),
    );
    assert!(unlooped_bg.err().unwrap().is_configuration());
}

#[test]
fn test_image_foreground_requires_image_background() {
    let result = FrameSynchronizer::new(
        Box::new(MemorySource::image(textured(4, 4), false)),
        Box::new(MemorySource::video(vec![textured(4, 4)], true)),
        Box::new(RecordingSink::new(SinkType::ImageFile)),
    );
    assert!(result.err().unwrap().is_configuration());
}

#[test]
fn test_cancel_stops_after_current_frame() {
    let frames: Vec<Frame> = (0..10).map(|_| textured(6, 6)).collect();
    let sink = RecordingSink::new(SinkType::VideoFile);
    let written = sink.frames.clone();
    let finished = sink.finished.clone();

    let cancel = CancelToken::new();
    let mut preview = CancellingPreview {
        cancel: cancel.clone(),
        after: 3,
        seen: 0,
    };

    let mut synchronizer = FrameSynchronizer::new(
        Box::new(MemorySource::video(frames, false)),
        Box::new(MemorySource::image(textured(6, 6), true)),
        Box::new(sink),
    )
    .unwrap();
    let summary = synchronizer
        .run(&settings(green_key(), 12, 2, 40), &mut preview, &cancel)
        .unwrap();

    assert_eq!(summary.frames, 3);
    assert!(summary.cancelled);
    // The frame during which cancel was raised is still written in full
    assert_eq!(written.borrow().len(), 3);
    assert_eq!(finished.get(), 1);
}

#[test]
fn test_absent_key_color_leaves_foreground() {
    let foreground = textured(10, 7);
    // Pure magenta never occurs in the textured frame at tolerance 0
    let key = KeyColor::new(255, 0, 255);
    let mask = compute_mask(&foreground, key.hsv(), &KeyParameters::new(0, 0, 0).unwrap());
    assert!(mask.iter().all(|&v| v == 0.0));

    let sink = RecordingSink::new(SinkType::ImageFile);
    let written = sink.frames.clone();
    let mut synchronizer = FrameSynchronizer::new(
        Box::new(MemorySource::image(foreground.clone(), false)),
        Box::new(MemorySource::image(Frame::from_pixel(3, 9, BLUE), true)),
        Box::new(sink),
    )
    .unwrap();
    synchronizer
        .run(&settings(key, 0, 0, 0), &mut HeadlessPreview, &CancelToken::new())
        .unwrap();

    assert_eq!(written.borrow()[0], foreground);
}

#[test]
fn test_full_match_takes_resized_background() {
    let foreground = textured(12, 9);
    let background = textured(31, 5);

    let sink = RecordingSink::new(SinkType::ImageFile);
    let written = sink.frames.clone();
    let mut synchronizer = FrameSynchronizer::new(
        Box::new(MemorySource::image(foreground, false)),
        Box::new(MemorySource::image(background.clone(), true)),
        Box::new(sink),
    )
    .unwrap();
    synchronizer
        .run(&settings(green_key(), 100, 0, 0), &mut HeadlessPreview, &CancelToken::new())
        .unwrap();

    assert_eq!(written.borrow()[0], fit_background(background, 12, 9));
}

#[test]
fn test_output_matches_foreground_size() {
    let sizes = [(9, 4), (1, 1), (40, 3)];
    let frames: Vec<Frame> = sizes.iter().map(|&(w, h)| textured(w, h)).collect();

    for background in [textured(2, 2), textured(64, 64), textured(9, 4)] {
        let sink = RecordingSink::new(SinkType::Dummy);
        let written = sink.frames.clone();
        let mut synchronizer = FrameSynchronizer::new(
            Box::new(MemorySource::video(frames.clone(), false)),
            Box::new(MemorySource::image(background, true)),
            Box::new(sink),
        )
        .unwrap();
        synchronizer
            .run(&settings(green_key(), 30, 3, 20), &mut HeadlessPreview, &CancelToken::new())
            .unwrap();

        let written = written.borrow();
        let dims: Vec<(u32, u32)> = written.iter().map(|f| f.dimensions()).collect();
        assert_eq!(dims, sizes.to_vec());
    }
}
