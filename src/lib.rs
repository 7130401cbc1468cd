//! Chroma keying: replace a solid-colored background in an image or video
//! with another image or video.

pub mod acquire;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod keying;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod session;
pub mod source;

pub use error::{KeyError, Result};
pub use keying::{Frame, KeyColor, KeyParameters, KeySettings, Mask};
pub use pipeline::{CancelToken, FrameSynchronizer, RunSummary};
pub use session::{MediaPaths, RunState, Session};
