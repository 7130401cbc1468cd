mod composite;
mod context;
mod filter;
mod hsv;
mod mask;
pub mod types;

pub use composite::{composite, composite_into};
pub use context::ProcessingContext;
pub use hsv::{rgb_to_hsv, Hsv};
pub use mask::{compute_mask, compute_mask_into, HueBand};
pub use types::{Frame, KeyColor, KeyParameters, KeySettings, Mask};
