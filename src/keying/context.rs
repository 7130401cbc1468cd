use super::composite::composite_into;
use super::mask::compute_mask_into;
use super::types::{Frame, KeySettings, Mask};
use crate::error::Result;
use ndarray::Array2;

/// Scratch buffers for one keying pipeline
///
/// Buffers are sized on first use and reshaped when the frame size changes.
/// Keying through a context produces the same frames as the allocating
/// [`compute_mask`](super::compute_mask) / [`composite`](super::composite) pair.
pub struct ProcessingContext {
    mask: Mask,
    scratch: Array2<f32>,
    output: Frame,
}

impl ProcessingContext {
    pub fn new() -> Self {
        Self {
            mask: Array2::zeros((0, 0)),
            scratch: Array2::zeros((0, 0)),
            output: Frame::new(0, 0),
        }
    }

    /// Key out one frame against an already resized background
    pub fn key_frame(
        &mut self,
        foreground: &Frame,
        background: &Frame,
        settings: &KeySettings,
    ) -> Result<&Frame> {
        compute_mask_into(
            foreground,
            settings.color.hsv(),
            &settings.params,
            &mut self.mask,
            &mut self.scratch,
        );
        composite_into(foreground, background, &self.mask, &mut self.output)?;
        Ok(&self.output)
    }

    /// Mask computed for the most recent frame
    pub fn mask(&self) -> &Mask {
        &self.mask
    }
}

impl Default for ProcessingContext {
    fn default() -> Self {
        Self::new()
    }
}
