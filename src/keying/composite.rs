use super::types::{Frame, Mask};
use crate::error::{KeyError, Result};

/// Blend `background` into `foreground` where the mask is set
///
/// `out = background * mask + foreground * (1 - mask)` per channel, computed in
/// normalized space and rounded back to 8 bits. All three inputs must share the
/// foreground's dimensions.
pub fn composite_into(
    foreground: &Frame,
    background: &Frame,
    mask: &Mask,
    output: &mut Frame,
) -> Result<()> {
    let _span = tracing::debug_span!("composite").entered();

    let (width, height) = foreground.dimensions();
    if background.dimensions() != (width, height) {
        return Err(KeyError::stream(format!(
            "Background is {}x{} but the frame is {}x{}",
            background.width(),
            background.height(),
            width,
            height
        )));
    }
    if mask.dim() != (height as usize, width as usize) {
        let (rows, cols) = mask.dim();
        return Err(KeyError::stream(format!(
            "Mask is {}x{} but the frame is {}x{}",
            cols, rows, width, height
        )));
    }
    if output.dimensions() != (width, height) {
        *output = Frame::new(width, height);
    }

    for ((out, fg), (bg, &alpha)) in output
        .pixels_mut()
        .zip(foreground.pixels())
        .zip(background.pixels().zip(mask.iter()))
    {
        for c in 0..3 {
            let f = fg[c] as f32 / 255.0;
            let b = bg[c] as f32 / 255.0;
            let blended = b * alpha + f * (1.0 - alpha);
            out[c] = (blended * 255.0).round() as u8;
        }
    }

    Ok(())
}

/// Allocating variant of [`composite_into`]
pub fn composite(foreground: &Frame, background: &Frame, mask: &Mask) -> Result<Frame> {
    let mut output = Frame::new(foreground.width(), foreground.height());
    composite_into(foreground, background, mask, &mut output)?;
    Ok(output)
}
