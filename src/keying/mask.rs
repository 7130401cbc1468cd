use super::filter::{dilate_square, gaussian_blur};
use super::hsv::{rgb_to_hsv, Hsv};
use super::types::{Frame, KeyParameters, Mask};
use ndarray::Array2;

const HUE_RANGE: f32 = 360.0;

/// Per-pixel match test derived from the key color and parameters
///
/// A pixel matches when its hue lies in `[lower, upper]` (wrapping around 360)
/// and both saturation and value are at least `floor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueBand {
    lower: f32,
    upper: f32,
    floor: f32,
}

impl HueBand {
    pub fn new(key: Hsv, params: &KeyParameters) -> Self {
        let span = params.tolerance() as f32 / 100.0 * HUE_RANGE;
        Self {
            lower: key.h - span,
            upper: key.h + span,
            floor: params.defringe() as f32 / 100.0,
        }
    }

    pub fn matches(&self, pixel: Hsv) -> bool {
        if !(self.floor..=1.0).contains(&pixel.s) || !(self.floor..=1.0).contains(&pixel.v) {
            return false;
        }

        let h = pixel.h;
        if (self.lower..=self.upper).contains(&h) {
            return true;
        }

        // Hue is circular: spill the band over the 0/360 seam on either side
        if self.lower < 0.0 && (self.lower + HUE_RANGE..=HUE_RANGE).contains(&h) {
            return true;
        }
        self.upper > HUE_RANGE && (0.0..=self.upper - HUE_RANGE).contains(&h)
    }
}

/// Compute the key mask for `frame` into `mask`, reusing `scratch` for the softening filters
///
/// Steps:
/// 1. Normalize each pixel to [0, 1] and convert to HSV
/// 2. Mark pixels inside the hue band and above the defringe floor
/// 3. If softness > 0, dilate then blur with a (2*softness+1) square kernel
pub fn compute_mask_into(
    frame: &Frame,
    key: Hsv,
    params: &KeyParameters,
    mask: &mut Mask,
    scratch: &mut Array2<f32>,
) {
    let _span = tracing::debug_span!("mask").entered();

    let (width, height) = frame.dimensions();
    let shape = (height as usize, width as usize);
    if mask.dim() != shape {
        *mask = Array2::zeros(shape);
    }

    let band = HueBand::new(key, params);
    for (x, y, pixel) in frame.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let hsv = rgb_to_hsv(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        mask[[y as usize, x as usize]] = if band.matches(hsv) { 1.0 } else { 0.0 };
    }

    if params.softness() > 0 {
        let ksize = 2 * params.softness() as usize + 1;
        dilate_square(mask, scratch, ksize);
        gaussian_blur(mask, scratch, ksize);
    }
}

/// Allocating variant of [`compute_mask_into`]
pub fn compute_mask(frame: &Frame, key: Hsv, params: &KeyParameters) -> Mask {
    let mut mask = Array2::zeros((0, 0));
    let mut scratch = Array2::zeros((0, 0));
    compute_mask_into(frame, key, params, &mut mask, &mut scratch);
    mask
}
