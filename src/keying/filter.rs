//! Morphological and smoothing filters for single-channel masks.
//!
//! Both filters are separable: a horizontal pass writes into a scratch plane,
//! a vertical pass writes back into the mask. The scratch plane is reused
//! across frames and reshaped only when the frame size changes.

use ndarray::Array2;

/// Fixed binomial kernels used for small sizes, indexed by `ksize / 2`
const SMALL_KERNELS: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[
        0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
    ],
];

/// Make sure `scratch` has the same shape as `like`
pub fn ensure_shape(scratch: &mut Array2<f32>, like: &Array2<f32>) {
    if scratch.dim() != like.dim() {
        *scratch = Array2::zeros(like.dim());
    }
}

/// Dilate with a square structuring element of side `ksize`
///
/// Samples outside the image are ignored, so borders never pull values up.
pub fn dilate_square(mask: &mut Array2<f32>, scratch: &mut Array2<f32>, ksize: usize) {
    if ksize <= 1 {
        return;
    }
    ensure_shape(scratch, mask);

    let (height, width) = mask.dim();
    let half = ksize / 2;

    // Horizontal pass
    for y in 0..height {
        for x in 0..width {
            let lo = x.saturating_sub(half);
            let hi = (x + half).min(width - 1);
            let mut best = f32::MIN;
            for sx in lo..=hi {
                best = best.max(mask[[y, sx]]);
            }
            scratch[[y, x]] = best;
        }
    }

    // Vertical pass
    for y in 0..height {
        let lo = y.saturating_sub(half);
        let hi = (y + half).min(height - 1);
        for x in 0..width {
            let mut best = f32::MIN;
            for sy in lo..=hi {
                best = best.max(scratch[[sy, x]]);
            }
            mask[[y, x]] = best;
        }
    }
}

/// Build a normalized 1D Gaussian kernel of odd length `ksize`
///
/// Sigma is derived from the size: `0.3 * ((ksize - 1) / 2 - 1) + 0.8`.
pub fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    debug_assert!(ksize % 2 == 1, "kernel size must be odd");

    if let Some(kernel) = SMALL_KERNELS.get(ksize / 2) {
        return kernel.to_vec();
    }

    let sigma = 0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let scale = -0.5 / (sigma * sigma);
    let center = (ksize as f64 - 1.0) * 0.5;

    let weights: Vec<f64> = (0..ksize)
        .map(|i| {
            let x = i as f64 - center;
            (scale * x * x).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();

    weights.iter().map(|w| (w / sum) as f32).collect()
}

/// Gaussian blur with a `ksize` x `ksize` kernel and mirrored borders
///
/// Output is clamped to [0, 1] to absorb rounding drift in the kernel sum.
pub fn gaussian_blur(mask: &mut Array2<f32>, scratch: &mut Array2<f32>, ksize: usize) {
    if ksize <= 1 {
        return;
    }
    ensure_shape(scratch, mask);

    let kernel = gaussian_kernel(ksize);
    let (height, width) = mask.dim();
    let half = (ksize / 2) as isize;

    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (ki, &weight) in kernel.iter().enumerate() {
                let sx = reflect_101(x as isize + ki as isize - half, width);
                acc += mask[[y, sx]] * weight;
            }
            scratch[[y, x]] = acc;
        }
    }

    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (ki, &weight) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + ki as isize - half, height);
                acc += scratch[[sy, x]] * weight;
            }
            mask[[y, x]] = acc.clamp(0.0, 1.0);
        }
    }
}

/// Mirror an out-of-range index without repeating the edge sample (`gfedcb|abcdefgh|gfedcba`)
fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let i = i.rem_euclid(period);
    if i >= len as isize {
        (period - i) as usize
    } else {
        i as usize
    }
}
