use crate::error::{KeyError, Result};
use image::{Rgb, RgbImage};
use ndarray::Array2;
use std::fmt;
use std::str::FromStr;

use super::hsv::{rgb_to_hsv, Hsv};

/// A decoded 8-bit RGB frame
pub type Frame = RgbImage;

/// Alpha mask: 1.0 = matches the key color (background), 0.0 = foreground
/// Shape is (height, width), matching the frame it was computed from
pub type Mask = Array2<f32>;

/// Upper bound for tolerance and defringe
pub const PERCENT_MAX: u32 = 100;

/// Upper bound for softness; the softening kernel is `2 * softness + 1` wide
pub const SOFTNESS_MAX: u32 = 100;

/// The reference background color picked by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyColor(pub Rgb<u8>);

impl KeyColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self(Rgb([r, g, b]))
    }

    /// Sample the color at (x, y) of a reference frame
    pub fn pick(frame: &Frame, x: u32, y: u32) -> Result<Self> {
        let (width, height) = frame.dimensions();
        if x >= width || y >= height {
            return Err(KeyError::config(format!(
                "Pick position {},{} is outside the {}x{} reference frame",
                x, y, width, height
            )));
        }
        Ok(Self(*frame.get_pixel(x, y)))
    }

    /// HSV representation used by the mask engine
    pub fn hsv(&self) -> Hsv {
        let [r, g, b] = self.0 .0;
        rgb_to_hsv(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }
}

impl fmt::Display for KeyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0 .0;
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

impl FromStr for KeyColor {
    type Err = KeyError;

    /// Parse `#rrggbb` or `rrggbb`
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(KeyError::config(format!("Invalid key color: {}", s)));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| KeyError::config(format!("Invalid key color: {}", s)))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Tunable keying parameters, frozen for the duration of one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyParameters {
    tolerance: u32,
    softness: u32,
    defringe: u32,
}

impl KeyParameters {
    pub fn new(tolerance: u32, softness: u32, defringe: u32) -> Result<Self> {
        if tolerance > PERCENT_MAX {
            return Err(KeyError::config(format!(
                "Tolerance must be within 0..={}, got {}",
                PERCENT_MAX, tolerance
            )));
        }
        if softness > SOFTNESS_MAX {
            return Err(KeyError::config(format!(
                "Softness must be within 0..={}, got {}",
                SOFTNESS_MAX, softness
            )));
        }
        if defringe > PERCENT_MAX {
            return Err(KeyError::config(format!(
                "Defringe must be within 0..={}, got {}",
                PERCENT_MAX, defringe
            )));
        }
        Ok(Self {
            tolerance,
            softness,
            defringe,
        })
    }

    /// Half-width of the matched hue band, as a percentage of 360 degrees
    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    /// Radius of the dilate + blur pass applied to the mask
    pub fn softness(&self) -> u32 {
        self.softness
    }

    /// Percentage floor on saturation and value for a pixel to count as background
    pub fn defringe(&self) -> u32 {
        self.defringe
    }
}

impl Default for KeyParameters {
    fn default() -> Self {
        Self {
            tolerance: 12,
            softness: 2,
            defringe: 40,
        }
    }
}

/// Everything the keying core needs, handed over in one piece by the acquisition layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeySettings {
    pub color: KeyColor,
    pub params: KeyParameters,
}
