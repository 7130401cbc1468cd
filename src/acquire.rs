//! Key color and parameter acquisition
//!
//! The keying core never watches the user pick a color. It asks an
//! acquisition layer once per pass and gets back either complete settings or
//! nothing (the user is done).

use crate::error::{KeyError, Result};
use crate::keying::{Frame, KeyColor, KeyParameters, KeySettings};
use std::str::FromStr;

/// Trait for anything that can hand over key settings
pub trait KeyAcquisition {
    /// Produce settings for the next pass, looking at `reference` (the first
    /// foreground frame). `None` ends the session.
    fn acquire(&mut self, reference: &Frame) -> Result<Option<KeySettings>>;

    /// Whether another pass may be requested; `false` ends the session before
    /// any media is opened
    fn wants_pass(&self) -> bool {
        true
    }
}

/// How the key color is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPick {
    /// Sample the reference frame at this position
    At { x: u32, y: u32 },
    /// Use this color as is
    Color(KeyColor),
}

impl ColorPick {
    pub fn resolve(&self, reference: &Frame) -> Result<KeyColor> {
        match *self {
            ColorPick::At { x, y } => KeyColor::pick(reference, x, y),
            ColorPick::Color(color) => Ok(color),
        }
    }
}

impl Default for ColorPick {
    fn default() -> Self {
        ColorPick::At { x: 0, y: 0 }
    }
}

impl FromStr for ColorPick {
    type Err = KeyError;

    /// Parse `X,Y`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || KeyError::config(format!("Invalid pick position (expected X,Y): {}", s));
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse::<u32>().map_err(|_| invalid())?;
        let y = y.trim().parse::<u32>().map_err(|_| invalid())?;
        Ok(ColorPick::At { x, y })
    }
}

/// Non-interactive acquisition from pre-set values
pub struct PresetAcquisition {
    pick: ColorPick,
    params: KeyParameters,
    passes: u32,
}

impl PresetAcquisition {
    /// Acquisition that yields exactly one pass
    pub fn new(pick: ColorPick, params: KeyParameters) -> Self {
        Self {
            pick,
            params,
            passes: 1,
        }
    }

    pub fn with_passes(mut self, passes: u32) -> Self {
        self.passes = passes;
        self
    }
}

impl KeyAcquisition for PresetAcquisition {
    fn wants_pass(&self) -> bool {
        self.passes > 0
    }

    fn acquire(&mut self, reference: &Frame) -> Result<Option<KeySettings>> {
        if self.passes == 0 {
            return Ok(None);
        }
        self.passes -= 1;

        let color = self.pick.resolve(reference)?;
        tracing::info!("Key color {} ({:?})", color, self.pick);

        Ok(Some(KeySettings {
            color,
            params: self.params,
        }))
    }
}
