//! Keying presets loaded from TOML
//!
//! ```toml
//! tolerance = 15
//! softness = 3
//! defringe = 35
//! key_color = "#1fbf3a"   # or: pick = [12, 40]
//! ```

use crate::acquire::ColorPick;
use crate::error::{KeyError, Result};
use crate::keying::{KeyColor, KeyParameters};
use serde::Deserialize;
use std::path::Path;

/// Partially specified keying settings
///
/// Used both for preset files and for command line overrides; unset fields
/// fall through to the next layer and finally to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preset {
    pub tolerance: Option<u32>,
    pub softness: Option<u32>,
    pub defringe: Option<u32>,
    pub key_color: Option<String>,
    pub pick: Option<[u32; 2]>,
}

impl Preset {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            KeyError::config(format!("Failed to read preset {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
            .map_err(|e| KeyError::config(format!("Invalid preset {}: {}", path.display(), e)))
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Fill unset fields of `self` from `lower`
    ///
    /// A color choice is taken as a whole: if `self` names a color or a pick
    /// position, neither is inherited from `lower`.
    pub fn over(self, lower: Preset) -> Preset {
        let has_color = self.key_color.is_some() || self.pick.is_some();
        Preset {
            tolerance: self.tolerance.or(lower.tolerance),
            softness: self.softness.or(lower.softness),
            defringe: self.defringe.or(lower.defringe),
            key_color: if has_color { self.key_color } else { lower.key_color },
            pick: if has_color { self.pick } else { lower.pick },
        }
    }

    /// Validated parameters, defaults for anything unset
    pub fn parameters(&self) -> Result<KeyParameters> {
        let defaults = KeyParameters::default();
        KeyParameters::new(
            self.tolerance.unwrap_or(defaults.tolerance()),
            self.softness.unwrap_or(defaults.softness()),
            self.defringe.unwrap_or(defaults.defringe()),
        )
    }

    /// Color choice; an explicit color wins over a pick position
    pub fn color_pick(&self) -> Result<ColorPick> {
        if let Some(color) = &self.key_color {
            return Ok(ColorPick::Color(color.parse::<KeyColor>()?));
        }
        Ok(match self.pick {
            Some([x, y]) => ColorPick::At { x, y },
            None => ColorPick::default(),
        })
    }
}
