//! Brand color palette for contrast correction.
//!
//! Loaded from a small TOML file so decks from different brands can supply
//! their own dark/light pair without recompiling; an embedded default is
//! used when no file is given.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::model::Rgb;

/// Errors that can occur when loading or parsing a palette file
#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("failed to read palette file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse palette TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("palette color '{name}' is not a valid hex color: {value}")]
    BadColor { name: String, value: String },
    #[error("palette is missing required color '{0}'")]
    Missing(&'static str),
}

/// The candidate colors contrast correction may recolor text with.
#[derive(Debug, Clone)]
pub struct BrandPalette {
    pub name: Option<String>,
    /// Dark brand color, tried first against light backgrounds
    pub dark: Rgb,
    /// Light brand color, tried first against dark backgrounds
    pub light: Rgb,
}

#[derive(Deserialize)]
struct TomlPalette {
    metadata: Option<TomlMetadata>,
    colors: HashMap<String, String>,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
}

const DEFAULT_PALETTE: &str = r##"
[colors]
brand-dark = "#0D2A47"
brand-light = "#FFFFFF"
"##;

impl BrandPalette {
    /// Load a palette from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, PaletteError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a palette from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, PaletteError> {
        let parsed: TomlPalette = toml::from_str(content)?;
        let lookup = |name: &'static str| -> Result<Rgb, PaletteError> {
            let value = parsed.colors.get(name).ok_or(PaletteError::Missing(name))?;
            value.parse().map_err(|_| PaletteError::BadColor {
                name: name.to_string(),
                value: value.clone(),
            })
        };
        Ok(BrandPalette {
            name: parsed.metadata.as_ref().and_then(|m| m.name.clone()),
            dark: lookup("brand-dark")?,
            light: lookup("brand-light")?,
        })
    }
}

impl Default for BrandPalette {
    fn default() -> Self {
        // The embedded palette is a compile-time constant; a parse failure
        // here is a programming error, so expect is acceptable.
        Self::from_toml(DEFAULT_PALETTE).expect("embedded default palette must parse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_palette() {
        let p = BrandPalette::default();
        assert_eq!(p.dark, Rgb(0x0D, 0x2A, 0x47));
        assert_eq!(p.light, Rgb(0xFF, 0xFF, 0xFF));
    }

    #[test]
    fn test_custom_palette_with_metadata() {
        let p = BrandPalette::from_toml(
            r##"
[metadata]
name = "acme"

[colors]
brand-dark = "#123"
brand-light = "#fafafa"
"##,
        )
        .unwrap();
        assert_eq!(p.name.as_deref(), Some("acme"));
        assert_eq!(p.dark, Rgb(0x11, 0x22, 0x33));
    }

    #[test]
    fn test_missing_color_is_an_error() {
        let err = BrandPalette::from_toml("[colors]\nbrand-dark = \"#000\"\n").unwrap_err();
        assert!(matches!(err, PaletteError::Missing("brand-light")));
    }

    #[test]
    fn test_bad_hex_is_an_error() {
        let err = BrandPalette::from_toml(
            "[colors]\nbrand-dark = \"#zzz\"\nbrand-light = \"#fff\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, PaletteError::BadColor { .. }));
    }
}
