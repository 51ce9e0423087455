//! RGB color type with hex parsing

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An sRGB color as stored in run properties and brand palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Error)]
pub enum RgbParseError {
    #[error("hex color must have 3 or 6 digits, got '{0}'")]
    BadLength(String),
    #[error("invalid hex digit in '{0}'")]
    BadDigit(String),
}

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// Parse `#RRGGBB` or `#RGB` (leading `#` optional).
    pub fn from_hex(s: &str) -> Result<Self, RgbParseError> {
        let digits = s.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(RgbParseError::BadLength(s.to_string())),
        };
        let parse = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&expanded[range], 16)
                .map_err(|_| RgbParseError::BadDigit(s.to_string()))
        };
        Ok(Rgb(parse(0..2)?, parse(2..4)?, parse(4..6)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = RgbParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rgb::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_six_digit() {
        assert_eq!(Rgb::from_hex("#0D2A47").unwrap(), Rgb(13, 42, 71));
        assert_eq!(Rgb::from_hex("ffffff").unwrap(), Rgb::WHITE);
    }

    #[test]
    fn test_parse_three_digit() {
        assert_eq!(Rgb::from_hex("#f00").unwrap(), Rgb(255, 0, 0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Rgb::from_hex("#12345").is_err());
        assert!(Rgb::from_hex("#zzzzzz").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let c = Rgb(13, 42, 71);
        assert_eq!(Rgb::from_hex(&c.to_string()).unwrap(), c);
    }
}
