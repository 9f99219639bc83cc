//! `#RRGGBB` colors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Opaque 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| CoreError::InvalidColor(s.to_string()))?;

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| CoreError::InvalidColor(s.to_string()))
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl TryFrom<String> for Rgb {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!("#ff5500".parse::<Rgb>().unwrap(), Rgb::new(0xff, 0x55, 0x00));
        assert_eq!("#00AAff".parse::<Rgb>().unwrap(), Rgb::new(0x00, 0xaa, 0xff));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["ff5500", "#ff550", "#ff55000", "#gg5500", "", "#"] {
            assert!(matches!(bad.parse::<Rgb>(), Err(CoreError::InvalidColor(_))), "{}", bad);
        }
    }

    #[test]
    fn test_serde_round_trip_as_string() {
        let color: Rgb = serde_json::from_str(r##""#102030""##).unwrap();
        assert_eq!(color, Rgb::new(0x10, 0x20, 0x30));
        assert_eq!(serde_json::to_string(&color).unwrap(), r##""#102030""##);
    }
}
