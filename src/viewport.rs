use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Slide dimensions in CSS pixels.
///
/// Used both as the declared size of a rendered deck and as the browser
/// viewport when capturing raster output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::WIDESCREEN
    }
}

impl Viewport {
    /// The `16:9` preset.
    pub const WIDESCREEN: Viewport = Viewport {
        width: 1280,
        height: 720,
    };

    /// The `4:3` preset.
    pub const STANDARD: Viewport = Viewport {
        width: 960,
        height: 720,
    };

    /// Looks up a named aspect-ratio preset.
    pub fn preset(name: &str) -> Option<Viewport> {
        match name.trim() {
            "16:9" => Some(Self::WIDESCREEN),
            "4:3" => Some(Self::STANDARD),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewportParseError {
    #[error("Invalid size format: expected WIDTHxHEIGHT (e.g., 1280x720) or a preset (16:9, 4:3)")]
    InvalidFormat,
    #[error("Invalid width: {0}")]
    InvalidWidth(String),
    #[error("Invalid height: {0}")]
    InvalidHeight(String),
    #[error("Width must be positive")]
    ZeroWidth,
    #[error("Height must be positive")]
    ZeroHeight,
}

impl FromStr for Viewport {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(preset) = Viewport::preset(s) {
            return Ok(preset);
        }

        let parts: Vec<&str> = s.split('x').collect();
        if parts.len() != 2 {
            return Err(ViewportParseError::InvalidFormat);
        }

        let width: u32 = parts[0]
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidWidth(parts[0].to_string()))?;

        let height: u32 = parts[1]
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidHeight(parts[1].to_string()))?;

        if width == 0 {
            return Err(ViewportParseError::ZeroWidth);
        }
        if height == 0 {
            return Err(ViewportParseError::ZeroHeight);
        }

        Ok(Viewport { width, height })
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let vp: Viewport = "1920x1080".parse().unwrap();
        assert_eq!(vp.width, 1920);
        assert_eq!(vp.height, 1080);
    }

    #[test]
    fn test_parse_presets() {
        assert_eq!("16:9".parse::<Viewport>().unwrap(), Viewport::WIDESCREEN);
        assert_eq!(" 4:3 ".parse::<Viewport>().unwrap(), Viewport::STANDARD);
        assert!(Viewport::preset("21:9").is_none());
    }

    #[test]
    fn test_parse_with_spaces() {
        let vp: Viewport = " 800 x 600 ".parse().unwrap();
        assert_eq!(vp.width, 800);
        assert_eq!(vp.height, 600);
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!("1280".parse::<Viewport>().is_err());
        assert!("1280x720x600".parse::<Viewport>().is_err());
        assert!("x720".parse::<Viewport>().is_err());
    }

    #[test]
    fn test_parse_zero_dimensions() {
        assert!("0x720".parse::<Viewport>().is_err());
        assert!("1280x0".parse::<Viewport>().is_err());
    }

    #[test]
    fn test_default_is_widescreen() {
        let vp = Viewport::default();
        assert_eq!(vp.width, 1280);
        assert_eq!(vp.height, 720);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Viewport::STANDARD), "960x720");
    }
}
