//! Core types used throughout the conversion pipeline.
//!
//! This module contains the fundamental data structures:
//! - [`ConvertType`] - Target artifact format
//! - [`RenderOutput`] - Structured engine output (markup, style, comments)
//! - [`EngineInfo`] - Side-channel deck metadata captured during a render

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use crate::viewport::Viewport;

/// Target artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvertType {
    #[default]
    Html,
    Pdf,
    Png,
    Jpeg,
}

impl ConvertType {
    /// File extension (without dot) used for derived output paths.
    pub fn extension(self) -> &'static str {
        match self {
            ConvertType::Html => "html",
            ConvertType::Pdf => "pdf",
            ConvertType::Png => "png",
            ConvertType::Jpeg => "jpg",
        }
    }

    /// Whether producing this format requires the headless browser.
    pub fn needs_browser(self) -> bool {
        !matches!(self, ConvertType::Html)
    }

    /// Infers the format from an output file extension.
    pub fn from_extension(ext: &str) -> Option<ConvertType> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(ConvertType::Html),
            "pdf" => Some(ConvertType::Pdf),
            "png" => Some(ConvertType::Png),
            "jpg" | "jpeg" => Some(ConvertType::Jpeg),
            _ => None,
        }
    }
}

impl fmt::Display for ConvertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConvertType::Html => "html",
            ConvertType::Pdf => "pdf",
            ConvertType::Png => "png",
            ConvertType::Jpeg => "jpeg",
        };
        f.write_str(name)
    }
}

impl FromStr for ConvertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(ConvertType::Html),
            "pdf" => Ok(ConvertType::Pdf),
            "png" => Ok(ConvertType::Png),
            "jpg" | "jpeg" => Ok(ConvertType::Jpeg),
            other => Err(format!(
                "Unsupported output type '{other}'. Supported types: html, pdf, png, jpeg."
            )),
        }
    }
}

/// Structured output of one engine render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Slide markup, one `<section>` per slide.
    pub html: String,
    /// Stylesheet for the active theme plus inline styles.
    pub css: String,
    /// Non-directive comments, one list per slide.
    pub comments: Vec<Vec<String>>,
}

/// Deck metadata reported by the engine through the info plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInfo {
    /// Name of the theme the deck resolved to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Theme named by the deck, even when it was not available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_theme: Option<String>,
    /// Declared slide dimensions.
    pub size: Viewport,
    /// Pass-through metadata directives (title, description, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl EngineInfo {
    pub fn title(&self) -> Option<&str> {
        self.meta.get("title").map(String::as_str)
    }

    pub fn lang(&self) -> Option<&str> {
        self.meta.get("lang").map(String::as_str)
    }
}
