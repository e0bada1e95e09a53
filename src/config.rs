use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::types::ConvertType;

/// Directory name under `$HOME/.config` holding the central config.
pub const CONFIG_DIR_NAME: &str = "slidepress";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(rename = "type")]
    pub convert_type: Option<ConvertType>,
    pub template: String,
    pub jpeg_quality: u8,
    pub allow_local_files: bool,
    pub html: Option<bool>,
    pub lang: Option<String>,
    pub output: Option<PathBuf>,
    pub input_dir: Option<PathBuf>,
    pub theme_set: Vec<PathBuf>,
    pub timeouts: Timeouts,
    pub browser: BrowserSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub navigation: Duration,
    #[serde(with = "humantime_serde")]
    pub network_idle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            network_idle: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserSettings {
    pub executable: Option<PathBuf>,
    pub headful: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            convert_type: None,
            template: "bespoke".to_string(),
            jpeg_quality: 85,
            allow_local_files: false,
            html: None,
            lang: None,
            output: None,
            input_dir: None,
            theme_set: Vec::new(),
            timeouts: Timeouts::default(),
            browser: BrowserSettings::default(),
        }
    }
}

impl Config {
    /// `$HOME/.config/slidepress/config.toml`, if `HOME` is set.
    pub fn central_config_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME").filter(|h| !h.is_empty())?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        )
    }

    /// Loads an explicit config, falling back to the central one, then defaults.
    ///
    /// Relative paths inside a file are resolved against the file's directory.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let candidate = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::central_config_path().filter(|p| p.is_file()),
        };
        let Some(path) = candidate else {
            return Ok(Config::default());
        };

        let content = std::fs::read_to_string(&path)?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.output.iter_mut().for_each(resolve);
        self.input_dir.iter_mut().for_each(resolve);
        self.theme_set.iter_mut().for_each(resolve);
        self.browser.executable.iter_mut().for_each(resolve);
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "jpeg_quality must be between 1 and 100 (got {})",
                self.jpeg_quality
            ));
        }
        if self.timeouts.navigation.is_zero() {
            return Err("timeouts.navigation must be greater than zero".to_string());
        }
        if self.timeouts.network_idle.is_zero() {
            return Err("timeouts.network_idle must be greater than zero".to_string());
        }
        if self.template.trim().is_empty() {
            return Err("template must not be empty".to_string());
        }
        Ok(())
    }
}
