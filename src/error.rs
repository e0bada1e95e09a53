use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template is not found: {0}")]
    UnknownTemplate(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Engine does not provide a render capability: {0}")]
    EngineNotRenderable(String),

    #[error("Engine did not report deck information after rendering")]
    MissingEngineInfo,

    #[error("Output path cannot be specified with processing multiple files")]
    OutputConflict,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out after {timeout:?} while waiting for {stage}")]
    Timeout {
        stage: &'static str,
        timeout: Duration,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl ConvertError {
    pub fn engine(message: impl Into<String>) -> Self {
        ConvertError::Engine(message.into())
    }

    pub fn browser(message: impl Into<String>) -> Self {
        ConvertError::Browser(message.into())
    }

    pub fn timeout(stage: &'static str, timeout: Duration) -> Self {
        ConvertError::Timeout { stage, timeout }
    }

    /// Whether the error aborts the whole invocation rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConvertError::UnknownTemplate(_)
                | ConvertError::EngineNotRenderable(_)
                | ConvertError::OutputConflict
                | ConvertError::Config(_)
        )
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            ConvertError::Io(e) => ErrorPayload::new(
                ErrorCategory::Io,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            ConvertError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check directive values; they must be representable as JSON.",
            ),
            ConvertError::UnknownTemplate(name) => ErrorPayload::new(
                ErrorCategory::Config,
                self.to_string(),
                format!(
                    "Template '{}' does not exist. Use one of: bare, bespoke.",
                    name
                ),
            ),
            ConvertError::Engine(msg) => ErrorPayload::new(
                ErrorCategory::Engine,
                msg.to_string(),
                "Inspect the markdown source; rerun with --verbose for details.",
            ),
            ConvertError::EngineNotRenderable(_) => ErrorPayload::new(
                ErrorCategory::Engine,
                self.to_string(),
                "The configured engine must expose a render capability.",
            ),
            ConvertError::MissingEngineInfo => ErrorPayload::new(
                ErrorCategory::Engine,
                self.to_string(),
                "The engine must run registered plugins after every render.",
            ),
            ConvertError::OutputConflict => ErrorPayload::new(
                ErrorCategory::Config,
                self.to_string(),
                "Pass an output directory together with --input-dir, or omit --output.",
            ),
            ConvertError::Browser(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("executable") || lower.contains("not found") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Install Chrome/Chromium or set CHROME_PATH (or --browser-path) to its executable.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Re-run with --verbose; check that the browser can start in this environment.",
                    )
                }
            }
            ConvertError::Timeout { .. } => ErrorPayload::new(
                ErrorCategory::Browser,
                self.to_string(),
                "Try increasing --nav-timeout/--network-idle-timeout or ensure the deck loads without blocking.",
            ),
            ConvertError::Config(msg) => ErrorPayload::new(
                ErrorCategory::Config,
                msg.to_string(),
                "Check flags/paths (e.g., --jpeg-quality 1-100) and the config file.",
            ),
            ConvertError::Watch(e) => ErrorPayload::new(
                ErrorCategory::Io,
                e.to_string(),
                "Check that the watched inputs exist and are readable.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Io,
    Engine,
    Browser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
