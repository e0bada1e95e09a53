//! Slidepress Library
//!
//! Converts markdown slide decks into HTML, PDF, PNG and JPEG. Rendering goes
//! through a pluggable engine; PDF and image output is captured with a single
//! shared headless browser.
//!
//! # Module Overview
//!
//! - [`converter`] - Orchestrates rendering, capture and batch conversion
//! - [`engine`] - Engine contract, adapter and the built-in slide engine
//! - [`browser`] - Shared browser session, Chromium backend, local-file guard
//! - [`pipeline`] - Per-format capture (PDF, PNG, JPEG)
//! - [`template`] - HTML document templates
//! - [`theme`] - Theme stylesheets and registry
//! - [`file`] - Input/output file abstraction
//! - [`watch`] - Live-reload tokens and change detection
//! - [`config`] - Configuration file support
//!
//! # Example
//!
//! ```no_run
//! use slidepress_lib::browser::{BrowserSession, ChromiumDriver, LaunchOptions};
//! use slidepress_lib::{ConvertFileOptions, ConvertType, Converter, ConverterOptions, SourceFile, ThemeCatalog};
//! use std::sync::Arc;
//!
//! # async fn example() -> slidepress_lib::Result<()> {
//! let options = ConverterOptions {
//!     convert_type: ConvertType::Pdf,
//!     ..ConverterOptions::default()
//! };
//! let session = BrowserSession::new(Arc::new(ChromiumDriver), LaunchOptions::default());
//! let converter = Converter::new(options, Arc::new(ThemeCatalog::default()), session)?;
//!
//! let results = converter
//!     .convert_files(vec![SourceFile::new("deck.md")], &ConvertFileOptions::default())
//!     .await?;
//! converter.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod converter;
pub mod engine;
pub mod error;
pub mod file;
pub mod pipeline;
pub mod template;
pub mod theme;
pub mod types;
pub mod viewport;
pub mod watch;

pub use browser::{BrowserSession, ChromiumDriver, LaunchOptions, LocalFileStrategy};
pub use config::{Config, Timeouts};
pub use converter::{ConvertFileOptions, ConvertResult, Converter, ConverterOptions};
pub use engine::{Engine, EngineDescriptor, EngineOptions, SlideEngine};
pub use error::{ConvertError, ErrorCategory, ErrorPayload, Result};
pub use file::{FileKind, OutputTarget, SourceFile};
pub use template::{Template, TemplateOptions, TemplateResult};
pub use theme::{Theme, ThemeCatalog, ThemeRegistry};
pub use types::{ConvertType, EngineInfo, GlobalDirectives, RenderOutput};
pub use viewport::Viewport;
pub use watch::{ReloadNotifier, SourceWatcher, TokenRegistry};
