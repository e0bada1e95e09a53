//! Headless browser automation for PDF and raster output.
//!
//! # Module Structure
//!
//! - [`session`] - Shared browser session with lazy launch and scoped pages
//! - [`driver`] - Backend traits (browser, page, page task)
//! - [`chromium`] - DevTools backend for Chrome/Chromium/Edge
//! - [`launch`] - Environment-driven flags and executable discovery
//! - [`guard`] - Diagnostics for blocked local-file loads
//!
//! # Example
//!
//! ```no_run
//! use slidepress_lib::browser::{BrowserSession, ChromiumDriver, LaunchEnvironment, LaunchOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> slidepress_lib::Result<()> {
//! let options = LaunchOptions {
//!     args: LaunchEnvironment::detect().launch_args(),
//!     ..LaunchOptions::default()
//! };
//! let session = BrowserSession::new(Arc::new(ChromiumDriver), options);
//! let browser = session.run_browser().await?;
//! let page = browser.new_page().await?;
//! page.close().await?;
//! session.close_browser().await?;
//! # Ok(())
//! # }
//! ```

mod chromium;
mod driver;
mod guard;
mod launch;
mod session;

pub use chromium::ChromiumDriver;
pub use driver::{
    BrowserDriver, BrowserHandle, FailureListener, ImageFormat, LaunchOptions, LaunchedBrowser,
    PageHandle, PageTask,
};
pub use guard::{blocked_files_warning, LocalFileAccessGuard};
pub use launch::{find_executable, LaunchEnvironment, CHROME_PATH_ENV};
pub use session::{BrowserSession, LocalFileStrategy};
