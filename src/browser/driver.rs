//! Driver seams between the browser session and a concrete browser backend.
//!
//! The session only talks to these traits, so the Chromium backend can be
//! swapped for an in-process fake in tests.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::{Result, Viewport};

/// Callback invoked with the URL of every request that failed to load.
pub type FailureListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Settings used when launching a browser process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Explicit executable; discovered when `None`.
    pub executable: Option<PathBuf>,
    /// Extra command-line switches.
    pub args: Vec<String>,
    /// Show the browser window instead of running headless.
    pub headful: bool,
}

/// Raster encodings supported by [`PageHandle::screenshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg { quality: u8 },
}

/// A freshly launched browser process.
pub struct LaunchedBrowser {
    pub handle: Arc<dyn BrowserHandle>,
    /// Resolves once the connection to the process is gone.
    pub disconnected: oneshot::Receiver<()>,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<LaunchedBrowser>;
}

#[async_trait]
pub trait BrowserHandle: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>>;

    async fn close(&self) -> Result<()>;
}

/// One browser tab.
#[async_trait]
pub trait PageHandle: Send {
    /// Registers a listener for failed requests. Must be called before navigation.
    async fn on_request_failed(&mut self, listener: FailureListener) -> Result<()>;

    /// Navigates and resolves once the DOM content has loaded.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Resolves once no request has been in flight for a short quiet period.
    async fn wait_for_network_idle(&mut self) -> Result<()>;

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    async fn emulate_print_media(&mut self) -> Result<()>;

    /// Prints with background graphics, sized by the document's `@page` rules.
    async fn print_pdf(&mut self) -> Result<Vec<u8>>;

    async fn screenshot(&mut self, format: ImageFormat) -> Result<Vec<u8>>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// A unit of work run against a page by [`super::BrowserSession::use_page`].
#[async_trait]
pub trait PageTask: Send + Sync {
    type Output: Send;

    async fn run(&self, page: &mut dyn PageHandle, uri: &str) -> Result<Self::Output>;
}
