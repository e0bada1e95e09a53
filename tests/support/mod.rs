//! In-process browser fake shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::subscriber::DefaultGuard;

use slidepress_lib::browser::{
    BrowserDriver, BrowserHandle, FailureListener, ImageFormat, LaunchOptions, LaunchedBrowser,
    PageHandle,
};
use slidepress_lib::{
    BrowserSession, ConvertError, Converter, ConverterOptions, Result, ThemeCatalog, Viewport,
};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
pub const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];

#[derive(Default)]
pub struct FakeState {
    launches: AtomicUsize,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    events: Mutex<Vec<String>>,
    visited: Mutex<Vec<String>>,
    disconnect: Mutex<Option<oneshot::Sender<()>>>,
    pub blocked_urls: Mutex<Vec<String>>,
    pub hang_network_idle: AtomicBool,
    pub fail_capture: AtomicBool,
}

impl FakeState {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    /// Simulates the browser process going away.
    pub fn disconnect(&self) {
        if let Some(tx) = self.disconnect.lock().unwrap().take() {
            let _ = tx.send(());
        }
    }

    pub fn block(&self, url: &str) {
        self.blocked_urls.lock().unwrap().push(url.to_string());
    }

    fn log(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

pub struct FakeDriver {
    state: Arc<FakeState>,
}

impl FakeDriver {
    pub fn new() -> (Self, Arc<FakeState>) {
        let state = Arc::new(FakeState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn launch(&self, _options: &LaunchOptions) -> Result<LaunchedBrowser> {
        // Give concurrent callers a chance to interleave.
        tokio::task::yield_now().await;
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        self.state.log("launch");
        let (tx, rx) = oneshot::channel();
        *self.state.disconnect.lock().unwrap() = Some(tx);
        Ok(LaunchedBrowser {
            handle: Arc::new(FakeBrowser {
                state: Arc::clone(&self.state),
            }),
            disconnected: rx,
        })
    }
}

struct FakeBrowser {
    state: Arc<FakeState>,
}

#[async_trait]
impl BrowserHandle for FakeBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            state: Arc::clone(&self.state),
            listener: None,
        }))
    }

    async fn close(&self) -> Result<()> {
        self.state.log("browser-closed");
        Ok(())
    }
}

struct FakePage {
    state: Arc<FakeState>,
    listener: Option<FailureListener>,
}

#[async_trait]
impl PageHandle for FakePage {
    async fn on_request_failed(&mut self, listener: FailureListener) -> Result<()> {
        self.listener = Some(listener);
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        self.state.visited.lock().unwrap().push(url.to_string());
        self.state.log("goto");
        let local = url::Url::parse(url)
            .ok()
            .and_then(|u| u.to_file_path().ok());
        if let Some(path) = local {
            if path.exists() {
                self.state.log("tmp-exists");
            }
        }
        let blocked = self.state.blocked_urls.lock().unwrap().clone();
        if let Some(listener) = &self.listener {
            for url in blocked {
                listener(url.as_str());
            }
        }
        Ok(())
    }

    async fn wait_for_network_idle(&mut self) -> Result<()> {
        if self.state.hang_network_idle.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.state.log(format!("viewport {viewport}"));
        Ok(())
    }

    async fn emulate_print_media(&mut self) -> Result<()> {
        self.state.log("print-media");
        Ok(())
    }

    async fn print_pdf(&mut self) -> Result<Vec<u8>> {
        if self.state.fail_capture.load(Ordering::SeqCst) {
            return Err(ConvertError::browser("capture failed"));
        }
        self.state.log("pdf");
        Ok(b"%PDF-1.7\n%fake".to_vec())
    }

    async fn screenshot(&mut self, format: ImageFormat) -> Result<Vec<u8>> {
        if self.state.fail_capture.load(Ordering::SeqCst) {
            return Err(ConvertError::browser("capture failed"));
        }
        match format {
            ImageFormat::Png => {
                self.state.log("screenshot png");
                let mut data = PNG_SIGNATURE.to_vec();
                data.extend_from_slice(b"fake");
                Ok(data)
            }
            ImageFormat::Jpeg { quality } => {
                self.state.log(format!("screenshot jpeg q{quality}"));
                let mut data = JPEG_SIGNATURE.to_vec();
                data.extend_from_slice(b"fake");
                Ok(data)
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A converter wired to a fresh fake browser.
pub fn converter(options: ConverterOptions, themes: ThemeCatalog) -> (Converter, Arc<FakeState>) {
    converter_with(options, Arc::new(themes))
}

/// Like [`converter`], keeping access to the catalog.
pub fn converter_with(
    options: ConverterOptions,
    themes: Arc<ThemeCatalog>,
) -> (Converter, Arc<FakeState>) {
    let (driver, state) = FakeDriver::new();
    let session = BrowserSession::new(Arc::new(driver), LaunchOptions::default());
    let converter = Converter::new(options, themes, session).expect("converter");
    (converter, state)
}

/// Log lines written while the returned guard is alive on this thread.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}
