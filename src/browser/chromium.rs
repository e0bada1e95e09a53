//! Chromium backend over the DevTools protocol.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetEmulatedMediaParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, PrintToPdfParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use super::driver::{
    BrowserDriver, BrowserHandle, FailureListener, ImageFormat, LaunchOptions, LaunchedBrowser,
    PageHandle,
};
use super::launch::find_executable;
use crate::{ConvertError, Result, Viewport};

/// How long the network must stay quiet to count as idle.
const NETWORK_QUIET_PERIOD: Duration = Duration::from_millis(500);
const NETWORK_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn map_cdp_error(err: CdpError) -> ConvertError {
    match err {
        CdpError::Timeout => ConvertError::browser("DevTools request timed out"),
        other => ConvertError::browser(other.to_string()),
    }
}

/// Launches a local Chrome/Chromium/Edge.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumDriver;

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(&self, options: &LaunchOptions) -> Result<LaunchedBrowser> {
        let executable = find_executable(options.executable.as_deref()).ok_or_else(|| {
            ConvertError::browser(
                "Chrome/Chromium executable not found; install one or set CHROME_PATH",
            )
        })?;
        debug!(executable = %executable.display(), "Resolved browser executable");

        let mut builder = BrowserConfig::builder().chrome_executable(executable);
        if options.headful {
            builder = builder.with_head();
        }
        for arg in &options.args {
            builder = builder.arg(arg.clone());
        }
        let config = builder.build().map_err(ConvertError::browser)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(map_cdp_error)?;
        let (disconnected_tx, disconnected_rx) = oneshot::channel();
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "Browser connection reported an error");
                }
            }
            let _ = disconnected_tx.send(());
        });

        Ok(LaunchedBrowser {
            handle: Arc::new(ChromiumBrowser {
                browser: tokio::sync::Mutex::new(browser),
            }),
            disconnected: disconnected_rx,
        })
    }
}

struct ChromiumBrowser {
    browser: tokio::sync::Mutex<Browser>,
}

#[async_trait]
impl BrowserHandle for ChromiumBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        let page = {
            let browser = self.browser.lock().await;
            browser.new_page("about:blank").await.map_err(map_cdp_error)?
        };
        let page = ChromiumPage::attach(page).await?;
        Ok(Box::new(page))
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(map_cdp_error)?;
        browser.wait().await?;
        Ok(())
    }
}

/// In-flight request bookkeeping for one page.
#[derive(Default)]
struct NetworkTracker {
    inflight: Mutex<HashMap<String, String>>,
    last_activity: Mutex<Option<Instant>>,
    listeners: Mutex<Vec<FailureListener>>,
}

impl NetworkTracker {
    fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
    }

    fn started(&self, id: String, url: String) {
        self.inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, url);
        self.touch();
    }

    fn finished(&self, id: &str) -> Option<String> {
        let url = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);
        self.touch();
        url
    }

    fn failed(&self, id: &str) {
        let Some(url) = self.finished(id) else {
            return;
        };
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for listener in listeners {
            listener(&url);
        }
    }

    fn is_idle(&self) -> bool {
        let empty = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty();
        let quiet = self
            .last_activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .map_or(true, |at| at.elapsed() >= NETWORK_QUIET_PERIOD);
        empty && quiet
    }
}

struct ChromiumPage {
    page: Page,
    tracker: Arc<NetworkTracker>,
    events: JoinHandle<()>,
}

impl ChromiumPage {
    async fn attach(page: Page) -> Result<Self> {
        let mut sent = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(map_cdp_error)?;
        let mut finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(map_cdp_error)?;
        let mut failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(map_cdp_error)?;

        let tracker = Arc::new(NetworkTracker::default());
        let events = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        Some(event) = sent.next() => {
                            tracker.started(event.request_id.inner().clone(), event.request.url.clone());
                        }
                        Some(event) = finished.next() => {
                            tracker.finished(event.request_id.inner());
                        }
                        Some(event) = failed.next() => {
                            debug!(error = %event.error_text, "Request failed");
                            tracker.failed(event.request_id.inner());
                        }
                        else => break,
                    }
                }
            })
        };

        Ok(Self {
            page,
            tracker,
            events,
        })
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn on_request_failed(&mut self, listener: FailureListener) -> Result<()> {
        self.tracker
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        self.page.goto(url).await.map_err(map_cdp_error)?;
        loop {
            let state: String = self
                .page
                .evaluate("document.readyState")
                .await
                .map_err(map_cdp_error)?
                .into_value()
                .map_err(|err| ConvertError::browser(err.to_string()))?;
            if state != "loading" {
                return Ok(());
            }
            tokio::time::sleep(NETWORK_POLL_INTERVAL).await;
        }
    }

    async fn wait_for_network_idle(&mut self) -> Result<()> {
        while !self.tracker.is_idle() {
            tokio::time::sleep(NETWORK_POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(viewport.width),
                i64::from(viewport.height),
                1.0,
                false,
            ))
            .await
            .map_err(map_cdp_error)?;
        Ok(())
    }

    async fn emulate_print_media(&mut self) -> Result<()> {
        self.page
            .execute(SetEmulatedMediaParams::builder().media("print").build())
            .await
            .map_err(map_cdp_error)?;
        Ok(())
    }

    async fn print_pdf(&mut self) -> Result<Vec<u8>> {
        let params = PrintToPdfParams {
            print_background: Some(true),
            prefer_css_page_size: Some(true),
            ..Default::default()
        };
        self.page.pdf(params).await.map_err(map_cdp_error)
    }

    async fn screenshot(&mut self, format: ImageFormat) -> Result<Vec<u8>> {
        let params = match format {
            ImageFormat::Png => ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build(),
            ImageFormat::Jpeg { quality } => ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Jpeg)
                .quality(i64::from(quality))
                .build(),
        };
        self.page.screenshot(params).await.map_err(map_cdp_error)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.events.abort();
        self.page.close().await.map_err(map_cdp_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_reports_failed_request_urls() {
        let tracker = NetworkTracker::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            tracker.listeners.lock().unwrap().push(Arc::new(move |url: &str| {
                seen.lock().unwrap().push(url.to_string());
            }));
        }
        tracker.started("1".into(), "file:///tmp/a.png".into());
        tracker.started("2".into(), "https://example.com/b.png".into());
        tracker.failed("1");
        tracker.finished("2");
        tracker.failed("unknown");

        assert_eq!(*seen.lock().unwrap(), vec!["file:///tmp/a.png".to_string()]);
    }

    #[test]
    fn tracker_is_idle_only_without_inflight_requests() {
        let tracker = NetworkTracker::default();
        assert!(tracker.is_idle());
        tracker.started("1".into(), "https://example.com".into());
        assert!(!tracker.is_idle());
        tracker.finished("1");
        // Activity just happened, so the quiet period has not elapsed yet.
        assert!(!tracker.is_idle());
    }

    #[test]
    fn cdp_timeout_maps_to_browser_error() {
        let err = map_cdp_error(CdpError::Timeout);
        assert!(matches!(err, ConvertError::Browser(_)));
    }
}
