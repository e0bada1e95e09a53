//! Per-format capture of a rendered deck.
//!
//! HTML output never reaches this module; PDF and raster formats run as a
//! [`CaptureTask`] inside [`crate::browser::BrowserSession::use_page`].

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::browser::{ImageFormat, PageHandle, PageTask};
use crate::config::Timeouts;
use crate::types::ConvertType;
use crate::{ConvertError, Result, Viewport};

/// Captures one artifact from a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureTask {
    pub format: ConvertType,
    /// Declared slide size, used as the viewport for raster output.
    pub size: Viewport,
    pub jpeg_quality: u8,
    pub timeouts: Timeouts,
}

#[async_trait]
impl PageTask for CaptureTask {
    type Output = Vec<u8>;

    async fn run(&self, page: &mut dyn PageHandle, uri: &str) -> Result<Vec<u8>> {
        match self.format {
            ConvertType::Pdf => {
                navigate(page, uri, &self.timeouts).await?;
                debug!("Printing PDF");
                page.print_pdf().await
            }
            ConvertType::Png | ConvertType::Jpeg => {
                page.set_viewport(self.size).await?;
                navigate(page, uri, &self.timeouts).await?;
                page.emulate_print_media().await?;
                let format = if self.format == ConvertType::Jpeg {
                    ImageFormat::Jpeg {
                        quality: self.jpeg_quality,
                    }
                } else {
                    ImageFormat::Png
                };
                debug!(viewport = %self.size, ?format, "Capturing screenshot");
                page.screenshot(format).await
            }
            ConvertType::Html => Err(ConvertError::Config(
                "HTML output does not need a browser capture".to_string(),
            )),
        }
    }
}

async fn navigate(page: &mut dyn PageHandle, uri: &str, timeouts: &Timeouts) -> Result<()> {
    bounded("navigation", timeouts.navigation, page.goto(uri)).await?;
    bounded("network idle", timeouts.network_idle, page.wait_for_network_idle()).await
}

async fn bounded<F>(stage: &'static str, limit: Duration, fut: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    timeout(limit, fut)
        .await
        .map_err(|_| ConvertError::timeout(stage, limit))?
}
