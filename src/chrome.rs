use crate::capture::ScreenCapturer;
use crate::config::{CaptureConfig, CaptureFormat};
use crate::{Result, ScreencastError};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// CDP-backed capturer over a `chromiumoxide` page.
///
/// The page is attached by the embedding harness once a browser is open and
/// may be swapped or detached between recordings. Capture loops observe the
/// page through this capturer only.
pub struct CdpCapturer {
    page: RwLock<Option<Arc<Page>>>,
    format: CaptureFormat,
    quality: u8,
}

impl CdpCapturer {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            page: RwLock::new(None),
            format: config.format,
            quality: config.quality,
        }
    }

    pub fn with_page(page: Arc<Page>, config: &CaptureConfig) -> Self {
        Self {
            page: RwLock::new(Some(page)),
            format: config.format,
            quality: config.quality,
        }
    }

    pub async fn attach(&self, page: Arc<Page>) {
        *self.page.write().await = Some(page);
    }

    pub async fn detach(&self) {
        *self.page.write().await = None;
    }

    fn screenshot_format(&self) -> CaptureScreenshotFormat {
        match self.format {
            CaptureFormat::Png => CaptureScreenshotFormat::Png,
            CaptureFormat::Jpeg => CaptureScreenshotFormat::Jpeg,
        }
    }
}

#[async_trait::async_trait]
impl ScreenCapturer for CdpCapturer {
    async fn is_attached(&self) -> bool {
        self.page.read().await.is_some()
    }

    async fn capture(&self, path: &Path) -> Result<bool> {
        let Some(page) = self.page.read().await.clone() else {
            // page went away mid-recording; the loop treats this as a
            // declined capture and keeps polling
            return Ok(false);
        };

        let mut params = CaptureScreenshotParams::builder()
            .format(self.screenshot_format())
            .build();

        if self.format == CaptureFormat::Jpeg {
            params.quality = Some(self.quality as i64);
        }

        let data = page
            .screenshot(params)
            .await
            .map_err(|e| ScreencastError::ScreenshotFailed(e.to_string()))?;

        std::fs::write(path, &data)?;
        Ok(true)
    }
}
