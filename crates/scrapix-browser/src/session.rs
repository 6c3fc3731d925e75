use crate::{Error, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// One image element revealed in the detail pane after clicking a tile.
#[derive(Debug, Clone)]
pub struct DetailImage {
    pub src: Option<String>,
    pub alt: Option<String>,
}

/// Serialized access to one live browser page.
///
/// All operations run against the same tab, one at a time; the pipeline is
/// the single owner. `Handle` is an opaque reference to one result tile and
/// is only valid until the next content-load or navigation action.
#[async_trait]
pub trait Session: Send + Sync {
    type Handle: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// All tile elements currently present, in page-encounter order.
    async fn query_tiles(&self, selector: &str) -> Result<Vec<Self::Handle>>;

    /// Click a tile, scrolling it into view first.
    async fn click(&self, tile: &Self::Handle) -> Result<()>;

    /// Image elements matching `selector` in the detail pane.
    async fn query_detail_images(&self, selector: &str) -> Result<Vec<DetailImage>>;

    async fn has_element(&self, selector: &str) -> Result<bool>;

    /// Click the first element matching `selector`. Returns false when the
    /// element is absent.
    async fn click_selector(&self, selector: &str) -> Result<bool>;

    /// Scroll to the bottom of the page to trigger lazy-loading of further
    /// results.
    async fn scroll_to_bottom(&self) -> Result<()>;

    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn page_source(&self) -> Result<String>;

    /// Tear down the underlying browser. Idempotent; called on every exit
    /// path of a scrape run.
    async fn close(&mut self) -> Result<()>;
}

/// [`Session`] backed by a Chrome instance driven over CDP.
pub struct BrowserSession {
    browser: Option<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
    nav_timeout: Duration,
}

impl BrowserSession {
    /// Launch Chrome and open a blank tab.
    pub async fn launch(headless: bool, nav_timeout: Duration) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--window-size=1920,1080")
            .arg("--disable-notifications")
            .arg("--disable-gpu");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(Error::Session)?;

        let (browser, mut handler) = Browser::launch(config).await?;

        // The handler task must run for the lifetime of the browser for any
        // CDP command to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(e.into());
            }
        };

        tracing::info!("Browser session started (headless: {})", headless);

        Ok(Self {
            browser: Some(browser),
            page,
            handler_task,
            nav_timeout,
        })
    }

    async fn detail_image(&self, element: &Element) -> Result<DetailImage> {
        let src = element.attribute("src").await?;
        let alt = element.attribute("alt").await?;
        Ok(DetailImage { src, alt })
    }
}

#[async_trait]
impl Session for BrowserSession {
    type Handle = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        match tokio::time::timeout(self.nav_timeout, self.page.goto(url)).await {
            Ok(result) => {
                result.map_err(|e| Error::Navigation(e.to_string()))?;
                Ok(())
            }
            Err(_) => Err(Error::Navigation(format!(
                "page load timed out after {:?}",
                self.nav_timeout
            ))),
        }
    }

    async fn query_tiles(&self, selector: &str) -> Result<Vec<Element>> {
        Ok(self.page.find_elements(selector).await.unwrap_or_default())
    }

    async fn click(&self, tile: &Element) -> Result<()> {
        tile.scroll_into_view().await?;
        tile.click().await?;
        Ok(())
    }

    async fn query_detail_images(&self, selector: &str) -> Result<Vec<DetailImage>> {
        let elements = self.page.find_elements(selector).await.unwrap_or_default();
        let mut images = Vec::with_capacity(elements.len());
        for element in &elements {
            images.push(self.detail_image(element).await?);
        }
        Ok(images)
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        Ok(self.page.find_element(selector).await.is_ok())
    }

    async fn click_selector(&self, selector: &str) -> Result<bool> {
        match self.page.find_element(selector).await {
            Ok(element) => {
                element.click().await?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        Ok(self.page.screenshot(params).await?)
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("Error closing browser: {}", e);
            }
            self.handler_task.abort();
            tracing::info!("Browser session closed");
        }
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // close() already ran on every normal exit path; this only covers a
        // panicked producer task.
        if self.browser.is_some() {
            self.handler_task.abort();
        }
    }
}
