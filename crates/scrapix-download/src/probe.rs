use crate::Result;
use async_trait::async_trait;
use image::ImageReader;
use reqwest::Client;
use scrapix_core::ResolutionProbe;
use std::io::Cursor;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Determines an image's pixel dimensions by fetching its bytes and decoding
/// the header.
///
/// Every failure (network, HTTP status, undecodable payload) yields `None`,
/// which makes the caller skip resolution filtering for that record.
pub struct HttpResolutionProbe {
    client: Client,
}

impl HttpResolutionProbe {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .user_agent(concat!("scrapix/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResolutionProbe for HttpResolutionProbe {
    async fn dimensions(&self, url: &str) -> Option<(u32, u32)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;
        let bytes = response.bytes().await.ok()?;

        let reader = ImageReader::new(Cursor::new(bytes.as_ref()))
            .with_guessed_format()
            .ok()?;
        let (width, height) = reader.into_dimensions().ok()?;

        tracing::debug!("Probed {}: {}x{}", url, width, height);
        Some((width, height))
    }
}
