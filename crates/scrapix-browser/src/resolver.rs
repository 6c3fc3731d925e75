use crate::selectors::SelectorConfig;
use crate::session::{DetailImage, Session};
use crate::{Error, Result, backoff};
use scrapix_core::ImageRecord;
use std::time::Duration;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Resolves one result tile to its full-resolution source.
///
/// Clicking a tile makes Google load the original image into the detail
/// pane. The pane's img element carries one of several machine-generated
/// classes, so candidate selectors are probed in order and the first usable
/// source wins.
pub struct ResultResolver<'a> {
    selectors: &'a SelectorConfig,
    attempts: usize,
    wait_timeout: Duration,
}

impl<'a> ResultResolver<'a> {
    pub fn new(selectors: &'a SelectorConfig, attempts: usize, wait_timeout: Duration) -> Self {
        Self {
            selectors,
            attempts,
            wait_timeout,
        }
    }

    /// Click the tile and wait for the detail pane to reveal the source
    /// image. The interaction is retried with backoff when the pane does not
    /// update in time. Errors are per-tile: the caller logs and moves on.
    pub async fn resolve<S: Session>(&self, session: &S, tile: &S::Handle) -> Result<ImageRecord> {
        for attempt in 0..self.attempts {
            if attempt > 0 {
                tokio::time::sleep(backoff::delay(attempt - 1)).await;
            }

            if let Err(e) = session.click(tile).await {
                tracing::warn!(
                    "Failed to click tile (attempt {}/{}): {}",
                    attempt + 1,
                    self.attempts,
                    e
                );
                continue;
            }

            match self.await_detail_image(session).await {
                Ok(record) => return Ok(record),
                Err(Error::ResolutionTimeout(msg)) => {
                    tracing::debug!(
                        "Detail pane did not update (attempt {}/{}): {}",
                        attempt + 1,
                        self.attempts,
                        msg
                    );
                }
                Err(e) => {
                    tracing::warn!("Probe failed (attempt {}/{}): {}", attempt + 1, self.attempts, e);
                }
            }
        }

        Err(Error::ElementNotFound(format!(
            "no detail-pane image after {} attempts",
            self.attempts
        )))
    }

    /// Poll the candidate selectors until one yields a usable source or the
    /// wait times out.
    async fn await_detail_image<S: Session>(&self, session: &S) -> Result<ImageRecord> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            for selector in &self.selectors.detail_images {
                let images = match session.query_detail_images(selector).await {
                    Ok(images) => images,
                    Err(e) => {
                        tracing::debug!("Probe of {} failed: {}", selector, e);
                        continue;
                    }
                };
                for image in images {
                    if let Some(record) = record_from(image) {
                        return Ok(record);
                    }
                }
            }

            if Instant::now() >= deadline {
                return Err(Error::ResolutionTimeout(format!(
                    "no candidate selector matched within {:?}",
                    self.wait_timeout
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// A usable source points at an http(s) URL and is not one of Google's
/// inline `encrypted-tbn` placeholder thumbnails.
fn record_from(image: DetailImage) -> Option<ImageRecord> {
    let src = image.src?;
    if !src.contains("http") || src.contains("encrypted") {
        return None;
    }
    Some(ImageRecord::new(image.alt.unwrap_or_default(), src))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeOptions, FakeSession, FakeTile};

    fn resolver_over(selectors: &SelectorConfig) -> ResultResolver<'_> {
        ResultResolver::new(selectors, 3, Duration::from_millis(300))
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_src_and_alt_from_detail_pane() {
        let session = FakeSession::new(
            vec![FakeTile {
                src: Some("https://example.com/tank.jpg".to_string()),
                alt: Some("a tank".to_string()),
                ..FakeTile::default()
            }],
            FakeOptions::default(),
        );
        let selectors = SelectorConfig::default();

        let record = resolver_over(&selectors).resolve(&session, &0).await.unwrap();

        assert_eq!(record.url, "https://example.com/tank.jpg");
        assert_eq!(record.title, "a tank");
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_later_candidate_selectors() {
        let session = FakeSession::new(
            vec![FakeTile {
                src: Some("https://example.com/tank.jpg".to_string()),
                alt: Some("a tank".to_string()),
                selector_index: 2,
                ..FakeTile::default()
            }],
            FakeOptions::default(),
        );
        let selectors = SelectorConfig::default();

        let record = resolver_over(&selectors).resolve(&session, &0).await.unwrap();

        assert_eq!(record.url, "https://example.com/tank.jpg");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_when_pane_lags_behind_click() {
        let session = FakeSession::new(
            vec![FakeTile {
                src: Some("https://example.com/tank.jpg".to_string()),
                alt: Some("a tank".to_string()),
                clicks_before_reveal: 1,
                ..FakeTile::default()
            }],
            FakeOptions::default(),
        );
        let selectors = SelectorConfig::default();

        let record = resolver_over(&selectors).resolve(&session, &0).await.unwrap();

        assert_eq!(record.url, "https://example.com/tank.jpg");
        assert!(session.state.click_count(0) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_placeholder_thumbnail_is_not_a_source() {
        let session = FakeSession::new(
            vec![FakeTile {
                src: Some("https://encrypted-tbn0.gstatic.com/images?q=x".to_string()),
                alt: Some("a tank".to_string()),
                ..FakeTile::default()
            }],
            FakeOptions::default(),
        );
        let selectors = SelectorConfig::default();

        let result = resolver_over(&selectors).resolve(&session, &0).await;

        assert!(matches!(result, Err(Error::ElementNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_alt_defaults_to_empty_title() {
        let session = FakeSession::new(
            vec![FakeTile {
                src: Some("https://example.com/tank.jpg".to_string()),
                alt: None,
                ..FakeTile::default()
            }],
            FakeOptions::default(),
        );
        let selectors = SelectorConfig::default();

        let record = resolver_over(&selectors).resolve(&session, &0).await.unwrap();

        assert_eq!(record.title, "");
    }
}
