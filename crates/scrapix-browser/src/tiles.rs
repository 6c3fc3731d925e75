use crate::session::Session;
use crate::{Result, backoff};

/// Walks the result tiles in page-encounter order, handing out only tiles
/// that have not been processed yet.
///
/// Tile handles are ephemeral: each batch is re-queried from the live page
/// and consumed within one extraction cycle. Only the count of consumed
/// tiles is carried across cycles.
pub struct ThumbnailExtractor {
    selector: String,
    consumed: usize,
}

impl ThumbnailExtractor {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            consumed: 0,
        }
    }

    /// Tiles that appeared since the last batch. Empty when the page has no
    /// unprocessed tiles right now.
    pub async fn next_batch<S: Session>(&mut self, session: &S) -> Result<Vec<S::Handle>> {
        let all = session.query_tiles(&self.selector).await?;
        let total = all.len();
        let fresh: Vec<_> = all.into_iter().skip(self.consumed).collect();

        tracing::debug!(
            "Found {} tiles on page, {} unprocessed",
            total,
            fresh.len()
        );

        self.consumed = total.max(self.consumed);
        Ok(fresh)
    }

    /// Trigger lazy-loading of further results, backing off by the number of
    /// consecutive attempts that produced nothing new.
    pub async fn load_more<S: Session>(&self, session: &S, attempt: usize) -> Result<()> {
        tracing::debug!("No unprocessed tiles, scrolling for more (attempt {})", attempt + 1);
        session.scroll_to_bottom().await?;
        tokio::time::sleep(backoff::delay(attempt)).await;
        Ok(())
    }
}
