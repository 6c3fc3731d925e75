//! In-memory [`Session`] used by the pipeline and resolver tests.

use crate::selectors::SelectorConfig;
use crate::session::{DetailImage, Session};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the detail pane reveals after clicking one fake tile.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTile {
    pub src: Option<String>,
    pub alt: Option<String>,
    /// Index into the configured candidate selector list under which the
    /// image appears.
    pub selector_index: usize,
    /// Clicks swallowed before the pane updates (simulates a laggy pane).
    pub clicks_before_reveal: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeOptions {
    /// Tiles visible before any scrolling; None means all.
    pub initial_visible: Option<usize>,
    /// Tiles revealed per scroll.
    pub batch: usize,
    /// Navigation attempts that fail before one succeeds.
    pub nav_failures: usize,
    /// Tile queries answered before the session starts failing (simulates a
    /// lost browser connection). None means never fail.
    pub fail_tiles_after: Option<usize>,
    /// Serve a reCAPTCHA interstitial instead of results.
    pub has_recaptcha: bool,
}

pub(crate) struct FakeState {
    tiles: Vec<FakeTile>,
    visible: AtomicUsize,
    batch: usize,
    detail_selectors: Vec<String>,
    open: Mutex<Option<usize>>,
    clicks: Mutex<Vec<usize>>,
    nav_failures: AtomicUsize,
    fail_tiles_after: Option<usize>,
    tile_queries: AtomicUsize,
    has_recaptcha: bool,
    pub scrolls: AtomicUsize,
    pub closed: AtomicBool,
}

impl FakeState {
    pub fn click_count(&self, tile: usize) -> usize {
        self.clicks.lock().unwrap()[tile]
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn scroll_count(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }
}

/// Cloneable handle; clones share state so tests can inspect it after the
/// pipeline consumed the session.
#[derive(Clone)]
pub(crate) struct FakeSession {
    pub state: Arc<FakeState>,
}

impl FakeSession {
    pub fn new(tiles: Vec<FakeTile>, options: FakeOptions) -> Self {
        let visible = options.initial_visible.unwrap_or(tiles.len());
        let clicks = vec![0; tiles.len()];
        Self {
            state: Arc::new(FakeState {
                visible: AtomicUsize::new(visible),
                batch: options.batch,
                detail_selectors: SelectorConfig::default().detail_images,
                open: Mutex::new(None),
                clicks: Mutex::new(clicks),
                nav_failures: AtomicUsize::new(options.nav_failures),
                fail_tiles_after: options.fail_tiles_after,
                tile_queries: AtomicUsize::new(0),
                has_recaptcha: options.has_recaptcha,
                scrolls: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                tiles,
            }),
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    type Handle = usize;

    async fn navigate(&self, _url: &str) -> Result<()> {
        let remaining = self.state.nav_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state.nav_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Navigation("simulated load failure".to_string()));
        }
        Ok(())
    }

    async fn query_tiles(&self, _selector: &str) -> Result<Vec<usize>> {
        let queries = self.state.tile_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(max) = self.state.fail_tiles_after {
            if queries >= max {
                return Err(Error::Session("browser connection lost".to_string()));
            }
        }
        let visible = self.state.visible.load(Ordering::SeqCst);
        Ok((0..visible).collect())
    }

    async fn click(&self, tile: &usize) -> Result<()> {
        let mut clicks = self.state.clicks.lock().unwrap();
        clicks[*tile] += 1;
        let revealed = clicks[*tile] > self.state.tiles[*tile].clicks_before_reveal;
        *self.state.open.lock().unwrap() = revealed.then_some(*tile);
        Ok(())
    }

    async fn query_detail_images(&self, selector: &str) -> Result<Vec<DetailImage>> {
        let open = *self.state.open.lock().unwrap();
        let Some(index) = open else {
            return Ok(Vec::new());
        };
        let tile = &self.state.tiles[index];
        let matches = self
            .state
            .detail_selectors
            .get(tile.selector_index)
            .is_some_and(|s| s == selector);
        if !matches {
            return Ok(Vec::new());
        }
        Ok(vec![DetailImage {
            src: tile.src.clone(),
            alt: tile.alt.clone(),
        }])
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        Ok(selector.contains("recaptcha") && self.state.has_recaptcha)
    }

    async fn click_selector(&self, _selector: &str) -> Result<bool> {
        Ok(false)
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.state.scrolls.fetch_add(1, Ordering::SeqCst);
        let visible = self.state.visible.load(Ordering::SeqCst);
        let grown = (visible + self.state.batch).min(self.state.tiles.len());
        self.state.visible.store(grown, Ordering::SeqCst);
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"fake-png".to_vec())
    }

    async fn page_source(&self) -> Result<String> {
        Ok("<html><body>fake</body></html>".to_string())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
