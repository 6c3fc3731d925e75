use crate::resolver::ResultResolver;
use crate::selectors::{CONSENT_REJECT_SELECTOR, RECAPTCHA_SELECTOR, SelectorConfig};
use crate::session::{BrowserSession, Session};
use crate::tiles::ThumbnailExtractor;
use crate::{Error, Result, backoff, diagnostics};
use scrapix_core::{FilterSpec, ImageRecord, ResolutionProbe, Verdict};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

/// Configuration for one scrape run. Built once, never mutated mid-run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub query: String,
    /// Maximum number of records to yield.
    pub limit: usize,
    /// Filter-passing unique candidates discarded before yielding starts.
    pub skip: usize,
    pub filter: FilterSpec,
    pub selectors: SelectorConfig,
    /// Directory receiving diagnostic captures.
    pub save_dir: PathBuf,
    pub headless: bool,
    /// URLs scraped by earlier runs; they seed the dedupe set so a rerun
    /// yields only new results.
    pub known_urls: Vec<String>,
    /// Attempts for the initial navigation before the run fails.
    pub navigation_attempts: usize,
    /// Attempts to reveal the detail pane for one tile.
    pub resolve_attempts: usize,
    /// Consecutive content-load attempts yielding no new tiles before the
    /// run is considered exhausted.
    pub max_empty_loads: usize,
    /// Upper bound on each browser wait.
    pub wait_timeout: Duration,
}

impl ScrapeConfig {
    pub fn new(query: impl Into<String>, save_dir: impl Into<PathBuf>) -> Self {
        Self {
            query: query.into(),
            limit: 50,
            skip: 0,
            filter: FilterSpec::default(),
            selectors: SelectorConfig::default(),
            save_dir: save_dir.into(),
            headless: true,
            known_urls: Vec::new(),
            navigation_attempts: 3,
            resolve_attempts: 3,
            max_empty_loads: 3,
            wait_timeout: Duration::from_secs(10),
        }
    }
}

/// Terminal state of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// The accepted count reached the configured limit.
    Done,
    /// No new tiles appeared after the configured number of load attempts.
    Exhausted,
    /// The consumer dropped the stream before the run finished.
    Cancelled,
}

/// Per-run bookkeeping for skip/limit/dedupe. Lives for exactly one run.
struct ScrapeCursor {
    accepted: usize,
    skipped: usize,
    seen_urls: HashSet<String>,
}

impl ScrapeCursor {
    fn new(known_urls: &[String]) -> Self {
        Self {
            accepted: 0,
            skipped: 0,
            seen_urls: known_urls.iter().cloned().collect(),
        }
    }

    /// True the first time a URL is seen.
    fn mark_seen(&mut self, url: &str) -> bool {
        self.seen_urls.insert(url.to_string())
    }
}

/// Entry point for one scrape run against a live browser.
pub struct Scraper {
    config: ScrapeConfig,
    probe: Option<Arc<dyn ResolutionProbe>>,
}

impl Scraper {
    pub fn new(config: ScrapeConfig) -> Self {
        Self {
            config,
            probe: None,
        }
    }

    /// Attach the dimension probe consulted when the filter carries
    /// resolution bounds.
    pub fn with_probe(mut self, probe: Arc<dyn ResolutionProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Launch the browser and start producing records.
    pub async fn start(self) -> Result<ScrapeStream> {
        tracing::info!(
            "Scraping images for '{}' (limit {}, skip {})",
            self.config.query,
            self.config.limit,
            self.config.skip
        );

        let session =
            BrowserSession::launch(self.config.headless, self.config.wait_timeout).await?;
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(run(session, self.config, self.probe, tx));

        Ok(ScrapeStream { rx, task })
    }
}

/// Pull-driven sequence of accepted records.
///
/// The producer performs as many browser round-trips as needed per record;
/// the bounded channel gives one-record-at-a-time backpressure. Dropping the
/// stream cancels the run: the producer captures diagnostics and releases
/// the browser before winding down.
pub struct ScrapeStream {
    rx: mpsc::Receiver<ImageRecord>,
    task: JoinHandle<Result<ScrapeOutcome>>,
}

impl ScrapeStream {
    /// Next accepted record, or None once the run reached a terminal state.
    pub async fn next(&mut self) -> Option<ImageRecord> {
        self.rx.recv().await
    }

    /// Wait for the run to wind down and report its terminal state.
    ///
    /// Records already yielded stay valid regardless of the outcome; a fatal
    /// error only describes how the run ended.
    pub async fn finish(self) -> Result<ScrapeOutcome> {
        drop(self.rx);
        self.task
            .await
            .map_err(|e| Error::Session(format!("scrape task failed: {}", e)))?
    }
}

/// Producer body: drives the session to a terminal state, then captures
/// diagnostics and releases the browser on every exit path.
pub(crate) async fn run<S: Session>(
    mut session: S,
    config: ScrapeConfig,
    probe: Option<Arc<dyn ResolutionProbe>>,
    tx: mpsc::Sender<ImageRecord>,
) -> Result<ScrapeOutcome> {
    let result = drive(&session, &config, probe.as_deref(), &tx).await;

    match &result {
        Ok(outcome) => tracing::info!("Scrape finished: {:?}", outcome),
        Err(e) => tracing::error!("Scrape failed: {}", e),
    }

    diagnostics::capture(&session, &config.save_dir).await;

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close browser session: {}", e);
    }

    result
}

async fn drive<S: Session>(
    session: &S,
    config: &ScrapeConfig,
    probe: Option<&dyn ResolutionProbe>,
    tx: &mpsc::Sender<ImageRecord>,
) -> Result<ScrapeOutcome> {
    navigate_with_retry(session, config).await?;
    prepare_results_page(session).await?;

    let mut cursor = ScrapeCursor::new(&config.known_urls);
    let mut extractor = ThumbnailExtractor::new(config.selectors.tile.clone());
    let resolver = ResultResolver::new(
        &config.selectors,
        config.resolve_attempts,
        config.wait_timeout,
    );
    let mut empty_loads = 0;

    while cursor.accepted < config.limit {
        let batch = extractor.next_batch(session).await?;
        if batch.is_empty() {
            if empty_loads >= config.max_empty_loads {
                tracing::info!("Results exhausted after {} accepted records", cursor.accepted);
                return Ok(ScrapeOutcome::Exhausted);
            }
            extractor.load_more(session, empty_loads).await?;
            empty_loads += 1;
            continue;
        }
        empty_loads = 0;

        for tile in &batch {
            if cursor.accepted >= config.limit {
                break;
            }

            let record = match resolver.resolve(session, tile).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping tile: {}", e);
                    continue;
                }
            };

            if !cursor.mark_seen(&record.url) {
                tracing::debug!("Duplicate url discarded: {}", record.url);
                continue;
            }

            let dimensions = match probe {
                Some(probe) if config.filter.wants_resolution() => {
                    probe.dimensions(&record.url).await
                }
                _ => None,
            };

            match config.filter.evaluate(&record, dimensions) {
                Verdict::Accept => {
                    if cursor.skipped < config.skip {
                        cursor.skipped += 1;
                        tracing::debug!(
                            "Skipping candidate {}/{}: {}",
                            cursor.skipped,
                            config.skip,
                            record.url
                        );
                        continue;
                    }
                    tracing::info!(
                        "Accepted [{}/{}] {}",
                        cursor.accepted + 1,
                        config.limit,
                        record.url
                    );
                    if tx.send(record).await.is_err() {
                        tracing::info!("Consumer dropped the stream, cancelling run");
                        return Ok(ScrapeOutcome::Cancelled);
                    }
                    cursor.accepted += 1;
                }
                Verdict::RejectKeyword => {
                    tracing::debug!("Excluded keyword match: {}", record.url);
                }
                Verdict::RejectResolution => {
                    tracing::debug!("Resolution out of bounds: {}", record.url);
                }
            }
        }
    }

    Ok(ScrapeOutcome::Done)
}

async fn navigate_with_retry<S: Session>(session: &S, config: &ScrapeConfig) -> Result<()> {
    let url = search_url(&config.query);
    tracing::info!("Navigating to {}", url);

    let mut last_error = None;
    for attempt in 0..config.navigation_attempts {
        if attempt > 0 {
            tokio::time::sleep(backoff::delay(attempt - 1)).await;
        }
        match session.navigate(&url).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(
                    "Navigation attempt {}/{} failed: {}",
                    attempt + 1,
                    config.navigation_attempts,
                    e
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| Error::Navigation("no navigation attempts configured".to_string())))
}

async fn prepare_results_page<S: Session>(session: &S) -> Result<()> {
    if session.has_element(RECAPTCHA_SELECTOR).await? {
        return Err(Error::Session("recaptcha challenge detected".to_string()));
    }

    // The consent dialog only shows up in some regions; absence is the
    // common case.
    match session.click_selector(CONSENT_REJECT_SELECTOR).await {
        Ok(true) => tracing::info!("Dismissed cookie consent dialog"),
        Ok(false) => tracing::debug!("No cookie consent dialog present"),
        Err(e) => tracing::warn!("Failed to dismiss consent dialog: {}", e),
    }

    Ok(())
}

fn search_url(query: &str) -> String {
    Url::parse_with_params("https://www.google.com/search", &[("q", query), ("tbm", "isch")])
        .expect("static base url is valid")
        .to_string()
}
