use anyhow::Result;
use indicatif::ProgressBar;
use scrapix_browser::diagnostics::{PAGE_SOURCE_FILE, SCREENSHOT_FILE};
use scrapix_browser::{ScrapeConfig, Scraper, SelectorConfig};
use scrapix_core::{FilterSpec, ImageRecord, listing};
use scrapix_download::{DownloadManager, HttpResolutionProbe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const URLS_FILE: &str = "urls.json";

#[derive(Debug, clap::Args)]
pub struct ScrapeArgs {
    /// Search query
    pub query: String,

    /// Directory receiving urls.json, diagnostics, and downloaded images
    #[arg(short = 'd', long = "dir", default_value = ".cache/scrapix")]
    pub dir: PathBuf,

    /// Maximum number of new image urls to collect
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    /// Filter-passing results to skip before collecting
    #[arg(long, default_value_t = 0)]
    pub skip: usize,

    /// Keyword to exclude from image titles and urls (repeatable)
    #[arg(long = "exclude", value_name = "KEYWORD")]
    pub excluded_keywords: Vec<String>,

    /// Minimum resolution, e.g. 640x480
    #[arg(long, value_name = "WxH", value_parser = parse_resolution)]
    pub min_res: Option<(u32, u32)>,

    /// Maximum resolution, e.g. 2048x2048
    #[arg(long, value_name = "WxH", value_parser = parse_resolution)]
    pub max_res: Option<(u32, u32)>,

    /// Download image bytes after collecting urls
    #[arg(long)]
    pub download: bool,

    /// Ignore previously scraped urls and refetch files already on disk
    #[arg(long)]
    pub force: bool,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// CSS selector of one result tile
    #[arg(long, value_name = "SELECTOR", env = "SCRAPIX_TILE_SELECTOR")]
    pub tile_selector: Option<String>,

    /// Candidate selectors for the detail-pane image, probed in order
    /// (comma-separated)
    #[arg(
        long = "image-selector",
        value_name = "SELECTOR",
        env = "SCRAPIX_IMAGE_SELECTORS",
        value_delimiter = ','
    )]
    pub image_selectors: Vec<String>,
}

pub fn execute(args: ScrapeArgs) -> Result<()> {
    // Create tokio runtime for async operations
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(args))
}

async fn run(args: ScrapeArgs) -> Result<()> {
    std::fs::create_dir_all(&args.dir)?;

    // Step 1: Seed the dedupe set with previously scraped urls
    let urls_file = args.dir.join(URLS_FILE);
    let existing = if urls_file.exists() && !args.force {
        listing::read_urls(&urls_file)?
    } else {
        Vec::new()
    };
    if !existing.is_empty() {
        println!("📚 {} urls already scraped", existing.len());
    }

    // Step 2: Build the run configuration
    let mut filter = FilterSpec::new(args.excluded_keywords.clone());
    if let Some((width, height)) = args.min_res {
        filter = filter.with_min_resolution(width, height);
    }
    if let Some((width, height)) = args.max_res {
        filter = filter.with_max_resolution(width, height);
    }

    let mut selectors = SelectorConfig::default();
    if let Some(tile) = &args.tile_selector {
        selectors.tile = tile.clone();
    }
    if !args.image_selectors.is_empty() {
        selectors.detail_images = args.image_selectors.clone();
    }

    let mut config = ScrapeConfig::new(args.query.as_str(), &args.dir);
    config.limit = args.limit;
    config.skip = args.skip;
    config.filter = filter;
    config.selectors = selectors;
    config.headless = !args.headed;
    config.known_urls = existing.iter().map(|r| r.url.clone()).collect();

    let mut scraper = Scraper::new(config);
    if args.min_res.is_some() || args.max_res.is_some() {
        scraper = scraper.with_probe(Arc::new(HttpResolutionProbe::new()?));
    }

    // Step 3: Drain the record stream
    println!("🔍 Searching images for '{}'...", args.query);
    let mut stream = scraper.start().await?;

    let mut fresh = Vec::new();
    while let Some(record) = stream.next().await {
        println!("  [{}] {}", fresh.len() + 1, record.url);
        fresh.push(record);
    }
    let outcome = stream.finish().await;

    // Step 4: Persist the listing. Records collected before a failure are
    // kept either way.
    let merged = listing::merge(existing, fresh.clone());
    listing::write_urls(&merged, &urls_file)?;
    println!(
        "✅ Collected {} new urls ({} total) -> {}",
        fresh.len(),
        merged.len(),
        urls_file.display()
    );

    let failed = match outcome {
        Ok(outcome) => {
            tracing::debug!("Run ended: {:?}", outcome);
            false
        }
        Err(e) => {
            println!("⚠️  Scrape ended early: {}", e);
            println!(
                "   See {} and {} for the page state at failure",
                args.dir.join(SCREENSHOT_FILE).display(),
                args.dir.join(PAGE_SOURCE_FILE).display()
            );
            true
        }
    };

    // Step 5: Fetch the image bytes if requested
    if args.download {
        download(&fresh, &args.dir, args.force).await?;
    }

    if failed {
        anyhow::bail!("scrape run did not complete");
    }
    Ok(())
}

async fn download(records: &[ImageRecord], dir: &Path, force: bool) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    println!("⬇️  Downloading {} images...", records.len());
    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(120));

    let manager = DownloadManager::new()?;
    let stats = manager.download_all(records, dir, force).await;

    spinner.finish_and_clear();
    println!(
        "✅ Downloaded {} images ({} already present, {} failed)",
        stats.fetched, stats.skipped, stats.failed
    );
    Ok(())
}

fn parse_resolution(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{}'", value))?;
    let height = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{}'", value))?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution_accepts_wxh() {
        assert_eq!(parse_resolution("640x480"), Ok((640, 480)));
        assert_eq!(parse_resolution("2048X2048"), Ok((2048, 2048)));
        assert_eq!(parse_resolution(" 800 x 600 "), Ok((800, 600)));
    }

    #[test]
    fn test_parse_resolution_rejects_garbage() {
        assert!(parse_resolution("640").is_err());
        assert!(parse_resolution("wide x tall").is_err());
        assert!(parse_resolution("640x").is_err());
    }
}
