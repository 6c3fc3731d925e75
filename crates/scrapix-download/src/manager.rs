use crate::{Error, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scrapix_core::ImageRecord;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONCURRENCY: usize = 4;
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Extensions kept as-is when they appear in the URL path; anything else
/// falls back to jpg.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "avif"];

/// Whether a download fetched bytes or found them already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Fetched(PathBuf),
    AlreadyPresent(PathBuf),
}

impl DownloadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DownloadOutcome::Fetched(path) | DownloadOutcome::AlreadyPresent(path) => path,
        }
    }
}

/// Summary of one download batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct DownloadStats {
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Fetches accepted records' bytes and persists them under deterministic
/// names.
pub struct DownloadManager {
    client: Client,
    concurrency: usize,
}

impl DownloadManager {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("scrapix/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            concurrency: DEFAULT_CONCURRENCY,
        })
    }

    /// Bound the worker pool used by [`Self::download_all`].
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Download one record's bytes into `save_dir`.
    ///
    /// The destination name derives from the URL alone, so a rerun finds the
    /// file and skips the fetch unless `force` is set. Bytes go to a
    /// temporary file first and are renamed into place; a crash mid-write
    /// never leaves a partial file at the final name.
    pub async fn download(
        &self,
        record: &ImageRecord,
        save_dir: &Path,
        force: bool,
    ) -> Result<DownloadOutcome> {
        let dest = save_dir.join(file_name(&record.url));
        if dest.exists() && !force {
            tracing::debug!("Already downloaded: {}", dest.display());
            return Ok(DownloadOutcome::AlreadyPresent(dest));
        }

        let response = self
            .client
            .get(&record.url)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        let mut tmp = tempfile::NamedTempFile::new_in(save_dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&dest).map_err(|e| Error::Io(e.error))?;

        tracing::info!("Downloaded {} ({} bytes)", dest.display(), bytes.len());
        Ok(DownloadOutcome::Fetched(dest))
    }

    /// Download a batch through a bounded worker pool.
    ///
    /// Per-record failures are logged and counted; they never abort the rest
    /// of the batch.
    pub async fn download_all(
        &self,
        records: &[ImageRecord],
        save_dir: &Path,
        force: bool,
    ) -> DownloadStats {
        let results: Vec<_> = stream::iter(records)
            .map(|record| async move { (record, self.download(record, save_dir, force).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut stats = DownloadStats::default();
        for (record, outcome) in results {
            match outcome {
                Ok(DownloadOutcome::Fetched(_)) => stats.fetched += 1,
                Ok(DownloadOutcome::AlreadyPresent(_)) => stats.skipped += 1,
                Err(e) => {
                    tracing::warn!("Download failed for {}: {}", record.url, e);
                    stats.failed += 1;
                }
            }
        }

        tracing::info!(
            "Downloads complete: {} fetched, {} already present, {} failed",
            stats.fetched,
            stats.skipped,
            stats.failed
        );
        stats
    }
}

/// Deterministic destination name for a URL: a digest prefix plus the
/// extension inferred from the URL path.
pub fn file_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut name = String::with_capacity(16 + 5);
    for byte in digest.iter().take(8) {
        let _ = write!(name, "{:02x}", byte);
    }
    name.push('.');
    name.push_str(extension_for(url));
    name
}

fn extension_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|&&known| known == ext)
        .copied()
        .unwrap_or("jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_is_stable_across_calls() {
        let a = file_name("https://example.com/tank.png");
        let b = file_name("https://example.com/tank.png");
        assert_eq!(a, b);
    }

    #[test]
    fn test_file_name_differs_per_url() {
        let a = file_name("https://example.com/a.jpg");
        let b = file_name("https://example.com/b.jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn test_extension_comes_from_url_path() {
        assert!(file_name("https://example.com/img.png").ends_with(".png"));
        assert!(file_name("https://example.com/img.PNG").ends_with(".png"));
        assert!(file_name("https://example.com/img.webp?w=640").ends_with(".webp"));
    }

    #[test]
    fn test_unrecognized_extension_falls_back_to_jpg() {
        assert!(file_name("https://example.com/img").ends_with(".jpg"));
        assert!(file_name("https://example.com/img.php").ends_with(".jpg"));
        assert!(file_name("https://example.com/dir/").ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_existing_file_skips_the_fetch() {
        let temp_dir = TempDir::new().unwrap();
        let record = ImageRecord::new("t", "https://example.com/tank.jpg");
        let dest = temp_dir.path().join(file_name(&record.url));
        std::fs::write(&dest, b"already here").unwrap();

        // The URL is not served anywhere; reaching the network would fail.
        let manager = DownloadManager::new().unwrap();
        let outcome = manager
            .download(&record, temp_dir.path(), false)
            .await
            .unwrap();

        assert_eq!(outcome, DownloadOutcome::AlreadyPresent(dest.clone()));
        assert_eq!(std::fs::read(&dest).unwrap(), b"already here");
    }

    #[tokio::test]
    async fn test_force_refetches_even_when_present() {
        let temp_dir = TempDir::new().unwrap();
        // Nothing listens on port 1; a forced fetch must hit the network and
        // fail instead of silently reusing the file.
        let record = ImageRecord::new("t", "http://127.0.0.1:1/tank.jpg");
        let dest = temp_dir.path().join(file_name(&record.url));
        std::fs::write(&dest, b"stale").unwrap();

        let manager = DownloadManager::new().unwrap();
        let result = manager.download(&record, temp_dir.path(), true).await;

        assert!(matches!(result, Err(Error::Http(_))));
        // The failed refetch leaves the old bytes untouched.
        assert_eq!(std::fs::read(&dest).unwrap(), b"stale");
    }

    #[tokio::test]
    async fn test_batch_isolates_per_record_failures() {
        let temp_dir = TempDir::new().unwrap();
        let present = ImageRecord::new("ok", "https://example.com/present.jpg");
        std::fs::write(temp_dir.path().join(file_name(&present.url)), b"x").unwrap();
        let unreachable = ImageRecord::new("bad", "http://127.0.0.1:1/gone.jpg");

        let manager = DownloadManager::new().unwrap();
        let stats = manager
            .download_all(&[present, unreachable], temp_dir.path(), false)
            .await;

        assert_eq!(stats.fetched, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
    }
}
