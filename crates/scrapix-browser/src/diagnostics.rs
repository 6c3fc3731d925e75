use crate::session::Session;
use std::path::Path;

pub const SCREENSHOT_FILE: &str = "screenshot.png";
pub const PAGE_SOURCE_FILE: &str = "page.html";

/// Post-mortem capture of the current page state, written into `save_dir`
/// and overwriting any prior capture.
///
/// Runs on every terminal transition of a scrape run. Best-effort only:
/// capture failures are logged and never override the outcome being
/// diagnosed.
pub async fn capture<S: Session>(session: &S, save_dir: &Path) {
    match session.screenshot().await {
        Ok(bytes) => {
            let path = save_dir.join(SCREENSHOT_FILE);
            if let Err(e) = std::fs::write(&path, &bytes) {
                tracing::warn!("Failed to write {}: {}", path.display(), e);
            } else {
                tracing::debug!("Saved screenshot to {}", path.display());
            }
        }
        Err(e) => tracing::warn!("Screenshot capture failed: {}", e),
    }

    match session.page_source().await {
        Ok(html) => {
            let path = save_dir.join(PAGE_SOURCE_FILE);
            if let Err(e) = std::fs::write(&path, html) {
                tracing::warn!("Failed to write {}: {}", path.display(), e);
            } else {
                tracing::debug!("Saved page source to {}", path.display());
            }
        }
        Err(e) => tracing::warn!("Page source capture failed: {}", e),
    }
}
