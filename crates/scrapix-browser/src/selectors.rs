/// CSS selectors for the result-page markup Google regenerates frequently.
///
/// The class names below are machine-generated and change independently of
/// scrapix releases, so both values can be overridden at runtime (CLI flag or
/// environment). Construct once at startup and thread into the session and
/// resolver; never read configuration mid-run.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Container element of one result tile.
    pub tile: String,
    /// Candidate selectors for the detail-pane image, probed in order.
    pub detail_images: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            tile: "div.F0uyec".to_string(),
            detail_images: vec![
                "img.n3VNCb".to_string(),
                "img.iPVvYb".to_string(),
                "img.r48jcc".to_string(),
                "img.pT0Scc".to_string(),
            ],
        }
    }
}

/// The consent dialog's "Reject all" button.
pub(crate) const CONSENT_REJECT_SELECTOR: &str = "button#W0wltc";

/// Iframe shown when Google serves a reCAPTCHA interstitial instead of
/// results.
pub(crate) const RECAPTCHA_SELECTOR: &str = "iframe[src^='https://www.google.com/recaptcha']";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selectors_probe_multiple_candidates() {
        let selectors = SelectorConfig::default();
        assert!(!selectors.tile.is_empty());
        assert!(selectors.detail_images.len() > 1);
    }
}
