use crate::record::ImageRecord;
use async_trait::async_trait;

/// Outcome of evaluating one record against a [`FilterSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    RejectKeyword,
    RejectResolution,
}

/// Acceptance criteria for one scrape run.
///
/// All conditions are combined with AND logic - a record must pass every
/// configured criterion to be accepted. Keywords are lowercased at
/// construction; matching is case-insensitive substring over both title and
/// URL. Resolution bounds apply only when the actual pixel dimensions are
/// known - unknown dimensions pass (fail-open).
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    excluded_keywords: Vec<String>,
    min_resolution: Option<(u32, u32)>,
    max_resolution: Option<(u32, u32)>,
}

impl FilterSpec {
    /// Create a FilterSpec excluding the given keywords.
    pub fn new(excluded_keywords: Vec<String>) -> Self {
        Self {
            excluded_keywords: excluded_keywords
                .into_iter()
                .map(|kw| kw.to_lowercase())
                .collect(),
            ..Self::default()
        }
    }

    /// Set the minimum accepted resolution (width, height).
    pub fn with_min_resolution(mut self, width: u32, height: u32) -> Self {
        self.min_resolution = Some((width, height));
        self
    }

    /// Set the maximum accepted resolution (width, height).
    pub fn with_max_resolution(mut self, width: u32, height: u32) -> Self {
        self.max_resolution = Some((width, height));
        self
    }

    /// Whether any resolution bound is configured.
    ///
    /// When false, callers can skip probing image dimensions entirely.
    pub fn wants_resolution(&self) -> bool {
        self.min_resolution.is_some() || self.max_resolution.is_some()
    }

    /// Evaluate one record. `dimensions` carries the image's actual pixel
    /// size when the caller was able to determine it.
    pub fn evaluate(&self, record: &ImageRecord, dimensions: Option<(u32, u32)>) -> Verdict {
        let title = record.title.to_lowercase();
        let url = record.url.to_lowercase();
        for kw in &self.excluded_keywords {
            if title.contains(kw.as_str()) || url.contains(kw.as_str()) {
                return Verdict::RejectKeyword;
            }
        }

        if let Some((width, height)) = dimensions {
            if let Some((min_w, min_h)) = self.min_resolution {
                if width < min_w || height < min_h {
                    return Verdict::RejectResolution;
                }
            }
            if let Some((max_w, max_h)) = self.max_resolution {
                if width > max_w || height > max_h {
                    return Verdict::RejectResolution;
                }
            }
        }

        Verdict::Accept
    }
}

/// Source of actual pixel dimensions for resolution filtering.
///
/// Dimensions are not present in a resolved record and must be obtained out
/// of band. Returning `None` means they could not be determined; resolution
/// filtering is skipped for that record.
#[async_trait]
pub trait ResolutionProbe: Send + Sync {
    async fn dimensions(&self, url: &str) -> Option<(u32, u32)>;
}
