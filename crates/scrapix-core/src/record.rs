use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A resolved image result: the source URL and the title it was listed under.
///
/// Identity is the `url` field alone, compared exactly (case-sensitive). Two
/// records sharing a URL are the same image regardless of title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub title: String,
    pub url: String,
}

impl ImageRecord {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

impl PartialEq for ImageRecord {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for ImageRecord {}

impl Hash for ImageRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_is_url_only() {
        let a = ImageRecord::new("A tank", "https://example.com/tank.jpg");
        let b = ImageRecord::new("Another title", "https://example.com/tank.jpg");
        let c = ImageRecord::new("A tank", "https://example.com/other.jpg");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_url_comparison_is_case_sensitive() {
        let a = ImageRecord::new("t", "https://example.com/Tank.jpg");
        let b = ImageRecord::new("t", "https://example.com/tank.jpg");

        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_set_dedupes_by_url() {
        let mut set = HashSet::new();
        set.insert(ImageRecord::new("first", "https://example.com/a.jpg"));
        set.insert(ImageRecord::new("second", "https://example.com/a.jpg"));
        set.insert(ImageRecord::new("third", "https://example.com/b.jpg"));

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_serde_roundtrip() {
        let record = ImageRecord::new("tank", "https://example.com/tank.jpg");
        let json = serde_json::to_string(&record).unwrap();
        let back: ImageRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back.title, "tank");
        assert_eq!(back.url, "https://example.com/tank.jpg");
    }
}
