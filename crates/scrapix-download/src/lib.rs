pub mod error;
pub mod manager;
pub mod probe;

pub use error::{Error, Result};
pub use manager::{DownloadManager, DownloadOutcome, DownloadStats};
pub use probe::HttpResolutionProbe;
