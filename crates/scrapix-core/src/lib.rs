pub mod error;
pub mod filter;
pub mod listing;
pub mod record;

pub use error::{Error, Result};
pub use filter::{FilterSpec, ResolutionProbe, Verdict};
pub use record::ImageRecord;
