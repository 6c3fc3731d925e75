use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read url listing: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse url listing: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
