use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Detail pane did not update: {0}")]
    ResolutionTimeout(String),

    #[error("Browser session error: {0}")]
    Session(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

impl Error {
    /// Whether this error ends the whole run. Everything else affects a
    /// single candidate and is logged and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Navigation(_) | Error::Session(_) | Error::Cdp(_) | Error::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
