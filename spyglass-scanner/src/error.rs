use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// A single GET that produced no usable response.
///
/// Carries the raw error description. Callers recover from it locally: the
/// crawler skips the frontier node, probes turn it into a low-severity note.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FetchFailure {
    pub message: String,
}

impl FetchFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for FetchFailure {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}
