use std::path::PathBuf;

use thiserror::Error;

/// Core error type for statement-level fact checking.
#[derive(Debug, Error)]
pub enum FactCheckError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing environment variable: {0}")]
    MissingSecret(String),
    #[error("I/O error while reading {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("claim extraction failed: {0}")]
    ClaimExtraction(String),
    #[error("verification run cancelled")]
    Cancelled,
    #[error("workflow failure: {0}")]
    Workflow(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FactCheckError {
    pub fn config_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ConfigIo { path, source }
    }
}

/// Failure reported by a search provider. "Zero results" is not an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("search provider error: {0}")]
    Provider(String),
    #[error("search provider rate limited the request")]
    RateLimited,
    #[error("search request timed out")]
    Timeout,
}

/// Failure to retrieve a single page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("page returned HTTP status {0}")]
    Status(u16),
    #[error("page fetch blocked by the remote site")]
    Blocked,
    #[error("page fetch timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Failure of a language-model reasoning call or of decoding its output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReasoningError {
    #[error("reasoning request failed: {message}")]
    Request { message: String, retryable: bool },
    /// Output could not be decoded into the expected shape.
    #[error("malformed reasoning output: {0}")]
    Malformed(String),
    /// Output decoded but carried no usable decision.
    #[error("ambiguous reasoning output: {0}")]
    Ambiguous(String),
    #[error("reasoning call timed out")]
    Timeout,
}

impl ReasoningError {
    pub fn request(message: impl Into<String>, retryable: bool) -> Self {
        Self::Request {
            message: message.into(),
            retryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ReasoningError::Request { retryable, .. } => *retryable,
            ReasoningError::Malformed(_) | ReasoningError::Ambiguous(_) => true,
            ReasoningError::Timeout => true,
        }
    }
}
