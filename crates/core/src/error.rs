//! Error types for s3up-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the upload pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration input
    #[error("Configuration error: {0}")]
    Config(String),

    /// A glob pattern that cannot be compiled
    #[error("Invalid glob pattern: {0}")]
    Pattern(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single transfer attempt failed
    #[error("Network error: {0}")]
    Network(String),

    /// A file failed on every attempt; the run stops here
    #[error("File upload failed for {} after {attempts} attempt(s): {message}", .path.display())]
    UploadFailed {
        path: PathBuf,
        attempts: u32,
        message: String,
    },

    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether the error comes from bad user input rather than a runtime failure
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Pattern(_))
    }
}

impl From<glob::PatternError> for Error {
    fn from(e: glob::PatternError) -> Self {
        Error::Pattern(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
