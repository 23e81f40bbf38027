//! Startup error type.

use thiserror::Error;

/// Result type alias using the startup error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while bringing the service provider up.
///
/// Every variant is fatal. Per-request failures live in the protocol crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration value missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Key or metadata file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Machine-readable code, aligned with the protocol error codes.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        "config_error"
    }
}
