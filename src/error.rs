//! Centralized error types for mailman-rss.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailman-rss library.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The transport failed before a response was received.
    #[error("Failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("Fetching '{url}' returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The response body exceeded the configured size cap.
    #[error("Response from '{url}' exceeds {max_bytes} bytes")]
    TooLarge { url: String, max_bytes: u64 },

    /// A URL could not be parsed or resolved.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The index page was fetched but contains no month archive links.
    #[error("Could not find month archives in {0}")]
    NoMonthArchives(String),

    /// Message bytes are not valid under the configured encoding.
    #[error("Message is not valid {encoding}: {reason}")]
    Decode { encoding: String, reason: String },

    /// The character encoding is not supported.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// A month archive could not be decompressed.
    #[error("Failed to decompress '{url}': {source}")]
    Gzip {
        url: String,
        source: std::io::Error,
    },

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The feed document could not be serialized.
    #[error("Failed to write feed: {0}")]
    Feed(String),
}

/// Convenience alias for `Result<T, FeedError>`.
pub type Result<T> = std::result::Result<T, FeedError>;

impl FeedError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Fetch` variant from a URL and any displayable cause.
    pub fn fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `FeedError::io`).
impl From<std::io::Error> for FeedError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
