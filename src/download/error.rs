//! Error types for the download module.
//!
//! Every variant here is recovered inside the item's task: the retry loop
//! treats them all the same way and an exhausted item ends as
//! [`OutcomeStatus::Failed`](super::OutcomeStatus::Failed).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a single download attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Server answered with a status outside 2xx.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing the downloaded bytes.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The URL could not be parsed or has no file name segment.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url);
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_includes_status_and_url() {
        let err = DownloadError::http_status("https://img.rec.net/a.png", 503);
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("https://img.rec.net/a.png"));
    }

    #[test]
    fn test_io_display_includes_path() {
        let err = DownloadError::io(
            "/tmp/out/a.png",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out/a.png"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_timeout_and_invalid_url_display() {
        assert_eq!(
            DownloadError::timeout("http://x/a.png").to_string(),
            "timeout downloading http://x/a.png"
        );
        assert_eq!(
            DownloadError::invalid_url("not a url").to_string(),
            "invalid URL: not a url"
        );
    }
}
