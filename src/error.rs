//! Fatal error taxonomy.
//!
//! Anything that surfaces as an [`ArchiveError`] stops the run. Conditions
//! scoped to a single article or image are reported through
//! [`crate::models::ArticleOutcome`] and [`crate::models::ImageReport`]
//! instead and never reach this type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the whole archive run.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read input list {path}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse input list {path}: {message}")]
    InputParse { path: PathBuf, message: String },
    #[error("input entry {index} has an invalid url {url:?}: {reason}")]
    InvalidSourceUrl {
        index: usize,
        url: String,
        reason: String,
    },
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("output directory {path} is not writable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ArchiveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_source_url_message() {
        let err = ArchiveError::InvalidSourceUrl {
            index: 3,
            url: "ftp://example.com".to_string(),
            reason: "unsupported scheme".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("entry 3"));
        assert!(msg.contains("ftp://example.com"));
    }

    #[test]
    fn test_io_helper_keeps_path() {
        let err = ArchiveError::io(
            "/tmp/out/articles",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/out/articles"));
    }
}
