//! Error types for the mirror pipeline.
//!
//! Configuration, listing and local-root errors end the run. Fetch errors are
//! collected per object and reported after every task has been attempted.

use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Missing or malformed environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {name}")]
    Missing { name: &'static str },

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Failures reported by the storage service capability.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object {key} does not exist")]
    NotFound { key: String },

    #[error("{message}")]
    Service { message: String },

    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn service(message: impl Into<String>) -> Self {
        StoreError::Service {
            message: message.into(),
        }
    }
}

/// Enumeration of the bucket failed; no partial catalog is returned.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("listing page {page} failed: {source}")]
    Page {
        page: usize,
        #[source]
        source: StoreError,
    },

    #[error("listing page {page} was truncated but carried no continuation token")]
    MissingToken { page: usize },
}

/// An object key that cannot be mapped under the local root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("key has no path segments")]
    Empty,

    #[error("key contains a parent-directory segment")]
    Traversal,

    #[error("key segment {segment:?} is not a valid file name")]
    InvalidSegment { segment: String },
}

/// Failure to retrieve one object. Always names the key.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{key}: {source}")]
    Remote {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("{key}: cannot write {}: {source}", path.display())]
    Filesystem {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{key}: unsafe key: {source}")]
    UnsafeKey {
        key: String,
        #[source]
        source: PathError,
    },

    #[error("{key}: task aborted: {reason}")]
    Aborted { key: String, reason: String },
}

impl FetchError {
    pub fn key(&self) -> &str {
        match self {
            FetchError::Remote { key, .. }
            | FetchError::Filesystem { key, .. }
            | FetchError::UnsafeKey { key, .. }
            | FetchError::Aborted { key, .. } => key,
        }
    }

    pub(crate) fn filesystem(key: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Filesystem {
            key: key.to_string(),
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write snapshot {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot create local root {}: {source}", path.display())]
    LocalRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_message_names_the_key() {
        let error = FetchError::Remote {
            key: "a/b.txt".to_string(),
            source: StoreError::service("connection reset"),
        };
        assert_eq!(error.key(), "a/b.txt");
        assert_eq!(error.to_string(), "a/b.txt: connection reset");
    }

    #[test]
    fn listing_error_reports_page_number() {
        let error = ListingError::Page {
            page: 2,
            source: StoreError::service("AccessDenied"),
        };
        let msg = error.to_string();
        assert!(msg.contains("page 2"));
        assert!(msg.contains("AccessDenied"));
    }

    #[test]
    fn missing_config_names_variable() {
        let error = ConfigError::Missing {
            name: "BUCKET_NAME",
        };
        assert!(error.to_string().contains("BUCKET_NAME"));
    }
}
