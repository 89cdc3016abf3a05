use std::path::PathBuf;

use fsp_types::{Timestamp, TypeError};

/// Errors from field-set store operations.
///
/// A missing field set is not an error: lookups return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Creating, reading, writing, or deleting a backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A backing file exists but does not decode to a field set.
    #[error("corrupt field set at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Encoding or decoding failure reported by a codec.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Store configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A conditional write found the scope's copy moved past the timestamp
    /// the caller last saw.
    #[error("{id} changed since {seen}")]
    Stale { id: String, seen: Timestamp },

    /// A sanitized id could not be decoded.
    #[error(transparent)]
    InvalidId(#[from] TypeError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
