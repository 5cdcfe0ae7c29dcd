//! Cache error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when using the device cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing file exists but could not be read or parsed.
    #[error("Unreadable cache file {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// A stored entry does not decode as the requested type.
    #[error("Corrupt cache entry '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing the backing file failed; the in-memory entry is still updated.
    #[error("Failed to persist cache: {0}")]
    Persist(#[from] std::io::Error),
}
