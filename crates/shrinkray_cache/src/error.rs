//! Error types for cache operations.

use std::path::{Path, PathBuf};

/// Errors that can occur during cache operations.
///
/// Manifest loading never surfaces these: a missing or unreadable manifest
/// degrades to an empty cache. Everything else (stat, hashing, writing
/// outputs or the manifest) propagates and aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest could not be parsed as valid JSON.
    #[error("failed to parse cache manifest: {reason}")]
    ManifestParse {
        /// Description of the parse failure.
        reason: String,
    },

    /// The manifest parsed but is not an object with a `files` object.
    #[error("unexpected cache manifest shape: {reason}")]
    ManifestShape {
        /// What was wrong with the structure.
        reason: String,
    },

    /// A path cannot be expressed as a cache key.
    #[error("invalid source path {path}: {reason}")]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// A serialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl CacheError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
