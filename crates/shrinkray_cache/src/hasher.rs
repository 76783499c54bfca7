//! Source file stat snapshots and content hashing.
//!
//! A [`FileStat`] is the cheap fingerprint compared on the fast path; a
//! [`ContentHash`] is the expensive one computed only when stat data is not
//! trusted or does not match.

use std::fs::{File, Metadata};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use shrinkray_common::ContentHash;

use crate::error::CacheError;

/// Size and modification time of a source file.
///
/// `modified_time` is nanoseconds relative to the Unix epoch. It is compared
/// for equality only and never interpreted as a wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Byte length.
    pub size: u64,
    /// Modification timestamp.
    pub modified_time: i64,
}

impl FileStat {
    /// Builds a stat snapshot from filesystem metadata.
    pub fn from_metadata(meta: &Metadata) -> std::io::Result<Self> {
        Ok(Self {
            size: meta.len(),
            modified_time: timestamp_nanos(meta.modified()?),
        })
    }

    /// Reads the metadata of `path` (following symlinks) into a snapshot.
    pub fn of(path: &Path) -> Result<Self, CacheError> {
        let meta = std::fs::metadata(path).map_err(|e| CacheError::io(path, e))?;
        Self::from_metadata(&meta).map_err(|e| CacheError::io(path, e))
    }
}

/// Converts a timestamp to signed nanoseconds since the Unix epoch,
/// saturating at the `i64` range.
fn timestamp_nanos(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_nanos())
            .map(|n| -n)
            .unwrap_or(i64::MIN),
    }
}

/// Utility for computing content hashes of source files.
pub struct SourceHasher;

impl SourceHasher {
    /// Computes the SHA-256 content hash of a file by streaming its bytes.
    pub fn hash_file(path: &Path) -> Result<ContentHash, CacheError> {
        let file = File::open(path).map_err(|e| CacheError::io(path, e))?;
        ContentHash::from_reader(file).map_err(|e| CacheError::io(path, e))
    }
}
