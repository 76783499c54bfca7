//! Cache manifest recording what each source file looked like when its
//! outputs were last produced.
//!
//! The manifest is a single JSON document:
//!
//! ```json
//! { "files": { "icons/logo.png": { "hash": "…", "size": 812, "modifiedTime": 1700000000000000000, "hasDerivative": true } } }
//! ```
//!
//! It is loaded once per run, mutated in memory, and saved once at the end.
//! Loading is fail-safe: a missing, corrupt, or oddly shaped manifest is an
//! empty manifest, which means "process everything".

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shrinkray_common::ContentHash;

use crate::atomic::write_atomic;
use crate::error::CacheError;

/// Cached state for a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRecord {
    /// Content hash of the source at the last successful processing.
    pub hash: ContentHash,

    /// Byte length of the source at the last successful processing.
    pub size: u64,

    /// Opaque modification timestamp at the last successful processing.
    pub modified_time: i64,

    /// Whether a WebP derivative was produced next to the primary output.
    pub has_derivative: bool,
}

/// Mapping from source-relative key to [`ManifestRecord`].
///
/// Keys are forward-slash paths relative to the source root. A key exists
/// only for files that were processed successfully at least once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Per-source-file cache state.
    pub files: BTreeMap<String, ManifestRecord>,
}

impl Manifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for a key.
    pub fn get(&self, key: &str) -> Option<&ManifestRecord> {
        self.files.get(key)
    }

    /// Inserts or replaces the record for a key.
    pub fn insert(&mut self, key: impl Into<String>, record: ManifestRecord) {
        self.files.insert(key.into(), record);
    }

    /// Number of recorded files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Parses manifest JSON.
    ///
    /// The document must be an object whose `files` member is an object.
    /// Entries under `files` that do not deserialize as a record are dropped
    /// individually; the remaining entries survive.
    pub fn from_json(text: &str) -> Result<Self, CacheError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| CacheError::ManifestParse {
                reason: e.to_string(),
            })?;
        let files = value
            .get("files")
            .and_then(serde_json::Value::as_object)
            .ok_or_else(|| CacheError::ManifestShape {
                reason: "expected an object with a `files` object".to_string(),
            })?;

        let mut manifest = Self::new();
        for (key, raw) in files {
            match ManifestRecord::deserialize(raw) {
                Ok(record) => manifest.insert(key.clone(), record),
                Err(e) => tracing::warn!(key = %key, error = %e, "dropping malformed manifest entry"),
            }
        }
        Ok(manifest)
    }

    /// Serializes to pretty-printed JSON terminated by a newline.
    pub fn to_json(&self) -> Result<String, CacheError> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        json.push('\n');
        Ok(json)
    }
}

/// Durable home of the [`Manifest`] between runs.
pub trait ManifestStore {
    /// Loads the stored manifest, or an empty one if there is none or it
    /// cannot be read. Never fails.
    fn load(&self) -> Manifest;

    /// Replaces the stored manifest with `manifest`.
    fn save(&self, manifest: &Manifest) -> Result<(), CacheError>;
}

/// Manifest stored as a JSON file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct JsonManifestStore {
    path: PathBuf,
}

impl JsonManifestStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the manifest file, reporting why it is unusable.
    pub fn try_load(&self) -> Result<Manifest, CacheError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| CacheError::io(&self.path, e))?;
        Manifest::from_json(&text)
    }
}

impl ManifestStore for JsonManifestStore {
    fn load(&self) -> Manifest {
        match self.try_load() {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "starting with an empty manifest");
                Manifest::new()
            }
        }
    }

    fn save(&self, manifest: &Manifest) -> Result<(), CacheError> {
        let json = manifest.to_json()?;
        write_atomic(&self.path, json.as_bytes())
    }
}

/// Manifest held in memory, for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryManifestStore {
    manifest: RefCell<Manifest>,
    saves: Cell<usize>,
}

impl MemoryManifestStore {
    /// Creates a store whose first `load` returns `manifest`.
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest: RefCell::new(manifest),
            saves: Cell::new(0),
        }
    }

    /// The most recently saved (or initial) manifest.
    pub fn snapshot(&self) -> Manifest {
        self.manifest.borrow().clone()
    }

    /// How many times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl ManifestStore for MemoryManifestStore {
    fn load(&self) -> Manifest {
        self.snapshot()
    }

    fn save(&self, manifest: &Manifest) -> Result<(), CacheError> {
        *self.manifest.borrow_mut() = manifest.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
