//! Incremental image cache management.
//!
//! This crate decides, for each source image, whether its optimized outputs
//! are still valid. It owns the manifest that records what was processed, the
//! mapping from source paths to cache keys and output paths, and the
//! stat-then-hash change detection that lets repeated runs skip unchanged
//! files without reading them.

#![warn(missing_docs)]

pub mod atomic;
pub mod detector;
pub mod error;
pub mod hasher;
pub mod manifest;
pub mod resolver;

pub use atomic::write_atomic;
pub use detector::{ChangeDetector, Inspection, Reason, SkipReason, StaleCause, Target, Verdict};
pub use error::CacheError;
pub use hasher::{FileStat, SourceHasher};
pub use manifest::{JsonManifestStore, Manifest, ManifestRecord, ManifestStore, MemoryManifestStore};
pub use resolver::{PathResolver, ResolvedPaths};
pub use shrinkray_common::normalize_lexically;
