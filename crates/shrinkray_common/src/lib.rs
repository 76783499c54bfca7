//! Shared foundational types used across the shrinkray image pipeline.
//!
//! This crate provides the content hash used as the cache's source of truth,
//! the image format table that decides which files are recognized and
//! which ones get a WebP derivative, and lexical path normalization.

#![warn(missing_docs)]

pub mod format;
pub mod hash;
pub mod path;

pub use format::ImageFormat;
pub use hash::{ContentHash, ParseHashError};
pub use path::normalize_lexically;
