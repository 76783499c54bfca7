//! The incremental image pipeline.
//!
//! A run loads the manifest once, builds the target list, decides and encodes
//! each target, folds the per-file outcomes back into the manifest, and saves
//! it once. Any failure aborts the run before the save, so the previous
//! manifest stays authoritative.

#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod targets;

pub use driver::{fold_outcomes, Outcome, OutputCollision, Pipeline, RunReport};
pub use error::PipelineError;
pub use targets::discover_sources;
