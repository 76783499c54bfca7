//! Parsing and validation of `shrinkray.toml` project configuration files.
//!
//! Every section is optional: a project without a config file runs with the
//! defaults (`src/images` → `images`, manifest at `.image-cache.json`).

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use types::*;
