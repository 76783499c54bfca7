//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::Config;
use shrinkray_common::{normalize_lexically, ImageFormat};
use std::path::Path;

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "shrinkray.toml";

/// Loads the configuration for a project directory.
///
/// Reads `<project_dir>/shrinkray.toml` if it exists; a project without one
/// gets [`Config::default`].
pub fn load_config(project_dir: &Path) -> Result<Config, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    if !config_path.is_file() {
        return Ok(Config::default());
    }
    load_config_file(&config_path)
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `shrinkray.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that paths are usable and commands are present.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let paths = &config.paths;
    for (field, value) in [
        ("paths.source", &paths.source),
        ("paths.output", &paths.output),
        ("paths.manifest", &paths.manifest),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{field} is empty")));
        }
    }

    let source = normalize_lexically(Path::new(&paths.source));
    let output = normalize_lexically(Path::new(&paths.output));
    if output.starts_with(&source) {
        return Err(ConfigError::ValidationError(format!(
            "paths.output '{}' must not be inside paths.source '{}'",
            paths.output, paths.source
        )));
    }

    if config.run.jobs == 0 {
        return Err(ConfigError::ValidationError(
            "run.jobs must be at least 1".to_string(),
        ));
    }

    for format in [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Svg,
        ImageFormat::WebP,
    ] {
        let empty = config
            .encoders
            .command(format)
            .is_some_and(|argv| argv.first().map_or(true, |p| p.is_empty()));
        if empty {
            return Err(ConfigError::ValidationError(format!(
                "encoders.{format} has no program"
            )));
        }
    }

    Ok(())
}
