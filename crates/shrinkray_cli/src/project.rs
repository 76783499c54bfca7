//! Project root discovery and configuration loading.

use std::path::{Path, PathBuf};

use shrinkray_config::{load_config, load_config_file, Config, CONFIG_FILE};

/// Walks up from `start` looking for the nearest directory containing
/// `shrinkray.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Resolves the project root and its configuration.
///
/// With `--config`, the file is loaded and its directory is the root.
/// Otherwise the nearest `shrinkray.toml` above `cwd` is used, and without
/// one the defaults apply with `cwd` as the root.
pub fn load_project(
    cwd: &Path,
    config_path: Option<&Path>,
) -> Result<(PathBuf, Config), Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        let path = cwd.join(path);
        let config = load_config_file(&path)?;
        let root = path.parent().map_or_else(|| cwd.to_path_buf(), Path::to_path_buf);
        return Ok((root, config));
    }
    let root = find_project_root(cwd).unwrap_or_else(|| cwd.to_path_buf());
    let config = load_config(&root)?;
    Ok((root, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn find_project_root_in_current_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "").unwrap();
        assert_eq!(find_project_root(tmp.path()).as_deref(), Some(tmp.path()));
    }

    #[test]
    fn find_project_root_in_parent() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "").unwrap();
        let sub = tmp.path().join("src/images");
        fs::create_dir_all(&sub).unwrap();
        assert_eq!(find_project_root(&sub).as_deref(), Some(tmp.path()));
    }

    #[test]
    fn missing_config_uses_cwd_and_defaults() {
        let tmp = TempDir::new().unwrap();
        let (root, config) = load_project(tmp.path(), None).unwrap();
        assert_eq!(root, tmp.path());
        assert_eq!(config.paths.source, "src/images");
        assert_eq!(config.run.jobs, 1);
    }

    #[test]
    fn explicit_config_sets_root() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site");
        fs::create_dir_all(&site).unwrap();
        fs::write(site.join("custom.toml"), "[paths]\nsource = \"raw\"\n").unwrap();

        let (root, config) = load_project(tmp.path(), Some(Path::new("site/custom.toml"))).unwrap();
        assert_eq!(root, site);
        assert_eq!(config.paths.source, "raw");
    }

    #[test]
    fn explicit_missing_config_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(load_project(tmp.path(), Some(Path::new("nope.toml"))).is_err());
    }

    #[test]
    fn invalid_config_errors() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[run]\njobs = 0\n").unwrap();
        assert!(load_project(tmp.path(), None).is_err());
    }
}
