//! Mapping from source paths to cache keys and output locations.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use shrinkray_common::{normalize_lexically, ImageFormat};

use crate::error::CacheError;

/// Where a source file's outputs live, and the key it is cached under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Source-relative path with forward slashes.
    pub key: String,
    /// Optimized output at the mirrored location under the output root.
    pub primary: PathBuf,
    /// WebP sibling of `primary`, for derivative-eligible formats.
    pub derivative: Option<PathBuf>,
}

impl ResolvedPaths {
    /// Returns `true` if every expected output is present on disk.
    pub fn outputs_exist(&self) -> bool {
        self.primary.is_file() && self.derivative.as_deref().map_or(true, Path::is_file)
    }
}

/// Resolves source files against a source root and an output root.
///
/// Both roots are stored as absolute, lexically normalized paths so that
/// keys and containment checks do not depend on how they were spelled.
#[derive(Debug, Clone)]
pub struct PathResolver {
    source_root: PathBuf,
    output_root: PathBuf,
}

impl PathResolver {
    /// Creates a resolver. Relative roots are taken relative to `base`.
    pub fn new(base: &Path, source_root: &Path, output_root: &Path) -> Self {
        Self {
            source_root: normalize_lexically(&base.join(source_root)),
            output_root: normalize_lexically(&base.join(output_root)),
        }
    }

    /// The normalized source root.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// The normalized output root.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Returns `true` if `path` lies strictly inside the source root.
    ///
    /// The root itself is not inside.
    pub fn contains(&self, path: &Path) -> bool {
        normalize_lexically(path)
            .strip_prefix(&self.source_root)
            .is_ok_and(|rel| rel.components().next().is_some())
    }

    /// Computes the cache key of a source file: its path relative to the
    /// source root, joined with `/` on every platform.
    pub fn relative_key(&self, source: &Path) -> Result<String, CacheError> {
        let rel = self.relative(source)?;
        let mut parts = Vec::new();
        for component in rel.components() {
            let part = component.as_os_str().to_str().ok_or_else(|| CacheError::InvalidPath {
                path: source.to_path_buf(),
                reason: "path is not valid UTF-8".to_string(),
            })?;
            parts.push(part);
        }
        Ok(parts.join("/"))
    }

    /// Re-roots a cache key under the output root.
    pub fn output_path(&self, key: &str) -> PathBuf {
        let mut path = self.output_root.clone();
        path.extend(key.split('/').filter(|part| !part.is_empty()));
        path
    }

    /// Computes the key and output paths of a source file.
    pub fn resolve(&self, source: &Path) -> Result<ResolvedPaths, CacheError> {
        let key = self.relative_key(source)?;
        let primary = self.output_path(&key);
        let derivative = ImageFormat::from_path(source)
            .filter(|f| f.has_derivative())
            .map(|_| primary.with_extension(ImageFormat::DERIVATIVE.extension()));
        Ok(ResolvedPaths {
            key,
            primary,
            derivative,
        })
    }

    /// Turns command-line arguments into absolute source paths.
    ///
    /// Relative arguments are resolved against `cwd`. Results are
    /// deduplicated in first-seen order, and anything outside the source
    /// root is dropped without error.
    pub fn filter_explicit<P: AsRef<Path>>(&self, args: &[P], cwd: &Path) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for arg in args {
            let abs = normalize_lexically(&cwd.join(arg.as_ref()));
            if !self.contains(&abs) {
                tracing::debug!(path = %abs.display(), "ignoring path outside the source root");
                continue;
            }
            if seen.insert(abs.clone()) {
                targets.push(abs);
            }
        }
        targets
    }

    fn relative(&self, source: &Path) -> Result<PathBuf, CacheError> {
        let normalized = normalize_lexically(source);
        match normalized.strip_prefix(&self.source_root) {
            Ok(rel) if rel.components().next().is_some() => Ok(rel.to_path_buf()),
            _ => Err(CacheError::InvalidPath {
                path: source.to_path_buf(),
                reason: format!("not inside {}", self.source_root.display()),
            }),
        }
    }
}
