//! Source tree enumeration.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use shrinkray_common::ImageFormat;
use walkdir::WalkDir;

use crate::error::PipelineError;

/// Discovers every file under `root` with a supported image extension.
///
/// Symlinks are followed. Results are in a stable depth-first order, sorted
/// by file name within each directory. A missing root yields no files.
/// Dangling symlinks are returned like any other entry; they are skipped
/// later as non-files.
pub fn discover_sources(root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound) => {
                if let Some(path) = e.path() {
                    tracing::debug!(path = %path.display(), "dangling symlink");
                    if ImageFormat::from_path(path).is_some() {
                        files.push(path.to_path_buf());
                    }
                }
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if entry.file_type().is_dir() {
            continue;
        }
        if ImageFormat::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
