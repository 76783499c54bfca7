//! Crash-safe file replacement.

use std::io::Write;
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

use crate::error::CacheError;

/// Writes `bytes` to `path` by way of a synced temporary file in the same
/// directory, renamed over the destination.
///
/// Readers observe either the previous file or the complete new one, never a
/// truncated write. Missing parent directories are created. The new file
/// gets the mode a plain create would: `0o666` less the process umask.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;

    let mut temp = temp_file_in(parent).map_err(|e| CacheError::io(parent, e))?;
    temp.write_all(bytes).map_err(|e| CacheError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| CacheError::io(path, e))?;
    temp.persist(path)
        .map_err(|e| CacheError::io(path, e.error))?;
    Ok(())
}

#[cfg(unix)]
fn temp_file_in(dir: &Path) -> std::io::Result<NamedTempFile> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    // The mode is passed to open(2), so the umask still applies.
    Builder::new()
        .permissions(Permissions::from_mode(0o666))
        .tempfile_in(dir)
}

#[cfg(not(unix))]
fn temp_file_in(dir: &Path) -> std::io::Result<NamedTempFile> {
    Builder::new().tempfile_in(dir)
}
