//! Filesystem-free path helpers.

use std::path::{Component, Path, PathBuf};

/// Collapses `.` and `..` components without touching the filesystem.
///
/// `..` at the root stays at the root; leading `..` in a relative path is
/// kept. Symlinks are not resolved.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}
