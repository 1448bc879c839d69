//! Workspace-scoped path resolution: resolve a possibly-relative path
//! against a root and reject anything that escapes it lexically (no
//! filesystem round-trip, since assertion targets frequently don't exist
//! yet when they're checked for non-existence).

use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
#[error("path `{path}` escapes root `{root}`")]
pub struct PathEscapeError {
    pub path: PathBuf,
    pub root: PathBuf,
}

/// Lexically normalize a path, resolving `.` and `..` components without
/// touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve `candidate` against `root`. Absolute paths pass through
/// unchanged (per spec §4.5 "absolute paths pass through"); relative paths
/// are joined to `root` and must not lexically escape it.
pub fn resolve_within(root: &Path, candidate: &Path) -> Result<PathBuf, PathEscapeError> {
    if candidate.is_absolute() {
        return Ok(candidate.to_path_buf());
    }

    let joined = root.join(candidate);
    let normalized = normalize_lexically(&joined);
    let normalized_root = normalize_lexically(root);

    if !normalized.starts_with(&normalized_root) {
        return Err(PathEscapeError {
            path: candidate.to_path_buf(),
            root: root.to_path_buf(),
        });
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_pass_through() {
        let root = Path::new("/case/output");
        let resolved = resolve_within(root, Path::new("/tmp/whatever")).unwrap();
        assert_eq!(resolved, Path::new("/tmp/whatever"));
    }

    #[test]
    fn relative_paths_join_root() {
        let root = Path::new("/case/output");
        let resolved = resolve_within(root, Path::new("greeting.txt")).unwrap();
        assert_eq!(resolved, Path::new("/case/output/greeting.txt"));
    }

    #[test]
    fn rejects_escape() {
        let root = Path::new("/case/output");
        let err = resolve_within(root, Path::new("../../etc/passwd")).unwrap_err();
        assert_eq!(err.root, root);
    }
}
