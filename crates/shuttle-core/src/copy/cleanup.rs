//! Best-effort removal of partial output.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Remove a file, symlink or directory tree. Missing paths count as removed;
/// other errors are logged and swallowed. Returns true if nothing is left.
pub fn remove_path_best_effort(path: &Path) -> bool {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return true,
        Err(e) => {
            tracing::warn!(path = %path.display(), "cleanup stat failed: {}", e);
            return false;
        }
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed partial output");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), "cleanup failed: {}", e);
            false
        }
    }
}
