//! Submission path checks: absolutize, normalize lexically, confine to a root.

use std::path::{Component, Path, PathBuf};

use super::ControlError;

/// Resolve `raw` into an absolute, `..`-free path. Relative paths are taken
/// relative to `root` (or the current directory when no root is configured).
/// With a root, the result must stay inside it.
pub(crate) fn resolve(raw: &str, root: Option<&Path>, what: &str) -> Result<PathBuf, ControlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ControlError::InvalidPath {
            path: raw.to_string(),
            reason: format!("{} path is empty", what),
        });
    }

    let candidate = Path::new(trimmed);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else if let Some(root) = root {
        root.join(candidate)
    } else {
        let cwd = std::env::current_dir().map_err(|e| ControlError::InvalidPath {
            path: raw.to_string(),
            reason: format!("cannot resolve relative {} path: {}", what, e),
        })?;
        cwd.join(candidate)
    };

    let normalized = normalize(&joined).ok_or_else(|| ControlError::InvalidPath {
        path: raw.to_string(),
        reason: format!("{} path climbs above the filesystem root", what),
    })?;

    if let Some(root) = root {
        let root = normalize(root).unwrap_or_else(|| root.to_path_buf());
        if !normalized.starts_with(&root) {
            return Err(ControlError::OutsideRoot {
                path: normalized,
                root,
            });
        }
    }

    if normalized.to_str().is_none() {
        return Err(ControlError::InvalidPath {
            path: raw.to_string(),
            reason: format!("{} path is not valid UTF-8", what),
        });
    }
    Ok(normalized)
}

/// Lexical normalization: drops `.`, folds `..` into its parent. Returns None
/// if `..` would pop past the root. Symlinks are not resolved.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() || out.as_os_str().is_empty() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}
