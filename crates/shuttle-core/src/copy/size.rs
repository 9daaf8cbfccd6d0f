//! Total byte size of a file or directory tree.

use std::path::Path;

use walkdir::WalkDir;

/// Sum of regular-file sizes under `path` (or the file's own size). Symlinks
/// are followed. Entries that can't be read count as zero.
pub fn total_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("size walk skipped entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}
