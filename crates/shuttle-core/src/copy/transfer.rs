//! Chunked file and tree copy with a cancellation check before every block.

use std::fs::{self, File, Metadata};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use filetime::FileTime;
use walkdir::WalkDir;

use super::error::CopyError;

/// Receives per-chunk callbacks from the transfer loop.
pub trait CopyObserver {
    /// Checked before each block; returning true aborts with [`CopyError::Cancelled`].
    fn is_cancelled(&self) -> bool;

    /// `file_copied` is the cumulative byte count written to `file` so far.
    fn on_chunk(&mut self, file: &Path, file_copied: u64, file_size: u64);
}

/// Copy one regular file in `chunk_size` blocks, then its permissions and times.
pub fn copy_file_chunked(
    src: &Path,
    dst: &Path,
    chunk_size: usize,
    observer: &mut dyn CopyObserver,
) -> Result<u64, CopyError> {
    let mut reader =
        File::open(src).map_err(|e| CopyError::io(format!("open {}", src.display()), e))?;
    let meta = reader
        .metadata()
        .map_err(|e| CopyError::io(format!("stat {}", src.display()), e))?;
    let file_size = meta.len();
    let mut writer =
        File::create(dst).map_err(|e| CopyError::io(format!("create {}", dst.display()), e))?;

    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut copied: u64 = 0;
    loop {
        if observer.is_cancelled() {
            return Err(CopyError::Cancelled);
        }
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::io(format!("read {}", src.display()), e)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|e| CopyError::io(format!("write {}", dst.display()), e))?;
        copied += n as u64;
        observer.on_chunk(src, copied, file_size);
    }
    writer
        .flush()
        .map_err(|e| CopyError::io(format!("flush {}", dst.display()), e))?;
    drop(writer);

    copy_metadata(&meta, dst);
    Ok(copied)
}

/// Recreate the tree under `src` at `dst`. Entries are visited in name order;
/// directory metadata is applied last, deepest first, so writing children
/// doesn't disturb the copied times.
pub fn copy_tree(
    src: &Path,
    dst: &Path,
    chunk_size: usize,
    observer: &mut dyn CopyObserver,
) -> Result<u64, CopyError> {
    let mut dirs: Vec<(Metadata, PathBuf)> = Vec::new();
    let mut copied = 0;

    for entry in WalkDir::new(src).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| CopyError::Walk {
            path: src.to_path_buf(),
            source: e,
        })?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| CopyError::io(format!("create dir {}", target.display()), e))?;
            if let Ok(meta) = entry.metadata() {
                dirs.push((meta, target));
            }
        } else if file_type.is_file() {
            copied += copy_file_chunked(entry.path(), &target, chunk_size, observer)?;
        } else {
            tracing::debug!(path = %entry.path().display(), "skipping special file");
        }
    }

    for (meta, dir) in dirs.iter().rev() {
        copy_metadata(meta, dir);
    }
    Ok(copied)
}

/// Permissions plus access/modification times. Best effort: some filesystems
/// reject one or the other and the data is already in place.
pub fn copy_metadata(meta: &Metadata, dst: &Path) {
    if let Err(e) = fs::set_permissions(dst, meta.permissions()) {
        tracing::warn!(path = %dst.display(), "copy permissions failed: {}", e);
    }
    let atime = FileTime::from_last_access_time(meta);
    let mtime = FileTime::from_last_modification_time(meta);
    if let Err(e) = filetime::set_file_times(dst, atime, mtime) {
        tracing::warn!(path = %dst.display(), "copy timestamps failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        chunks: Vec<(PathBuf, u64, u64)>,
        cancel_after: Option<usize>,
    }

    impl CopyObserver for Recorder {
        fn is_cancelled(&self) -> bool {
            self.cancel_after
                .map(|n| self.chunks.len() >= n)
                .unwrap_or(false)
        }

        fn on_chunk(&mut self, file: &Path, file_copied: u64, file_size: u64) {
            self.chunks.push((file.to_path_buf(), file_copied, file_size));
        }
    }

    #[test]
    fn file_copied_in_chunks_with_cumulative_reports() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("dst.bin");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&src, &data).unwrap();

        let mut rec = Recorder::default();
        let n = copy_file_chunked(&src, &dst, 4096, &mut rec).unwrap();
        assert_eq!(n, 10_000);
        assert_eq!(fs::read(&dst).unwrap(), data);
        let cumulative: Vec<u64> = rec.chunks.iter().map(|c| c.1).collect();
        assert_eq!(cumulative, vec![4096, 8192, 10_000]);
        assert!(rec.chunks.iter().all(|c| c.2 == 10_000));
    }

    #[test]
    fn modification_time_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::write(&src, b"hello").unwrap();
        let past = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src, past).unwrap();

        copy_file_chunked(&src, &dst, 2, &mut Recorder::default()).unwrap();
        let meta = fs::metadata(&dst).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), past);
    }

    #[test]
    fn cancellation_stops_before_next_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::write(&src, vec![7u8; 1000]).unwrap();

        let mut rec = Recorder {
            cancel_after: Some(2),
            ..Recorder::default()
        };
        let err = copy_file_chunked(&src, &dst, 100, &mut rec).unwrap_err();
        assert!(matches!(err, CopyError::Cancelled));
        assert_eq!(rec.chunks.len(), 2);
        assert_eq!(fs::metadata(&dst).unwrap().len(), 200);
    }

    #[test]
    fn tree_copy_recreates_structure_and_dir_times() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("season");
        fs::create_dir_all(src.join("extras/empty")).unwrap();
        fs::write(src.join("e01.mkv"), vec![1u8; 300]).unwrap();
        fs::write(src.join("extras/bts.mkv"), vec![2u8; 500]).unwrap();
        let past = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_mtime(src.join("extras"), past).unwrap();

        let dst = dir.path().join("out/season");
        fs::create_dir_all(dst.parent().unwrap()).unwrap();
        let mut rec = Recorder::default();
        let n = copy_tree(&src, &dst, 128, &mut rec).unwrap();

        assert_eq!(n, 800);
        assert_eq!(fs::read(dst.join("e01.mkv")).unwrap(), vec![1u8; 300]);
        assert_eq!(fs::read(dst.join("extras/bts.mkv")).unwrap(), vec![2u8; 500]);
        assert!(dst.join("extras/empty").is_dir());
        let meta = fs::metadata(dst.join("extras")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), past);
    }
}
