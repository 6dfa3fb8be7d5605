//! Log directory management.
//!
//! A commit log is a single directory:
//!
//! ```text
//! <path>/
//! ├─ LOCK                  # advisory lock, one log instance per directory
//! ├─ 1675161600123456789.log
//! ├─ 1675161600123460021.log
//! └─ ...
//! ```
//!
//! Segment files are named `<base_offset>.log` where the stem is the
//! segment's creation time in nanoseconds since the Unix epoch, as a decimal
//! u64. Any other `.log` entry makes the directory unopenable. Files that do
//! not end in `.log` (the LOCK file included) are ignored by the scan.

use crate::error::{LogError, LogResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Advisory lock file held for the lifetime of the owning log.
const LOCK_FILE: &str = "LOCK";

/// Suffix of segment files.
const SEGMENT_SUFFIX: &str = ".log";

/// Mode for the directory and segment files: owner read/write/execute,
/// group read, others none.
#[cfg(unix)]
pub(crate) const FS_MODE: u32 = 0o740;

/// Manages the commit log's directory: creation, locking, and the segment
/// file scan.
///
/// Holding a `LogDir` means holding an exclusive advisory lock on the
/// directory; a second instance on the same directory fails with
/// [`LogError::DirectoryLocked`]. The lock is released when the `LogDir` is
/// dropped.
#[derive(Debug)]
pub(crate) struct LogDir {
    path: PathBuf,
    _lock_file: File,
}

impl LogDir {
    /// Creates the directory (recursively, mode 0o740, idempotent on an
    /// existing directory) and acquires the advisory lock.
    pub(crate) fn open(path: &Path) -> LogResult<Self> {
        create_dir_recursive(path).map_err(|source| LogError::PathCreate { source })?;

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|source| LogError::OpenFile {
                path: lock_path,
                source,
            })?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(LogError::DirectoryLocked {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the log directory path.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the backing file path for a segment.
    pub(crate) fn segment_path(&self, base_offset: u64) -> PathBuf {
        self.path.join(format!("{base_offset}{SEGMENT_SUFFIX}"))
    }

    /// Scans the directory for segment files and returns their base
    /// offsets, sorted ascending.
    ///
    /// Every entry whose name ends in `.log` must have a decimal-u64 stem;
    /// one malformed name rejects the whole directory.
    pub(crate) fn scan_base_offsets(&self) -> LogResult<Vec<u64>> {
        let entries =
            std::fs::read_dir(&self.path).map_err(|source| LogError::ReadDir { source })?;

        let mut offsets = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LogError::ReadDir { source })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(SEGMENT_SUFFIX) {
                let n: u64 = stem.parse().map_err(|source| LogError::ParseFilename {
                    name: name.into_owned(),
                    source,
                })?;
                offsets.push(n);
            }
        }

        offsets.sort_unstable();
        Ok(offsets)
    }
}

#[cfg(unix)]
fn create_dir_recursive(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(FS_MODE)
        .create(path)
}

#[cfg(not(unix))]
fn create_dir_recursive(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("log");

        assert!(!path.exists());
        let dir = LogDir::open(&path).unwrap();
        assert!(path.is_dir());
        assert_eq!(dir.path(), path);
    }

    #[test]
    fn open_is_idempotent_on_existing_directory() {
        let temp = tempdir().unwrap();
        {
            let _dir = LogDir::open(temp.path()).unwrap();
        }
        let _dir = LogDir::open(temp.path()).unwrap();
    }

    #[test]
    fn lock_prevents_second_instance() {
        let temp = tempdir().unwrap();
        let _dir = LogDir::open(temp.path()).unwrap();

        let result = LogDir::open(temp.path());
        assert!(matches!(result, Err(LogError::DirectoryLocked { .. })));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        {
            let _dir = LogDir::open(temp.path()).unwrap();
        }
        let _dir = LogDir::open(temp.path()).unwrap();
    }

    #[test]
    fn segment_path_uses_decimal_stem() {
        let temp = tempdir().unwrap();
        let dir = LogDir::open(temp.path()).unwrap();

        assert_eq!(dir.segment_path(88998), temp.path().join("88998.log"));
    }

    #[test]
    fn scan_returns_sorted_offsets() {
        let temp = tempdir().unwrap();
        let dir = LogDir::open(temp.path()).unwrap();

        for n in [105u64, 3, 88998, 1, 100] {
            File::create(temp.path().join(format!("{n}.log"))).unwrap();
        }

        let offsets = dir.scan_base_offsets().unwrap();
        assert_eq!(offsets, vec![1, 3, 100, 105, 88998]);
    }

    #[test]
    fn scan_ignores_files_without_log_suffix() {
        let temp = tempdir().unwrap();
        let dir = LogDir::open(temp.path()).unwrap();

        File::create(temp.path().join("1.log")).unwrap();
        File::create(temp.path().join("notes.txt")).unwrap();

        // the LOCK file itself is also present and skipped
        let offsets = dir.scan_base_offsets().unwrap();
        assert_eq!(offsets, vec![1]);
    }

    #[test]
    fn scan_rejects_malformed_stem() {
        let temp = tempdir().unwrap();
        let dir = LogDir::open(temp.path()).unwrap();

        File::create(temp.path().join("1.log")).unwrap();
        File::create(temp.path().join("Malema-1.log")).unwrap();

        let result = dir.scan_base_offsets();
        assert!(matches!(result, Err(LogError::ParseFilename { .. })));
    }

    #[test]
    fn scan_empty_directory() {
        let temp = tempdir().unwrap();
        let dir = LogDir::open(temp.path()).unwrap();

        assert!(dir.scan_base_offsets().unwrap().is_empty());
    }
}
