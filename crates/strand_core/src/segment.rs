//! A single append-only segment file.
//!
//! Segments are the files that actually hold data. Each one is owned by its
//! log, named `<base_offset>.log`, and receives writes only while it is the
//! tail of the log's segment list. A segment past `max_bytes` is full; the
//! log rolls to a fresh segment on the next append.

use crate::clock::now_nanos;
use crate::error::{LogError, LogResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Mutable segment state, guarded by the segment's own read/write lock.
///
/// The owning log serializes appends, so this lock is a second layer of
/// safety for paths that touch a segment without holding the log lock.
#[derive(Debug)]
struct SegmentInner {
    /// Open handle; released on close and delete.
    file: Option<File>,
    /// Bytes successfully appended and flushed. Always equals the length of
    /// the backing file.
    current_bytes: u64,
    /// `now - base_offset` in nanoseconds, refreshed on each append.
    age: u64,
    closed: bool,
    deleted: bool,
}

/// One append-only file plus metadata.
///
/// `base_offset` is the segment's creation time in nanoseconds since the
/// Unix epoch and serves as its identity, its file name stem, and its sort
/// key within the log.
#[derive(Debug)]
pub(crate) struct Segment {
    base_offset: u64,
    file_path: PathBuf,
    max_bytes: u64,
    inner: RwLock<SegmentInner>,
}

impl Segment {
    /// Opens or creates the backing file at `file_path`.
    ///
    /// An existing file is opened for append and its size becomes
    /// `current_bytes`, which is how segments recover their state on log
    /// open.
    pub(crate) fn new(file_path: PathBuf, base_offset: u64, max_bytes: u64) -> LogResult<Self> {
        let file = open_segment_file(&file_path).map_err(|source| LogError::OpenFile {
            path: file_path.clone(),
            source,
        })?;

        let meta = file
            .metadata()
            .map_err(|source| LogError::StatFile { source })?;

        // saturating: a segment dated in the future must get age 0, not a
        // wrapped u64
        let age = now_nanos().saturating_sub(base_offset);

        Ok(Self {
            base_offset,
            file_path,
            max_bytes,
            inner: RwLock::new(SegmentInner {
                file: Some(file),
                current_bytes: meta.len(),
                age,
                closed: false,
                deleted: false,
            }),
        })
    }

    pub(crate) fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub(crate) fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Bytes appended and flushed so far.
    pub(crate) fn current_bytes(&self) -> u64 {
        self.inner.read().current_bytes
    }

    /// Nanoseconds between the last append (or creation) and `base_offset`.
    pub(crate) fn age(&self) -> u64 {
        self.inner.read().age
    }

    /// Whether the segment holds as much data as it is allowed to.
    pub(crate) fn is_full(&self) -> bool {
        self.inner.read().current_bytes >= self.max_bytes
    }

    /// Appends a payload as a single raw write, then flushes to stable
    /// storage.
    ///
    /// A payload larger than `max_bytes` is still accepted whole; fullness
    /// only matters to the log on the next append. A short write truncates
    /// the file back to its pre-write length and surfaces an error, so
    /// `current_bytes` always matches the file.
    pub(crate) fn append(&self, payload: &[u8]) -> LogResult<()> {
        let mut inner = self.inner.write();

        if inner.closed {
            return Err(LogError::SegmentClosed);
        }
        let pre = inner.current_bytes;

        let file = inner.file.as_mut().ok_or(LogError::SegmentClosed)?;
        let n = file
            .write(payload)
            .map_err(|source| LogError::SegmentWrite { source })?;

        if n < payload.len() {
            file.set_len(pre)
                .map_err(|source| LogError::PartialWriteTruncate { source })?;
            return Err(LogError::SegmentWrite {
                source: io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write: {n} of {} bytes", payload.len()),
                ),
            });
        }

        inner.current_bytes = pre + n as u64;
        inner.age = now_nanos().saturating_sub(self.base_offset);

        if let Some(file) = inner.file.as_ref() {
            file.sync_all()
                .map_err(|source| LogError::SegmentSync { source })?;
        }

        Ok(())
    }

    /// Reads the entire current file contents.
    ///
    /// Works on closed segments too; the path is retained after the handle
    /// is released.
    pub(crate) fn read_all(&self) -> LogResult<Vec<u8>> {
        let _guard = self.inner.read();
        std::fs::read(&self.file_path).map_err(|source| LogError::SegmentRead { source })
    }

    /// Flushes and releases the file handle. Idempotent; appends are not
    /// permitted afterwards.
    pub(crate) fn close(&self) -> LogResult<()> {
        let mut inner = self.inner.write();
        close_inner(&mut inner)
    }

    /// Removes the segment from the filesystem: closes if needed, unlinks
    /// the backing file, and drops the handle. A no-op once the segment is
    /// gone from in-memory state.
    pub(crate) fn delete(&self) -> LogResult<()> {
        let mut inner = self.inner.write();

        if inner.deleted {
            return Ok(());
        }

        close_inner(&mut inner)?;

        std::fs::remove_file(&self.file_path)
            .map_err(|source| LogError::SegmentRemove { source })?;
        inner.deleted = true;

        Ok(())
    }
}

fn close_inner(inner: &mut SegmentInner) -> LogResult<()> {
    if inner.closed {
        return Ok(());
    }

    if let Some(file) = inner.file.as_ref() {
        file.sync_all()
            .map_err(|source| LogError::SegmentClose { source })?;
    }

    inner.file = None;
    inner.closed = true;
    Ok(())
}

#[cfg(unix)]
fn open_segment_file(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .mode(crate::dir::FS_MODE)
        .open(path)
}

#[cfg(not(unix))]
fn open_segment_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).append(true).create(true).open(path)
}
