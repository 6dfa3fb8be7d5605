//! Error types for the commit log.

use crate::log::ReadChunk;
use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for commit log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur in commit log operations.
///
/// Every I/O failure is categorized by the operation that produced it and
/// carries the underlying cause. Errors are surfaced to the caller
/// unwrapped; nothing in the crate retries.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log was not built through [`Log::new`](crate::Log::new).
    #[error("commit log has not been initialized; use Log::new")]
    NotInitialized,

    /// The cleaner was configured with a zero byte or age budget.
    #[error("cleaner cannot have a zero max_log_bytes or max_log_age")]
    BadCleanerConfig,

    /// Another log instance holds the directory lock.
    #[error("log directory is locked by another instance: {}", .path.display())]
    DirectoryLocked {
        /// The locked directory.
        path: PathBuf,
    },

    /// Creating the log directory failed.
    #[error("create log directory failed: {source}")]
    PathCreate {
        /// Underlying cause.
        source: io::Error,
    },

    /// Enumerating the log directory failed.
    #[error("read log directory failed: {source}")]
    ReadDir {
        /// Underlying cause.
        source: io::Error,
    },

    /// A `.log` entry has a stem that is not a decimal u64.
    #[error("parse segment filename {name:?} as u64 failed: {source}")]
    ParseFilename {
        /// The offending file name.
        name: String,
        /// Underlying cause.
        source: ParseIntError,
    },

    /// Opening a segment file failed.
    #[error("open segment file {} failed: {}", .path.display(), .source)]
    OpenFile {
        /// The file that could not be opened.
        path: PathBuf,
        /// Underlying cause.
        source: io::Error,
    },

    /// Stat of a segment file failed.
    #[error("stat segment file failed: {source}")]
    StatFile {
        /// Underlying cause.
        source: io::Error,
    },

    /// A segment write failed, or completed short of the full payload.
    #[error("segment write failed: {source}")]
    SegmentWrite {
        /// Underlying cause.
        source: io::Error,
    },

    /// Truncating a segment back after a partial write failed.
    #[error("partial write, truncate segment failed: {source}")]
    PartialWriteTruncate {
        /// Underlying cause.
        source: io::Error,
    },

    /// Flushing a segment to stable storage failed.
    #[error("segment sync failed: {source}")]
    SegmentSync {
        /// Underlying cause.
        source: io::Error,
    },

    /// Flushing a segment while closing it failed.
    #[error("segment close failed: {source}")]
    SegmentClose {
        /// Underlying cause.
        source: io::Error,
    },

    /// Unlinking a segment file failed.
    #[error("segment remove failed: {source}")]
    SegmentRemove {
        /// Underlying cause.
        source: io::Error,
    },

    /// Reading a segment's contents failed.
    #[error("segment read failed: {source}")]
    SegmentRead {
        /// Underlying cause.
        source: io::Error,
    },

    /// An append was attempted on a closed segment.
    #[error("segment is closed")]
    SegmentClosed,

    /// The segment list is empty (internal; active-segment lookup only).
    #[error("commit log has no active segment")]
    NoActiveSegment,
}

/// A read failure that still carries everything read before the failure.
///
/// [`Log::read`](crate::Log::read) accumulates whole segments until its soft
/// ceiling; if a segment read fails partway through, the bytes and resume
/// offset gathered so far are not discarded. This follows the
/// `String::from_utf8` pattern of an error owning the partial value.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ReadError {
    pub(crate) partial: ReadChunk,
    #[source]
    pub(crate) source: LogError,
}

impl From<ReadError> for LogError {
    /// Discards the partial chunk, keeping only the cause. Callers that
    /// want the partial bytes should match on [`ReadError`] instead of
    /// converting.
    fn from(err: ReadError) -> Self {
        err.source
    }
}

impl ReadError {
    /// The bytes accumulated before the failure.
    #[must_use]
    pub fn partial_data(&self) -> &[u8] {
        &self.partial.data
    }

    /// The base offset of the last segment read successfully.
    #[must_use]
    pub fn last_read_offset(&self) -> u64 {
        self.partial.last_read_offset
    }

    /// Consumes the error, yielding the partial chunk and the cause.
    #[must_use]
    pub fn into_parts(self) -> (ReadChunk, LogError) {
        (self.partial, self.source)
    }
}
