//! The commit log: an ordered list of segments in one directory.
//!
//! The log owns every segment and funnels all access to the shared segment
//! list through one reader/writer lock: `append`, `split`, and `clean` take
//! it exclusively, `read` takes it shared. There is therefore at most one
//! append in flight per log, while any number of reads proceed together.

use crate::cleaner::Cleaner;
use crate::clock::now_nanos;
use crate::config::LogConfig;
use crate::dir::LogDir;
use crate::error::{LogError, LogResult, ReadError};
use crate::segment::Segment;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::path::Path;
use tracing::debug;

/// Default soft ceiling for one read when the caller passes 0: 64 MiB.
const INTERNAL_MAX_TO_READ: u64 = 64 * 1024 * 1024;

/// A caller-supplied ceiling is capped at this multiple of the default, so
/// a hostile hint cannot ask for more memory than the machine has.
const MAX_TO_READ_CAP_FACTOR: u64 = 10;

/// A span of bytes returned by [`Log::read`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReadChunk {
    /// The concatenated contents of every segment read, in order.
    pub data: Vec<u8>,

    /// Base offset of the last segment included, or 0 if none was.
    ///
    /// Reads stop at segment boundaries, so this value can be fed straight
    /// back into [`Log::read`] to continue where the previous call left off
    /// without re-reading anything.
    pub last_read_offset: u64,
}

/// An append-only commit log backed by a directory of segment files.
///
/// Records are opaque bytes with no framing; a read returns a contiguous
/// byte run, not individual records. Appends go to the **active segment**
/// (the tail of the sorted segment list); once that segment reaches its
/// capacity the next append rolls to a fresh one. [`Log::clean`] evicts the
/// oldest segments past the configured byte and age budgets.
///
/// Each append is flushed to stable storage before it returns. The log is
/// safe to share across threads.
///
/// # Example
///
/// ```no_run
/// use strand_core::{Log, LogConfig};
///
/// let log = Log::new("/var/lib/orders", LogConfig::default())?;
/// log.append(b"order #1")?;
/// let chunk = log.read(0, 0)?;
/// assert_eq!(&chunk.data, b"order #1");
/// # Ok::<(), strand_core::LogError>(())
/// ```
#[derive(Debug)]
pub struct Log {
    dir: LogDir,
    initialized: bool,
    cleaner: Cleaner,
    max_seg_bytes: u64,
    /// The segment list, sorted ascending by base offset; the tail is the
    /// active segment. Guarded by the log-wide reader/writer lock and only
    /// ever touched through [`Log::segments_read`]/[`Log::segments_write`].
    segments: RwLock<Vec<Segment>>,
}

impl Log {
    /// Creates or recovers a commit log at `path`.
    ///
    /// The directory is created (recursively) if absent and an advisory
    /// lock is taken on it; existing `<base_offset>.log` files are recovered
    /// into the segment list, and an empty directory gets one fresh segment.
    ///
    /// # Errors
    ///
    /// Fails if the configured budgets are zero, if the directory cannot be
    /// created or is locked by another instance, or if any `.log` entry has
    /// a name that does not parse as a decimal u64.
    pub fn new(path: impl AsRef<Path>, config: LogConfig) -> LogResult<Self> {
        let cleaner = Cleaner::new(config.max_log_bytes, config.max_log_age)?;
        let dir = LogDir::open(path.as_ref())?;

        let log = Self {
            dir,
            initialized: true,
            cleaner,
            max_seg_bytes: config.max_segment_bytes,
            segments: RwLock::new(Vec::new()),
        };

        log.open()?;
        Ok(log)
    }

    /// Returns the directory holding the commit log.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Number of segments currently in the log.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments_read().len()
    }

    /// Total bytes held across all segments.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.segments_read().iter().map(Segment::current_bytes).sum()
    }

    /// Appends one record to the commit log.
    ///
    /// If the active segment is full (or there is none), the log rolls to a
    /// fresh segment first. The write is flushed before this returns.
    pub fn append(&self, payload: &[u8]) -> LogResult<()> {
        let mut segments = self.segments_write();

        if !self.initialized {
            return Err(LogError::NotInitialized);
        }

        self.append_locked(&mut segments, payload)
    }

    /// Appends multiple records under a single lock acquisition.
    ///
    /// Each payload is appended in order with the same roll-on-full
    /// behavior as [`Log::append`]; durability remains per-payload. Stops
    /// at the first failure.
    pub fn append_bulk<B: AsRef<[u8]>>(&self, payloads: &[B]) -> LogResult<()> {
        let mut segments = self.segments_write();

        if !self.initialized {
            return Err(LogError::NotInitialized);
        }

        for payload in payloads {
            self.append_locked(&mut segments, payload.as_ref())?;
        }
        Ok(())
    }

    /// Reads up to roughly `max_to_read` bytes starting *after* `offset`.
    ///
    /// Every segment whose base offset is strictly greater than `offset` is
    /// read whole and concatenated, until the accumulated size reaches the
    /// ceiling. `max_to_read` is a hint: whole segments are always read
    /// atomically, so the result may run past it by up to one segment. Pass
    /// 0 for the internal default (64 MiB); larger values are capped at 10x
    /// that default.
    ///
    /// Because the returned `last_read_offset` always lands on a segment
    /// boundary, feeding it back into `read` yields only data not yet seen.
    ///
    /// # Errors
    ///
    /// A failed segment read yields a [`ReadError`] still carrying
    /// everything accumulated up to the failure; nothing is retried.
    pub fn read(&self, offset: u64, max_to_read: u64) -> Result<ReadChunk, ReadError> {
        let segments = self.segments_read();

        let max = effective_max_to_read(max_to_read);
        let mut chunk = ReadChunk::default();
        let mut size_read = 0u64;

        for segment in segments.iter() {
            if segment.base_offset() > offset {
                // strict: the offset itself is excluded, so callers can
                // resume from the last_read_offset of a previous call
                match segment.read_all() {
                    Ok(bytes) => {
                        size_read += bytes.len() as u64;
                        chunk.data.extend_from_slice(&bytes);
                        chunk.last_read_offset = segment.base_offset();
                        if size_read >= max {
                            break;
                        }
                    }
                    Err(source) => {
                        return Err(ReadError {
                            partial: chunk,
                            source,
                        })
                    }
                }
            }
        }

        Ok(chunk)
    }

    /// Deletes segments past the byte budget, then segments past the age
    /// budget, from the log and the filesystem.
    ///
    /// At least one segment always survives; the active tail is never
    /// evicted. A delete failure aborts the operation and surfaces, with
    /// the survivor set computed so far left installed.
    pub fn clean(&self) -> LogResult<()> {
        let mut segments = self.segments_write();

        let before = segments.len();
        let current = std::mem::take(&mut *segments);
        match self.cleaner.clean(current) {
            Ok(survivors) => {
                debug!(
                    evicted = before - survivors.len(),
                    retained = survivors.len(),
                    "cleaned commit log"
                );
                *segments = survivors;
                Ok(())
            }
            Err(failed) => {
                *segments = failed.survivors;
                Err(failed.source)
            }
        }
    }

    /// Recovers the segment list from the directory.
    ///
    /// One malformed `.log` name rejects the whole directory and leaves the
    /// in-memory list untouched (empty on a fresh log).
    fn open(&self) -> LogResult<()> {
        if !self.initialized {
            return Err(LogError::NotInitialized);
        }

        let offsets = self.dir.scan_base_offsets()?;

        let mut segments = Vec::with_capacity(offsets.len().max(1));
        if offsets.is_empty() {
            // empty directory: start with one fresh segment
            let base_offset = now_nanos();
            segments.push(self.new_segment(base_offset)?);
        } else {
            for base_offset in offsets {
                segments.push(self.new_segment(base_offset)?);
            }
        }

        debug!(
            path = %self.dir.path().display(),
            segments = segments.len(),
            "opened commit log"
        );
        *self.segments_write() = segments;
        Ok(())
    }

    /// Rolls the log: a fresh segment becomes the active tail and the
    /// displaced tail is closed. Must be called with the exclusive lock
    /// already held; it never re-acquires.
    fn split_locked(&self, segments: &mut Vec<Segment>) -> LogResult<()> {
        if !self.initialized {
            return Err(LogError::NotInitialized);
        }

        let base_offset = now_nanos();
        let segment = self.new_segment(base_offset)?;

        let displaced = segments.len().checked_sub(1);
        segments.push(segment);

        if let Some(i) = displaced {
            // the log has already moved on to the new tail; a close failure
            // on the displaced segment is not actionable here
            let _ = segments[i].close();
        }

        debug!(base_offset, "rolled commit log to a new active segment");
        Ok(())
    }

    fn append_locked(&self, segments: &mut Vec<Segment>, payload: &[u8]) -> LogResult<()> {
        if Self::needs_split(segments) {
            self.split_locked(segments)?;
        }

        let active = segments.last().ok_or(LogError::NoActiveSegment)?;
        active.append(payload)
    }

    fn needs_split(segments: &[Segment]) -> bool {
        // no segments at all also means a split is due
        segments.last().map_or(true, Segment::is_full)
    }

    fn new_segment(&self, base_offset: u64) -> LogResult<Segment> {
        Segment::new(
            self.dir.segment_path(base_offset),
            base_offset,
            self.max_seg_bytes,
        )
    }

    // The two accessors below are the only paths to the segment list; every
    // read goes through the shared guard and every mutation through the
    // exclusive guard. Keep it that way.

    fn segments_read(&self) -> RwLockReadGuard<'_, Vec<Segment>> {
        self.segments.read()
    }

    fn segments_write(&self) -> RwLockWriteGuard<'_, Vec<Segment>> {
        self.segments.write()
    }

    /// Test hook for forcing a roll; production rolls only from `append`.
    #[cfg(test)]
    fn split(&self) -> LogResult<()> {
        let mut segments = self.segments_write();
        self.split_locked(&mut segments)
    }
}

/// Resolves the caller's size hint: 0 selects the internal default, and
/// anything above the cap is clamped to it.
fn effective_max_to_read(hint: u64) -> u64 {
    if hint == 0 {
        INTERNAL_MAX_TO_READ
    } else {
        hint.min(INTERNAL_MAX_TO_READ * MAX_TO_READ_CAP_FACTOR)
    }
}
