//! Segment eviction by byte and age budgets.
//!
//! The cleaner walks the segment list newest-first, twice: once accumulating
//! `current_bytes` against `max_log_bytes`, once accumulating `age` against
//! `max_log_age`. A segment survives a pass if the running total *before*
//! its own contribution is still under the budget, so the newest segment
//! always survives and the budget can be overshot by exactly one segment.
//! Evicted segments are deleted from the filesystem, not merely dropped.

use crate::error::{LogError, LogResult};
use crate::segment::Segment;
use std::time::Duration;

/// Applies the log-wide byte and age budgets to a segment list.
#[derive(Debug)]
pub(crate) struct Cleaner {
    max_log_bytes: u64,
    max_log_age: Duration,
}

/// A delete failure during a clean pass. The survivor set computed so far is
/// carried along so the log can still install it.
#[derive(Debug)]
pub(crate) struct CleanError {
    pub(crate) survivors: Vec<Segment>,
    pub(crate) source: LogError,
}

impl Cleaner {
    /// Both budgets must be strictly positive.
    pub(crate) fn new(max_log_bytes: u64, max_log_age: Duration) -> LogResult<Self> {
        if max_log_bytes == 0 || max_log_age.is_zero() {
            return Err(LogError::BadCleanerConfig);
        }

        Ok(Self {
            max_log_bytes,
            max_log_age,
        })
    }

    /// Returns the surviving segments, oldest first, deleting the evicted
    /// ones from disk. Input must be ordered oldest to newest; one or zero
    /// segments are returned unchanged.
    pub(crate) fn clean(&self, segments: Vec<Segment>) -> Result<Vec<Segment>, CleanError> {
        if segments.len() <= 1 {
            // retain at least one
            return Ok(segments);
        }

        let segments = self.clean_by_bytes(segments)?;
        self.clean_by_age(segments)
    }

    fn clean_by_bytes(&self, segments: Vec<Segment>) -> Result<Vec<Segment>, CleanError> {
        self.clean_by(segments, self.max_log_bytes, Segment::current_bytes)
    }

    fn clean_by_age(&self, segments: Vec<Segment>) -> Result<Vec<Segment>, CleanError> {
        let budget = self.max_log_age.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.clean_by(segments, budget, Segment::age)
    }

    fn clean_by(
        &self,
        segments: Vec<Segment>,
        budget: u64,
        measure: impl Fn(&Segment) -> u64,
    ) -> Result<Vec<Segment>, CleanError> {
        if segments.len() <= 1 {
            return Ok(segments);
        }

        // Walk newest to oldest. The check runs before the segment's own
        // contribution is added to the total, which is what admits the
        // segment that crosses the budget and guarantees a survivor.
        let mut total = 0u64;
        let mut keep = vec![false; segments.len()];
        for i in (0..segments.len()).rev() {
            if total < budget {
                keep[i] = true;
            }
            total = total.saturating_add(measure(&segments[i]));
        }

        let mut survivors = Vec::with_capacity(segments.len());
        let mut evicted = Vec::new();
        for (segment, kept) in segments.into_iter().zip(keep) {
            if kept {
                survivors.push(segment);
            } else {
                evicted.push(segment);
            }
        }

        // delete in reverse index order, newest evictee first
        while let Some(segment) = evicted.pop() {
            if let Err(source) = segment.delete() {
                return Err(CleanError { survivors, source });
            }
        }

        Ok(survivors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::now_nanos;
    use std::path::Path;
    use tempfile::tempdir;

    fn segment_with(dir: &Path, base_offset: u64, bytes: usize) -> Segment {
        let seg = Segment::new(
            dir.join(format!("{base_offset}.log")),
            base_offset,
            u64::MAX,
        )
        .unwrap();
        if bytes > 0 {
            seg.append(&vec![b'a'; bytes]).unwrap();
        }
        seg
    }

    #[test]
    fn zero_bounds_are_rejected() {
        assert!(matches!(
            Cleaner::new(0, Duration::from_nanos(1)),
            Err(LogError::BadCleanerConfig)
        ));
        assert!(matches!(
            Cleaner::new(1, Duration::ZERO),
            Err(LogError::BadCleanerConfig)
        ));
    }

    #[test]
    fn empty_and_single_inputs_are_unchanged() {
        let temp = tempdir().unwrap();
        let cleaner = Cleaner::new(1, Duration::from_nanos(1)).unwrap();

        assert!(cleaner.clean(vec![]).unwrap().is_empty());

        let seg = segment_with(temp.path(), 100, 40);
        let out = cleaner.clean(vec![seg]).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].file_path().exists());
    }

    #[test]
    fn byte_budget_admits_the_crossing_segment() {
        let temp = tempdir().unwrap();
        let cleaner = Cleaner::new(50, Duration::from_secs(3600)).unwrap();

        // 40 bytes each against a 50-byte budget: the newest is admitted at
        // total 0, the middle at total 40, the oldest is evicted at total 80
        let segs = vec![
            segment_with(temp.path(), 1, 40),
            segment_with(temp.path(), 2, 40),
            segment_with(temp.path(), 3, 40),
        ];
        let oldest_path = segs[0].file_path().to_path_buf();

        let survivors = cleaner.clean_by_bytes(segs).unwrap();
        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors[0].base_offset(), 2);
        assert_eq!(survivors[1].base_offset(), 3);
        assert!(!oldest_path.exists());
        assert!(survivors[0].file_path().exists());
    }

    #[test]
    fn byte_budget_always_retains_the_tail() {
        let temp = tempdir().unwrap();
        let cleaner = Cleaner::new(1, Duration::from_secs(3600)).unwrap();

        let segs = vec![
            segment_with(temp.path(), 1, 40),
            segment_with(temp.path(), 2, 40),
            segment_with(temp.path(), 3, 40),
        ];

        let survivors = cleaner.clean_by_bytes(segs).unwrap();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].base_offset(), 3);
        assert!(!temp.path().join("1.log").exists());
        assert!(!temp.path().join("2.log").exists());
    }

    #[test]
    fn age_budget_evicts_ancient_segments() {
        let temp = tempdir().unwrap();
        let cleaner = Cleaner::new(u64::MAX, Duration::from_nanos(1)).unwrap();

        // base offsets 1 and 2 date to the epoch, so their age is enormous;
        // the newest is recent and survives on the check-before-add rule
        let recent = now_nanos().saturating_sub(1_000);
        let segs = vec![
            segment_with(temp.path(), 1, 10),
            segment_with(temp.path(), 2, 10),
            segment_with(temp.path(), recent, 10),
        ];

        let survivors = cleaner.clean_by_age(segs).unwrap();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].base_offset(), recent);
        assert!(!temp.path().join("1.log").exists());
    }

    #[test]
    fn clean_applies_bytes_then_age() {
        let temp = tempdir().unwrap();
        // byte pass narrows three down to two, age pass down to one
        let cleaner = Cleaner::new(50, Duration::from_nanos(1)).unwrap();

        let segs = vec![
            segment_with(temp.path(), 1, 40),
            segment_with(temp.path(), 2, 40),
            segment_with(temp.path(), 3, 40),
        ];

        let survivors = cleaner.clean(segs).unwrap();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].base_offset(), 3);
    }
}
