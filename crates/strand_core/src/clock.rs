//! Wall-clock time as nanoseconds since the Unix epoch.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the number of nanoseconds elapsed since January 1, 1970 UTC.
///
/// Segment base offsets are derived from this value, so its resolution is
/// what makes timestamp-as-identity workable. A system clock set before the
/// epoch yields 0 rather than wrapping.
pub(crate) fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64)
}
