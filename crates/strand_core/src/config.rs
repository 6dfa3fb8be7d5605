//! Commit log configuration.

use std::time::Duration;

/// Configuration for opening a commit log.
///
/// `max_segment_bytes` bounds one segment file; once the active segment
/// reaches it, the next append rolls to a fresh segment. `max_log_bytes` and
/// `max_log_age` bound the log as a whole and are enforced by
/// [`Log::clean`](crate::Log::clean), which deletes the oldest segments past
/// either budget. Pick values appropriate for the workload;
/// `max_segment_bytes` should be significantly smaller than RAM since reads
/// load whole segments.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Maximum size of a single segment file before the log rolls.
    pub max_segment_bytes: u64,

    /// Maximum total size of the log before old segments are evicted.
    pub max_log_bytes: u64,

    /// Maximum age of the log before old segments are evicted.
    pub max_log_age: Duration,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_segment_bytes: 256 * 1024 * 1024, // 256 MiB
            // the Kafka defaults for the log-wide budgets
            max_log_bytes: 1024 * 1024 * 1024, // 1 GiB
            max_log_age: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
        }
    }
}

impl LogConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum segment file size.
    #[must_use]
    pub const fn max_segment_bytes(mut self, size: u64) -> Self {
        self.max_segment_bytes = size;
        self
    }

    /// Sets the maximum total log size.
    #[must_use]
    pub const fn max_log_bytes(mut self, size: u64) -> Self {
        self.max_log_bytes = size;
        self
    }

    /// Sets the maximum log age.
    #[must_use]
    pub const fn max_log_age(mut self, age: Duration) -> Self {
        self.max_log_age = age;
        self
    }
}
