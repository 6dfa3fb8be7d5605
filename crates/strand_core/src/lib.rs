//! # Strand
//!
//! A segmented, append-only, on-disk commit log.
//!
//! A commit log is a durable, ordered sequence of opaque byte records. On
//! disk it is one directory containing one or more fixed-capacity files
//! called segments; it is the segments that actually hold data. Producers
//! append records at the tail, consumers read contiguous spans of records
//! starting after a resume offset, and [`Log::clean`] prunes the oldest
//! segments once the log exceeds its byte or age budget.
//!
//! This crate provides:
//! - Per-append durability (every append is flushed before returning)
//! - Roll-on-full segment rotation
//! - Resumable span reads with a soft size ceiling
//! - Byte- and age-budget eviction
//! - Safe concurrent append/read/clean from multiple threads
//!
//! ## Example
//!
//! ```no_run
//! use strand_core::{Log, LogConfig};
//!
//! let log = Log::new("/tmp/orders", LogConfig::default())?;
//! log.append(b"order #1")?;
//! log.append(b"order #2")?;
//!
//! let chunk = log.read(0, 0)?;
//! assert_eq!(&chunk.data, b"order #1order #2");
//!
//! // later: read only what arrived since
//! let next = log.read(chunk.last_read_offset, 0)?;
//! assert!(next.data.is_empty());
//! # Ok::<(), strand_core::LogError>(())
//! ```
//!
//! Records carry no framing: a read returns raw contiguous bytes, and
//! splitting them back into records belongs to a layer above this crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cleaner;
mod clock;
mod config;
mod dir;
mod error;
mod log;
mod segment;

pub use config::LogConfig;
pub use error::{LogError, LogResult, ReadError};
pub use log::{Log, ReadChunk};
