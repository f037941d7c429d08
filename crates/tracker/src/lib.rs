//! Seen-job tracking for the job watcher.
//!
//! This crate provides:
//! - `SnapshotStore` trait with JSON-file and in-memory implementations
//! - `JobTracker`, which decides which fetched jobs are new, remembers
//!   them, and forgets entries older than the retention window

pub mod error;
pub mod record;
pub mod snapshot;
pub mod tracker;

pub use error::{SnapshotError, TrackerError};
pub use record::{SeenJobRecord, SeenJobSet};
pub use snapshot::{JsonFileStore, MemoryStore, SnapshotStore};
pub use tracker::{JobTracker, ProcessOutcome, TrackedJob, TrackerStats, RETENTION_WINDOW_HOURS};
