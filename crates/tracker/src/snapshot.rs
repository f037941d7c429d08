use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::SnapshotError;
use crate::record::{SeenJobRecord, SeenJobSet};

/// Durable home of the seen set.
///
/// The set is always read and written whole; there is no incremental log.
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved set. `Ok(None)` means nothing was ever saved.
    fn load(&self) -> Result<Option<SeenJobSet>, SnapshotError>;

    /// Replace the stored set with `jobs`.
    fn save(&self, jobs: &SeenJobSet) -> Result<(), SnapshotError>;

    /// Human-readable location for log lines.
    fn describe(&self) -> String;
}

/// Pretty-printed JSON object on disk, mapping job ids to records.
///
/// ```text
/// {
///   "1789": { "seenAt": "...", "postedAt": "...", "title": "...", "url": "..." }
/// }
/// ```
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "seen-jobs.json".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<SeenJobSet>, SnapshotError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&self.path)?;
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&json)?;

        // Malformed entries are skipped one by one.
        let mut jobs = SeenJobSet::new();
        for (job_id, value) in raw {
            match serde_json::from_value::<SeenJobRecord>(value) {
                Ok(record) => {
                    jobs.insert(job_id, record);
                }
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "dropping malformed seen-job entry");
                }
            }
        }
        debug!(path = %self.path.display(), entries = jobs.len(), "snapshot loaded");
        Ok(Some(jobs))
    }

    fn save(&self, jobs: &SeenJobSet) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(jobs)?;
        // Write to a `.tmp` sibling, then rename over the snapshot.
        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), entries = jobs.len(), "snapshot saved");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Process-local store used for dry runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<Option<SeenJobSet>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing set, as if it had been saved earlier.
    pub fn with_jobs(jobs: SeenJobSet) -> Self {
        Self {
            jobs: Mutex::new(Some(jobs)),
            ..Self::default()
        }
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every following `save` fail (simulates a full disk).
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Copy of what a reload would see.
    pub fn snapshot(&self) -> Option<SeenJobSet> {
        self.jobs.lock().ok().and_then(|guard| guard.clone())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<SeenJobSet>, SnapshotError> {
        let guard = self
            .jobs
            .lock()
            .map_err(|_| SnapshotError::Unavailable("memory store lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, jobs: &SeenJobSet) -> Result<(), SnapshotError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SnapshotError::Unavailable("saves disabled".into()));
        }
        let mut guard = self
            .jobs
            .lock()
            .map_err(|_| SnapshotError::Unavailable("memory store lock poisoned".into()))?;
        *guard = Some(jobs.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
