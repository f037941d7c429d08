use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use jobwatch_core::JobPosting;

use crate::error::TrackerError;
use crate::record::{SeenJobRecord, SeenJobSet};
use crate::snapshot::SnapshotStore;

/// Tracked jobs are forgotten once their posting is older than this.
pub const RETENTION_WINDOW_HOURS: i64 = 48;

/// Result of one [`JobTracker::process`] call.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub total_jobs: usize,
    pub new_jobs: usize,
    pub already_seen: usize,
    /// New jobs, in input order.
    pub jobs: Vec<JobPosting>,
    /// Entries evicted by the cleanup pass that preceded filtering.
    pub removed: usize,
    /// False when the final snapshot write failed; the in-memory set is
    /// still up to date but a restart would forget this run's marks.
    pub persisted: bool,
}

/// A tracked entry together with its id, as reported by [`JobTracker::stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedJob {
    pub id: String,
    #[serde(flatten)]
    pub record: SeenJobRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerStats {
    pub total_tracked: usize,
    pub oldest_job: Option<TrackedJob>,
    pub newest_job: Option<TrackedJob>,
}

/// Remembers which jobs were already reported and forgets them after the
/// retention window.
///
/// The seen set is loaded once in [`JobTracker::new`] and written back in
/// full after each mutation. Runs against the same store must not overlap.
pub struct JobTracker {
    store: Box<dyn SnapshotStore>,
    seen: SeenJobSet,
}

impl JobTracker {
    /// Load state from `store`. A missing or unreadable snapshot starts an
    /// empty tracker; this never fails.
    pub fn new(store: Box<dyn SnapshotStore>) -> Self {
        let seen = match store.load() {
            Ok(Some(seen)) => {
                info!(location = %store.describe(), tracked = seen.len(), "loaded seen jobs");
                seen
            }
            Ok(None) => {
                info!(location = %store.describe(), "no seen-jobs snapshot yet, starting empty");
                SeenJobSet::new()
            }
            Err(e) => {
                warn!(location = %store.describe(), error = %e, "failed to load seen jobs, starting empty");
                SeenJobSet::new()
            }
        };
        Self { store, seen }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn get(&self, job_id: &str) -> Option<&SeenJobRecord> {
        self.seen.get(job_id)
    }

    pub fn has_seen(&self, job_id: &str) -> bool {
        self.seen.contains_key(job_id)
    }

    /// Record `job` under `job_id`, replacing any earlier entry.
    ///
    /// Does not persist; callers batch marks and save once.
    pub fn mark_seen(&mut self, job_id: &str, job: &JobPosting) {
        let record = SeenJobRecord::from_posting(job, Utc::now());
        self.seen.insert(job_id.to_string(), record);
    }

    /// Drop entries whose posting is older than the retention window.
    /// Persists only when something was removed.
    pub fn cleanup(&mut self) -> usize {
        self.cleanup_at(Utc::now())
    }

    /// [`cleanup`](Self::cleanup) against an explicit clock reading.
    pub fn cleanup_at(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::hours(RETENTION_WINDOW_HOURS);
        let before = self.seen.len();
        self.seen.retain(|_, record| record.posted_at >= cutoff);
        let removed = before - self.seen.len();

        if removed > 0 {
            info!(
                removed,
                window_hours = RETENTION_WINDOW_HOURS,
                "cleaned up old jobs"
            );
            self.persist();
        }
        removed
    }

    /// Jobs not yet in the seen set, in input order. Does not mutate.
    pub fn filter_new<'a>(&self, jobs: &'a [JobPosting]) -> Vec<&'a JobPosting> {
        jobs.iter().filter(|job| !self.has_seen(&job.id)).collect()
    }

    /// Jobs posted within `window_hours` of now, in input order.
    ///
    /// Independent of the seen set; this is the optional recency gate, not
    /// the retention window.
    pub fn filter_recent(jobs: &[JobPosting], window_hours: i64) -> Vec<&JobPosting> {
        Self::filter_recent_at(jobs, window_hours, Utc::now())
    }

    pub fn filter_recent_at(
        jobs: &[JobPosting],
        window_hours: i64,
        now: DateTime<Utc>,
    ) -> Vec<&JobPosting> {
        let cutoff = now - Duration::hours(window_hours);
        jobs.iter().filter(|job| job.posted_at >= cutoff).collect()
    }

    /// Clean up, keep the unseen jobs, mark them, and persist once.
    ///
    /// Every returned job is seen afterwards. A job repeated inside `jobs`
    /// is returned once.
    pub fn process(&mut self, jobs: Vec<JobPosting>) -> ProcessOutcome {
        let removed = self.cleanup();
        let total_jobs = jobs.len();

        let mut fresh = Vec::new();
        for job in jobs {
            if self.has_seen(&job.id) {
                continue;
            }
            self.mark_seen(&job.id, &job);
            fresh.push(job);
        }

        let persisted = self.persist();
        debug!(total_jobs, new_jobs = fresh.len(), tracked = self.seen.len(), "processed batch");

        ProcessOutcome {
            total_jobs,
            new_jobs: fresh.len(),
            already_seen: total_jobs - fresh.len(),
            jobs: fresh,
            removed,
            persisted,
        }
    }

    pub fn stats(&self) -> TrackerStats {
        let mut oldest: Option<(&String, &SeenJobRecord)> = None;
        let mut newest: Option<(&String, &SeenJobRecord)> = None;

        // Strict comparisons: on ties the first entry encountered wins.
        for (id, record) in &self.seen {
            if oldest.map_or(true, |(_, o)| record.posted_at < o.posted_at) {
                oldest = Some((id, record));
            }
            if newest.map_or(true, |(_, n)| record.posted_at > n.posted_at) {
                newest = Some((id, record));
            }
        }

        let to_tracked = |(id, record): (&String, &SeenJobRecord)| TrackedJob {
            id: id.clone(),
            record: record.clone(),
        };

        TrackerStats {
            total_tracked: self.seen.len(),
            oldest_job: oldest.map(to_tracked),
            newest_job: newest.map(to_tracked),
        }
    }

    /// Write the seen set, surfacing failures to the caller.
    pub fn save(&self) -> Result<(), TrackerError> {
        self.store.save(&self.seen)?;
        Ok(())
    }

    /// Write the seen set, logging failures. Returns whether it reached the store.
    fn persist(&self) -> bool {
        match self.save() {
            Ok(()) => true,
            Err(e) => {
                warn!(location = %self.store.describe(), error = %e, "failed to save seen jobs");
                false
            }
        }
    }
}
