//! End-to-end tracker behaviour against a real snapshot file.

use chrono::{Duration, Utc};

use jobwatch_core::JobPosting;
use jobwatch_tracker::{JobTracker, JsonFileStore, SeenJobRecord, SeenJobSet, SnapshotStore};

fn job(id: &str, hours_ago: i64) -> JobPosting {
    JobPosting::new(id, format!("Shopify job {id}"), Utc::now() - Duration::hours(hours_ago))
}

fn tracker_at(path: &std::path::Path) -> JobTracker {
    JobTracker::new(Box::new(JsonFileStore::new(path)))
}

#[test]
fn first_run_reports_and_remembers_job() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("seen-jobs.json");
    let mut tracker = tracker_at(&path);

    let posting = job("1", 0);
    let outcome = tracker.process(vec![posting.clone()]);

    assert_eq!(outcome.total_jobs, 1);
    assert_eq!(outcome.new_jobs, 1);
    assert_eq!(outcome.already_seen, 0);
    assert_eq!(outcome.jobs, vec![posting]);
    assert!(tracker.has_seen("1"));

    // A fresh process sees the same state after reloading the file.
    let reloaded = tracker_at(&path);
    assert!(reloaded.has_seen("1"));
}

#[test]
fn cleanup_rewrites_snapshot_without_stale_entry() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("seen-jobs.json");

    let now = Utc::now();
    let mut seeded = SeenJobSet::new();
    seeded.insert(
        "1".to_string(),
        SeenJobRecord {
            seen_at: now - Duration::hours(49),
            posted_at: now - Duration::hours(49),
            title: "Stale".to_string(),
            url: "https://www.upwork.com/jobs/~1".to_string(),
        },
    );
    JsonFileStore::new(&path).save(&seeded).unwrap();

    let mut tracker = tracker_at(&path);
    assert!(tracker.has_seen("1"));
    assert_eq!(tracker.cleanup(), 1);

    let on_disk = JsonFileStore::new(&path).load().unwrap().unwrap();
    assert!(!on_disk.contains_key("1"));
}

#[test]
fn mixed_batch_only_returns_new_job() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("seen-jobs.json");
    let mut tracker = tracker_at(&path);
    tracker.process(vec![job("B", 1)]);

    let outcome = tracker.process(vec![job("A", 0), job("B", 1)]);
    assert_eq!(outcome.new_jobs, 1);
    assert_eq!(outcome.already_seen, 1);
    let ids: Vec<&str> = outcome.jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["A"]);
}

#[test]
fn repeat_batch_after_restart_is_not_renotified() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("seen-jobs.json");
    let batch = vec![job("10", 1), job("11", 5), job("12", 30)];

    assert_eq!(tracker_at(&path).process(batch.clone()).new_jobs, 3);
    let second = tracker_at(&path).process(batch);
    assert_eq!(second.new_jobs, 0);
    assert_eq!(second.already_seen, 3);
}

#[test]
fn corrupt_snapshot_starts_empty_and_recovers() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("seen-jobs.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let mut tracker = tracker_at(&path);
    assert!(tracker.is_empty());

    let outcome = tracker.process(vec![job("9", 1)]);
    assert!(outcome.persisted);
    assert!(tracker_at(&path).has_seen("9"));
}

#[test]
fn retention_boundary() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("seen-jobs.json");
    let mut tracker = tracker_at(&path);
    tracker.mark_seen("49h", &job("49h", 49));
    tracker.mark_seen("47h", &job("47h", 47));

    assert_eq!(tracker.cleanup(), 1);
    assert!(!tracker.has_seen("49h"));
    assert!(tracker.has_seen("47h"));
}
