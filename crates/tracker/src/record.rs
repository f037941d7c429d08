use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jobwatch_core::JobPosting;

/// Persisted seen set, keyed by job id.
///
/// A `BTreeMap` keeps the pretty-printed snapshot stable between runs.
pub type SeenJobSet = BTreeMap<String, SeenJobRecord>;

/// Tracking metadata for one job the watcher has already reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenJobRecord {
    pub seen_at: DateTime<Utc>,
    /// Source creation time; drives retention.
    pub posted_at: DateTime<Utc>,
    pub title: String,
    pub url: String,
}

impl SeenJobRecord {
    pub fn from_posting(job: &JobPosting, seen_at: DateTime<Utc>) -> Self {
        Self {
            seen_at,
            posted_at: job.posted_at,
            title: job.title.clone(),
            url: job.url(),
        }
    }
}
