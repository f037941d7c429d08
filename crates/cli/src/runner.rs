//! One end-to-end cycle: fetch, dedup, recency gate, qualify, deliver.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use jobwatch_core::{Config, JobPosting};
use jobwatch_ingest::{IngestionPipeline, LocationFilter, OAuthClient, UpworkClient};
use jobwatch_llm::Qualifier;
use jobwatch_notify::{Notifier, SlackNotifier};
use jobwatch_tracker::{JobTracker, JsonFileStore, MemoryStore, SnapshotStore, RETENTION_WINDOW_HOURS};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("marketplace authorization required, run `jobwatch auth`")]
    NeedsReauth,
}

/// Counters for one run, logged at the end and returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub total_fetched: u64,
    pub unique_jobs: usize,
    pub failed_keywords: usize,
    pub new_jobs: usize,
    pub already_seen: usize,
    pub old_jobs_filtered: usize,
    pub qualified: usize,
    pub rejected: usize,
    pub notified: usize,
    pub persisted: bool,
    pub tracked: usize,
    /// A keyword failed because the marketplace tokens are unusable. Jobs
    /// from the other keywords were still qualified and delivered.
    pub needs_reauth: bool,
}

impl RunSummary {
    /// Turn a reauthorization signal into an error once delivery is done.
    pub fn check_auth(&self) -> Result<(), RunError> {
        if self.needs_reauth {
            Err(RunError::NeedsReauth)
        } else {
            Ok(())
        }
    }
}

pub struct Runner {
    pipeline: IngestionPipeline,
    tracker: JobTracker,
    qualifier: Qualifier,
    notifier: Option<Box<dyn Notifier>>,
    recency_hours: Option<i64>,
}

impl Runner {
    pub fn new(
        pipeline: IngestionPipeline,
        tracker: JobTracker,
        qualifier: Qualifier,
        notifier: Option<Box<dyn Notifier>>,
        recency_hours: Option<i64>,
    ) -> Self {
        Self {
            pipeline,
            tracker,
            qualifier,
            notifier,
            recency_hours,
        }
    }

    /// Wire the real marketplace, snapshot file, qualifier and Slack.
    ///
    /// A dry run starts from the on-disk snapshot but keeps every write in
    /// memory and delivers nothing.
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self> {
        let auth = Arc::new(OAuthClient::from_config(&config.marketplace));
        let client = Arc::new(UpworkClient::from_config(&config.marketplace, auth));
        let filter = config.search.filter_countries.clone().map(LocationFilter::new);
        let pipeline =
            IngestionPipeline::new(client, config.search.keywords.clone()).with_location_filter(filter);

        let file_store = JsonFileStore::new(&config.tracker.snapshot_path);
        let store: Box<dyn SnapshotStore> = if dry_run {
            let seeded = match file_store.load() {
                Ok(jobs) => jobs.unwrap_or_default(),
                Err(e) => {
                    warn!(
                        path = %config.tracker.snapshot_path.display(),
                        error = %e,
                        "could not read snapshot, dry run starts empty"
                    );
                    Default::default()
                }
            };
            Box::new(MemoryStore::with_jobs(seeded))
        } else {
            Box::new(file_store)
        };

        let notifier = if dry_run {
            None
        } else {
            SlackNotifier::from_config(&config.slack)
                .context("invalid Slack configuration")?
                .map(|n| Box::new(n) as Box<dyn Notifier>)
        };

        Ok(Self::new(
            pipeline,
            JobTracker::new(store),
            Qualifier::from_config(&config.qualifier),
            notifier,
            config.search.recency_hours,
        ))
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Execute one cycle inside a `run` span carrying a fresh run id.
    ///
    /// Keywords that fail are skipped. When one failed for lack of usable
    /// tokens the run still finishes and sets [`RunSummary::needs_reauth`].
    pub async fn run_once(&mut self) -> RunSummary {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.execute(run_id).instrument(span).await
    }

    async fn execute(&mut self, run_id: Uuid) -> RunSummary {
        info!("run started");
        let report = self.pipeline.ingest(&mut self.tracker).await;
        let needs_reauth = report.needs_reauth();
        if needs_reauth {
            warn!("marketplace rejected our tokens for some keywords, continuing with the rest");
        }
        if !report.outcome.persisted {
            warn!("seen-job state was not saved; these jobs may be reported again after a restart");
        }

        let new_jobs = report.outcome.new_jobs;
        let (fresh, old_jobs_filtered) = self.recency_gate(report.outcome.jobs.clone());
        if old_jobs_filtered > 0 {
            info!(old_jobs_filtered, "older jobs filtered (not recently posted)");
        }

        let qualification = self.qualifier.qualify_jobs(fresh).await;

        let notified = match &self.notifier {
            Some(notifier) => match notifier.send(&qualification.qualified).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(channel = notifier.channel_name(), error = %e, "notification failed");
                    0
                }
            },
            None => 0,
        };

        let summary = RunSummary {
            run_id,
            total_fetched: report.total_fetched,
            unique_jobs: report.unique_jobs,
            failed_keywords: report.failed_keywords(),
            new_jobs,
            already_seen: report.outcome.already_seen,
            old_jobs_filtered,
            qualified: qualification.stats.qualified,
            rejected: qualification.stats.rejected,
            notified,
            persisted: report.outcome.persisted,
            tracked: self.tracker.len(),
            needs_reauth,
        };

        info!(
            total_fetched = summary.total_fetched,
            unique_jobs = summary.unique_jobs,
            new_jobs = summary.new_jobs,
            already_seen = summary.already_seen,
            qualified = summary.qualified,
            rejected = summary.rejected,
            notified = summary.notified,
            tracked = summary.tracked,
            "run finished"
        );
        if let Some(oldest) = self.tracker.stats().oldest_job {
            info!(
                oldest_id = %oldest.id,
                oldest_posted_at = %oldest.record.posted_at,
                retention_hours = RETENTION_WINDOW_HOURS,
                "tracking window"
            );
        }

        summary
    }

    /// Drop new jobs older than `RECENCY_HOURS`. They stay marked as seen.
    fn recency_gate(&self, jobs: Vec<JobPosting>) -> (Vec<JobPosting>, usize) {
        match self.recency_hours {
            Some(hours) => {
                let total = jobs.len();
                let recent: Vec<JobPosting> =
                    JobTracker::filter_recent(&jobs, hours).into_iter().cloned().collect();
                let filtered = total - recent.len();
                (recent, filtered)
            }
            None => (jobs, 0),
        }
    }
}
