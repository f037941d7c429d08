//! Multi-keyword fan-out, merge, and hand-off to the tracker.
//!
//! Every keyword is searched concurrently and the batch waits for all of
//! them. A failing keyword contributes nothing; the others still count.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use jobwatch_core::JobPosting;
use jobwatch_tracker::{JobTracker, ProcessOutcome};

use crate::search::{SearchPage, SearchProvider};

/// Client-country allow-list. Jobs without a country never pass.
#[derive(Debug, Clone)]
pub struct LocationFilter {
    countries: Vec<String>,
}

impl LocationFilter {
    pub fn new(countries: Vec<String>) -> Self {
        Self { countries }
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn allows(&self, job: &JobPosting) -> bool {
        job.client_country()
            .is_some_and(|country| self.countries.iter().any(|c| c == country))
    }
}

/// Per-keyword outcome of a fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct KeywordResult {
    pub keyword: String,
    /// Jobs kept for this keyword after location filtering.
    pub count: usize,
    pub error: Option<String>,
    /// The failure means the marketplace tokens are gone or unusable.
    pub needs_reauth: bool,
}

/// Merged, deduplicated, newest-first result of one fan-out.
#[derive(Debug, Clone)]
pub struct IngestBatch {
    /// Sum of the marketplace's reported totals across keywords.
    pub total_fetched: u64,
    pub keywords: Vec<KeywordResult>,
    pub jobs: Vec<JobPosting>,
}

impl IngestBatch {
    pub fn needs_reauth(&self) -> bool {
        self.keywords.iter().any(|k| k.needs_reauth)
    }
}

/// What [`IngestionPipeline::ingest`] hands back to the run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub total_fetched: u64,
    pub unique_jobs: usize,
    pub keywords: Vec<KeywordResult>,
    pub outcome: ProcessOutcome,
}

impl IngestReport {
    pub fn needs_reauth(&self) -> bool {
        self.keywords.iter().any(|k| k.needs_reauth)
    }

    pub fn failed_keywords(&self) -> usize {
        self.keywords.iter().filter(|k| k.error.is_some()).count()
    }
}

pub struct IngestionPipeline {
    provider: Arc<dyn SearchProvider>,
    keywords: Vec<String>,
    location_filter: Option<LocationFilter>,
}

impl IngestionPipeline {
    pub fn new(provider: Arc<dyn SearchProvider>, keywords: Vec<String>) -> Self {
        Self {
            provider,
            keywords,
            location_filter: None,
        }
    }

    pub fn with_location_filter(mut self, filter: Option<LocationFilter>) -> Self {
        self.location_filter = filter;
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn location_filter(&self) -> Option<&LocationFilter> {
        self.location_filter.as_ref()
    }

    /// Search every keyword concurrently and merge the results.
    pub async fn fetch(&self) -> IngestBatch {
        info!(
            provider = self.provider.name(),
            keywords = self.keywords.len(),
            "searching for jobs"
        );

        let searches = self
            .keywords
            .iter()
            .map(|keyword| async move { (keyword, self.provider.search(keyword).await) });
        let settled = join_all(searches).await;

        let mut total_fetched: u64 = 0;
        let mut keywords = Vec::with_capacity(settled.len());
        let mut pages = Vec::with_capacity(settled.len());

        for (keyword, result) in settled {
            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    warn!(keyword = %keyword, error = %e, "keyword search failed, skipping");
                    keywords.push(KeywordResult {
                        keyword: keyword.clone(),
                        count: 0,
                        error: Some(e.to_string()),
                        needs_reauth: e.needs_reauth(),
                    });
                    continue;
                }
            };

            let SearchPage { total_count, jobs } = page;
            let jobs = self.apply_location_filter(jobs);
            info!(keyword = %keyword, jobs = jobs.len(), "keyword search finished");

            total_fetched += total_count;
            keywords.push(KeywordResult {
                keyword: keyword.clone(),
                count: jobs.len(),
                error: None,
                needs_reauth: false,
            });
            pages.push(jobs);
        }

        IngestBatch {
            total_fetched,
            keywords,
            jobs: merge_results(pages),
        }
    }

    /// Fetch, then let `tracker` keep only the jobs it has not seen.
    pub async fn ingest(&self, tracker: &mut JobTracker) -> IngestReport {
        let batch = self.fetch().await;
        let unique_jobs = batch.jobs.len();
        let outcome = tracker.process(batch.jobs);

        info!(
            unique_jobs,
            new_jobs = outcome.new_jobs,
            already_seen = outcome.already_seen,
            "ingested batch"
        );

        IngestReport {
            total_fetched: batch.total_fetched,
            unique_jobs,
            keywords: batch.keywords,
            outcome,
        }
    }

    fn apply_location_filter(&self, jobs: Vec<JobPosting>) -> Vec<JobPosting> {
        match &self.location_filter {
            Some(filter) => jobs.into_iter().filter(|job| filter.allows(job)).collect(),
            None => jobs,
        }
    }
}

/// Merge per-keyword result sets: first occurrence of an id wins, then
/// newest first. Equal timestamps are ordered by id so the output is stable.
pub fn merge_results(pages: Vec<Vec<JobPosting>>) -> Vec<JobPosting> {
    let mut by_id: HashMap<String, JobPosting> = HashMap::new();
    for job in pages.into_iter().flatten() {
        by_id.entry(job.id.clone()).or_insert(job);
    }

    let mut merged: Vec<JobPosting> = by_id.into_values().collect();
    merged.sort_by(|a, b| b.posted_at.cmp(&a.posted_at).then_with(|| a.id.cmp(&b.id)));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use jobwatch_core::ClientInfo;
    use jobwatch_tracker::MemoryStore;

    use crate::error::{AuthError, SearchError};

    struct MockSearch {
        pages: HashMap<String, Vec<JobPosting>>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl SearchProvider for MockSearch {
        async fn search(&self, keyword: &str) -> Result<SearchPage, SearchError> {
            if self.failing.iter().any(|k| k == keyword) {
                return Err(SearchError::Graphql("boom".into()));
            }
            let jobs = self.pages.get(keyword).cloned().unwrap_or_default();
            Ok(SearchPage {
                total_count: jobs.len() as u64 + 10,
                jobs,
            })
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn job(id: &str, hours_ago: i64, country: Option<&str>) -> JobPosting {
        let mut job = JobPosting::new(id, format!("Job {id}"), Utc::now() - Duration::hours(hours_ago));
        job.client = country.map(|c| ClientInfo {
            country: Some(c.to_string()),
            ..ClientInfo::default()
        });
        job
    }

    fn ids(jobs: &[JobPosting]) -> Vec<&str> {
        jobs.iter().map(|j| j.id.as_str()).collect()
    }

    #[test]
    fn merge_dedups_first_wins() {
        let mut first = job("shared", 1, None);
        first.title = "from first keyword".into();
        let mut second = job("shared", 1, None);
        second.title = "from second keyword".into();

        let merged = merge_results(vec![vec![first, job("a", 2, None)], vec![second]]);
        assert_eq!(merged.len(), 2);
        let shared = merged.iter().find(|j| j.id == "shared").unwrap();
        assert_eq!(shared.title, "from first keyword");
    }

    #[test]
    fn merge_sorts_newest_first() {
        let merged = merge_results(vec![
            vec![job("old", 20, None), job("new", 1, None)],
            vec![job("mid", 5, None)],
        ]);
        assert_eq!(ids(&merged), vec!["new", "mid", "old"]);
        assert!(merged.windows(2).all(|w| w[0].posted_at >= w[1].posted_at));
    }

    #[test]
    fn merge_orders_ties_by_id() {
        let at = Utc::now();
        let merged = merge_results(vec![vec![
            JobPosting::new("b", "B", at),
            JobPosting::new("a", "A", at),
        ]]);
        assert_eq!(ids(&merged), vec!["a", "b"]);
    }

    #[test]
    fn location_filter_requires_country() {
        let filter = LocationFilter::new(vec!["United States".into(), "Canada".into()]);
        assert!(filter.allows(&job("1", 1, Some("Canada"))));
        assert!(!filter.allows(&job("2", 1, Some("France"))));
        assert!(!filter.allows(&job("3", 1, None)));
    }

    #[tokio::test]
    async fn fetch_survives_failing_keyword() {
        let provider = MockSearch {
            pages: HashMap::from([
                ("shopify".to_string(), vec![job("1", 3, None), job("2", 1, None)]),
                ("cro".to_string(), vec![job("2", 1, None), job("3", 2, None)]),
            ]),
            failing: vec!["klaviyo".to_string()],
        };
        let pipeline = IngestionPipeline::new(
            Arc::new(provider),
            vec!["shopify".into(), "klaviyo".into(), "cro".into()],
        );

        let batch = pipeline.fetch().await;
        assert_eq!(ids(&batch.jobs), vec!["2", "3", "1"]);
        assert_eq!(batch.total_fetched, 12 + 12);
        assert_eq!(batch.keywords.len(), 3);

        let failed = batch.keywords.iter().find(|k| k.keyword == "klaviyo").unwrap();
        assert_eq!(failed.count, 0);
        assert!(failed.error.is_some());
    }

    #[tokio::test]
    async fn missing_token_flags_reauth() {
        struct NoToken;

        #[async_trait]
        impl SearchProvider for NoToken {
            async fn search(&self, _keyword: &str) -> Result<SearchPage, SearchError> {
                Err(AuthError::MissingToken("access").into())
            }

            fn name(&self) -> &str {
                "no-token"
            }
        }

        let pipeline = IngestionPipeline::new(Arc::new(NoToken), vec!["shopify".into()]);
        let batch = pipeline.fetch().await;
        assert!(batch.jobs.is_empty());
        assert!(batch.needs_reauth());

        let ok = MockSearch {
            pages: HashMap::new(),
            failing: vec!["shopify".to_string()],
        };
        let batch = IngestionPipeline::new(Arc::new(ok), vec!["shopify".into()]).fetch().await;
        assert!(!batch.needs_reauth(), "plain GraphQL failures do not need re-auth");
    }

    #[tokio::test]
    async fn fetch_applies_location_filter_per_keyword() {
        let provider = MockSearch {
            pages: HashMap::from([(
                "shopify".to_string(),
                vec![
                    job("us", 1, Some("United States")),
                    job("fr", 1, Some("France")),
                    job("none", 1, None),
                ],
            )]),
            failing: vec![],
        };
        let pipeline = IngestionPipeline::new(Arc::new(provider), vec!["shopify".into()])
            .with_location_filter(Some(LocationFilter::new(vec!["United States".into()])));

        let batch = pipeline.fetch().await;
        assert_eq!(ids(&batch.jobs), vec!["us"]);
        assert_eq!(batch.keywords[0].count, 1);
    }

    #[tokio::test]
    async fn ingest_hands_batch_to_tracker() {
        let provider = Arc::new(MockSearch {
            pages: HashMap::from([("shopify".to_string(), vec![job("1", 1, None), job("2", 2, None)])]),
            failing: vec![],
        });
        let pipeline = IngestionPipeline::new(provider, vec!["shopify".into()]);
        let mut tracker = JobTracker::new(Box::new(MemoryStore::new()));

        let first = pipeline.ingest(&mut tracker).await;
        assert_eq!(first.unique_jobs, 2);
        assert_eq!(first.outcome.new_jobs, 2);

        let second = pipeline.ingest(&mut tracker).await;
        assert_eq!(second.outcome.new_jobs, 0);
        assert_eq!(second.outcome.already_seen, 2);
    }
}
