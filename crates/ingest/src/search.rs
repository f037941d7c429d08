use async_trait::async_trait;

use jobwatch_core::JobPosting;

use crate::error::SearchError;

/// One keyword's worth of results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Total matches reported by the marketplace (may exceed `jobs.len()`).
    pub total_count: u64,
    pub jobs: Vec<JobPosting>,
}

/// Source of job postings for a search term.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<SearchPage, SearchError>;

    /// Human-readable name for log lines (e.g. "upwork").
    fn name(&self) -> &str;
}
