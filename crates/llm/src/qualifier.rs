//! Tier classification of new jobs through an LLM.
//!
//! The qualifier never blocks a job because of its own failure: a timeout,
//! transport error, or unparseable reply turns into [`Tier::Unvetted`] and
//! the job is let through.

use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use jobwatch_core::config::QualifierConfig;
use jobwatch_core::{JobPosting, QualifiedJob, Tier};

use crate::prompts::{self, DEFAULT_SYSTEM_PROMPT};
use crate::provider::{LlmError, LlmProvider, Message};
use crate::providers::create_provider;

#[derive(Debug, thiserror::Error)]
pub enum QualifyError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),
}

/// Aggregate counts for one qualification batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualificationStats {
    pub total: usize,
    pub qualified: usize,
    pub rejected: usize,
    pub tier1: usize,
    pub tier2: usize,
    pub tier3: usize,
    pub unvetted: usize,
    pub time_seconds: f64,
    pub cost_estimate: f64,
}

impl QualificationStats {
    fn tally(results: &[QualifiedJob]) -> Self {
        let count = |tier: Tier| results.iter().filter(|r| r.tier == tier).count();
        let qualified = results.iter().filter(|r| r.tier.is_qualified()).count();
        Self {
            total: results.len(),
            qualified,
            rejected: results.len() - qualified,
            tier1: count(Tier::Ideal),
            tier2: count(Tier::Upsell),
            tier3: count(Tier::Reject),
            unvetted: count(Tier::Unvetted),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QualificationReport {
    pub qualified: Vec<QualifiedJob>,
    pub rejected: Vec<QualifiedJob>,
    pub stats: QualificationStats,
}

/// Reply shape the system prompt asks for.
#[derive(Debug, Deserialize)]
struct Verdict {
    tier: Option<i64>,
    reasoning: Option<String>,
}

pub struct Qualifier {
    provider: Option<Box<dyn LlmProvider>>,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    cost_per_job: f64,
}

impl Qualifier {
    pub fn new(provider: Box<dyn LlmProvider>, config: &QualifierConfig) -> Self {
        Self {
            provider: Some(provider),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_millis(config.timeout_ms),
            cost_per_job: config.cost_per_job,
        }
    }

    /// Qualifier that lets every job through unvetted.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.3,
            max_tokens: 150,
            timeout: Duration::from_millis(5000),
            cost_per_job: 0.0,
        }
    }

    /// Build from config. Missing credentials or an unknown provider leave
    /// the qualifier disabled rather than failing the run.
    pub fn from_config(config: &QualifierConfig) -> Self {
        if !config.is_configured() {
            info!(provider = %config.provider, "qualifier not configured, jobs pass unvetted");
            return Self::disabled();
        }

        let provider = match create_provider(config) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(error = %e, "could not create LLM provider, qualifier disabled");
                return Self::disabled();
            }
        };

        let mut qualifier = Self::new(provider, config);
        if let Some(path) = &config.prompt_path {
            match prompts::load_system_prompt(path) {
                Ok(prompt) => qualifier.system_prompt = prompt,
                Err(e) => warn!(error = %e, "using built-in qualifier prompt"),
            }
        }
        qualifier
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn model(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.model())
    }

    /// Classify one job. Never fails: errors become an unvetted verdict.
    pub async fn qualify_job(&self, job: JobPosting) -> QualifiedJob {
        let Some(provider) = self.provider.as_deref() else {
            return QualifiedJob {
                job,
                tier: Tier::Unvetted,
                reasoning: Some("qualification disabled - allowing through".to_string()),
            };
        };

        match self.classify(provider, &job).await {
            Ok((tier, reasoning)) => QualifiedJob {
                job,
                tier,
                reasoning: Some(reasoning),
            },
            Err(e) => {
                warn!(job_id = %job.id, title = %job.title, error = %e, "qualification failed, failing open");
                QualifiedJob {
                    job,
                    tier: Tier::Unvetted,
                    reasoning: Some(format!("qualifier unavailable ({e}) - allowing through unvetted")),
                }
            }
        }
    }

    async fn classify(&self, provider: &dyn LlmProvider, job: &JobPosting) -> Result<(Tier, String), QualifyError> {
        let messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(prompts::user_prompt(job)),
        ];
        let call = provider.complete(messages, self.temperature, self.max_tokens);
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| QualifyError::Timeout(self.timeout.as_millis() as u64))??;
        parse_verdict(&response)
    }

    /// Classify a batch concurrently and split it into qualified/rejected.
    pub async fn qualify_jobs(&self, jobs: Vec<JobPosting>) -> QualificationReport {
        if !self.is_enabled() {
            let qualified: Vec<QualifiedJob> = jobs.into_iter().map(QualifiedJob::unvetted).collect();
            if !qualified.is_empty() {
                info!(jobs = qualified.len(), "qualification disabled, all jobs allowed through");
            }
            let stats = QualificationStats::tally(&qualified);
            return QualificationReport {
                qualified,
                rejected: Vec::new(),
                stats,
            };
        }
        if jobs.is_empty() {
            return QualificationReport::default();
        }

        info!(jobs = jobs.len(), model = self.model().unwrap_or_default(), "qualifying jobs");
        let started = Instant::now();
        let results = join_all(jobs.into_iter().map(|job| self.qualify_job(job))).await;

        let mut stats = QualificationStats::tally(&results);
        stats.time_seconds = started.elapsed().as_secs_f64();
        stats.cost_estimate = results.len() as f64 * self.cost_per_job;

        let (qualified, rejected): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.tier.is_qualified());

        info!(
            tier1 = stats.tier1,
            tier2 = stats.tier2,
            tier3 = stats.tier3,
            unvetted = stats.unvetted,
            seconds = stats.time_seconds,
            cost = stats.cost_estimate,
            "qualification complete"
        );

        QualificationReport {
            qualified,
            rejected,
            stats,
        }
    }
}

fn parse_verdict(response: &str) -> Result<(Tier, String), QualifyError> {
    let verdict: Verdict = serde_json::from_str(extract_json(response))
        .map_err(|e| QualifyError::InvalidResponse(e.to_string()))?;
    let tier = verdict
        .tier
        .ok_or_else(|| QualifyError::InvalidResponse("missing tier".into()))?;
    let tier = Tier::from_classifier(tier).map_err(|e| QualifyError::InvalidResponse(e.to_string()))?;
    let reasoning = verdict
        .reasoning
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "No reasoning provided".to_string());
    Ok((tier, reasoning))
}

/// Pull the JSON object out of a reply that may be fenced or wrapped in prose.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_tick = &trimmed[start + 3..];
        let content_start = after_tick.find('\n').map_or(0, |n| n + 1);
        if let Some(end) = after_tick[content_start..].find("```") {
            return after_tick[content_start..content_start + end].trim();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return &trimmed[start..=end];
        }
    }

    trimmed
}
