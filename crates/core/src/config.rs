use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load the env file named by `ENV_FILE`, or `.env` (silently ignores if missing).
pub fn load_dotenv() {
    match env::var("ENV_FILE") {
        Ok(path) if !path.is_empty() => {
            dotenvy::from_path(path).ok();
        }
        _ => {
            dotenvy::dotenv().ok();
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Split a comma-separated list, trimming items and dropping empties.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub marketplace: MarketplaceConfig,
    pub search: SearchConfig,
    pub tracker: TrackerConfig,
    pub qualifier: QualifierConfig,
    pub slack: SlackConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `JOBWATCH_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("JOBWATCH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            marketplace: MarketplaceConfig::from_env_profiled(p),
            search: SearchConfig::from_env_profiled(p),
            tracker: TrackerConfig::from_env_profiled(p),
            qualifier: QualifierConfig::from_env_profiled(p),
            slack: SlackConfig::from_env_profiled(p),
            scheduler: SchedulerConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  marketplace: credentials={}, tokens={}",
            self.marketplace.has_credentials(),
            self.marketplace.has_tokens()
        );
        tracing::info!("  search:      keywords={}", self.search.keywords.join(", "));
        if let Some(countries) = &self.search.filter_countries {
            tracing::info!("  search:      countries={}", countries.join(", "));
        }
        tracing::info!("  tracker:     snapshot={}", self.tracker.snapshot_path.display());
        tracing::info!(
            "  qualifier:   provider={}, enabled={}",
            self.qualifier.provider,
            self.qualifier.is_configured()
        );
        tracing::info!("  slack:       enabled={}", self.slack.is_configured());
        tracing::info!("  scheduler:   cron={}", self.scheduler.cron);
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "marketplace": {
                "graphql_url": self.marketplace.graphql_url,
                "token_url": self.marketplace.token_url,
                "redirect_uri": self.marketplace.redirect_uri,
                "env_file": self.marketplace.env_file,
                "credentials": self.marketplace.has_credentials(),
                "tokens": self.marketplace.has_tokens(),
            },
            "search": {
                "keywords": self.search.keywords,
                "filter_countries": self.search.filter_countries,
                "recency_hours": self.search.recency_hours,
            },
            "tracker": { "snapshot_path": self.tracker.snapshot_path },
            "qualifier": {
                "provider": self.qualifier.provider,
                "model": self.qualifier.model(),
                "timeout_ms": self.qualifier.timeout_ms,
                "configured": self.qualifier.is_configured(),
            },
            "slack": {
                "configured": self.slack.is_configured(),
                "max_jobs_per_message": self.slack.max_jobs_per_message,
            },
            "scheduler": { "cron": self.scheduler.cron },
        })
    }
}

// ── Marketplace API ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub redirect_uri: String,
    pub graphql_url: String,
    pub token_url: String,
    pub authorize_url: String,
    /// Env file rewritten when tokens are refreshed.
    pub env_file: PathBuf,
}

impl MarketplaceConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            client_id: profiled_env_opt(p, "UPWORK_API_KEY"),
            client_secret: profiled_env_opt(p, "UPWORK_API_SECRET"),
            access_token: profiled_env_opt(p, "UPWORK_ACCESS_TOKEN"),
            refresh_token: profiled_env_opt(p, "UPWORK_REFRESH_TOKEN"),
            redirect_uri: profiled_env_or(p, "UPWORK_REDIRECT_URI", "http://localhost:3000/callback"),
            graphql_url: profiled_env_or(p, "UPWORK_GRAPHQL_URL", "https://api.upwork.com/graphql"),
            token_url: profiled_env_or(
                p,
                "UPWORK_TOKEN_URL",
                "https://www.upwork.com/api/v3/oauth2/token",
            ),
            authorize_url: profiled_env_or(
                p,
                "UPWORK_AUTHORIZE_URL",
                "https://www.upwork.com/ab/account-security/oauth2/authorize",
            ),
            env_file: PathBuf::from(profiled_env_or(p, "ENV_FILE", ".env")),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    pub fn has_tokens(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }
}

// ── Search ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub keywords: Vec<String>,
    /// Client-country allow-list; `None` disables location filtering.
    pub filter_countries: Option<Vec<String>>,
    /// Optional secondary recency gate applied to new jobs.
    pub recency_hours: Option<i64>,
}

impl SearchConfig {
    fn from_env_profiled(p: &str) -> Self {
        // SEARCH_KEYWORDS (comma separated) wins over the legacy SEARCH_KEYWORD.
        let keywords = profiled_env_opt(p, "SEARCH_KEYWORDS")
            .map(|raw| split_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| vec![profiled_env_or(p, "SEARCH_KEYWORD", "Shopify")]);
        Self {
            keywords,
            filter_countries: profiled_env_opt(p, "FILTER_COUNTRIES")
                .map(|raw| split_list(&raw))
                .filter(|list| !list.is_empty()),
            recency_hours: profiled_env_opt(p, "RECENCY_HOURS").and_then(|v| v.parse().ok()),
        }
    }
}

// ── Tracker ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub snapshot_path: PathBuf,
}

impl TrackerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            snapshot_path: PathBuf::from(profiled_env_or(p, "SEEN_JOBS_PATH", "seen-jobs.json")),
        }
    }
}

// ── Qualifier (LLM) ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualifierConfig {
    /// "openai" or "ollama"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub ollama_url: String,
    pub ollama_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    /// Replaces the built-in system prompt when set.
    pub prompt_path: Option<PathBuf>,
    /// Approximate spend per classified job, in dollars.
    pub cost_per_job: f64,
}

impl QualifierConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "openai"),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_model: profiled_env_or(p, "OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            ollama_url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            ollama_model: profiled_env_or(p, "OLLAMA_MODEL", "llama3.2"),
            temperature: profiled_env_or(p, "LLM_TEMPERATURE", "0.3")
                .parse()
                .unwrap_or(0.3),
            max_tokens: profiled_env_u32(p, "LLM_MAX_TOKENS", 150),
            timeout_ms: profiled_env_u64(p, "QUALIFIER_TIMEOUT_MS", 5000),
            prompt_path: profiled_env_opt(p, "QUALIFIER_PROMPT_PATH").map(PathBuf::from),
            cost_per_job: profiled_env_or(p, "QUALIFIER_COST_PER_JOB", "0.001")
                .parse()
                .unwrap_or(0.001),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }

    pub fn model(&self) -> &str {
        match self.provider.as_str() {
            "ollama" => &self.ollama_model,
            _ => &self.openai_model,
        }
    }
}

// ── Slack ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: Option<String>,
    pub max_jobs_per_message: usize,
    pub header_template: Option<String>,
}

impl SlackConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            webhook_url: profiled_env_opt(p, "SLACK_WEBHOOK_URL"),
            max_jobs_per_message: profiled_env_u32(p, "SLACK_MAX_JOBS", 5) as usize,
            header_template: profiled_env_opt(p, "SLACK_HEADER_TEMPLATE"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub cron: String,
}

impl SchedulerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            cron: profiled_env_or(p, "CRON_SCHEDULE", "0 */6 * * *"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(" Shopify , CRO,, Klaviyo "),
            vec!["Shopify", "CRO", "Klaviyo"]
        );
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn profile_prefix_wins() {
        env::set_var("JWTEST_SEARCH_KEYWORDS", "Alpha,Beta");
        env::set_var("JWTEST_CRON_SCHEDULE", "*/15 * * * *");
        let config = Config::for_profile("jwtest");
        assert_eq!(config.profile, "JWTEST");
        assert_eq!(config.search.keywords, vec!["Alpha", "Beta"]);
        assert_eq!(config.scheduler.cron, "*/15 * * * *");
        env::remove_var("JWTEST_SEARCH_KEYWORDS");
        env::remove_var("JWTEST_CRON_SCHEDULE");
    }

    #[test]
    fn legacy_single_keyword() {
        env::set_var("JWLEGACY_SEARCH_KEYWORD", "Webflow");
        let config = Config::for_profile("JWLEGACY");
        if env_opt("SEARCH_KEYWORDS").is_none() {
            assert_eq!(config.search.keywords, vec!["Webflow"]);
        }
        env::remove_var("JWLEGACY_SEARCH_KEYWORD");
    }

    #[test]
    fn qualifier_configured_by_provider() {
        let mut q = QualifierConfig::from_env_profiled("JWQUAL_NONE");
        q.provider = "openai".into();
        q.openai_api_key = None;
        assert!(!q.is_configured());
        q.openai_api_key = Some("sk-test".into());
        assert!(q.is_configured());
        q.provider = "ollama".into();
        assert!(q.is_configured());
        assert_eq!(q.model(), q.ollama_model);
        q.provider = "mystery".into();
        assert!(!q.is_configured());
    }

    #[test]
    fn redacted_summary_has_no_secrets() {
        let mut config = Config::for_profile("JWREDACT");
        config.marketplace.client_secret = Some("super-secret".into());
        config.qualifier.openai_api_key = Some("sk-secret".into());
        let rendered = config.redacted_summary().to_string();
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("JWREDACT"));
    }
}
