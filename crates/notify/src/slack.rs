//! Slack incoming-webhook notifier.
//!
//! One message per batch: a header line, then a block group per job. Slack
//! caps a message at 50 blocks, so only the first `max_jobs` jobs get
//! blocks and the rest are summarised in a trailing context line.

use std::sync::Arc;

use serde_json::{json, Value};

use jobwatch_core::config::SlackConfig;
use jobwatch_core::{QualifiedJob, Tier};

use crate::format::FormattedJob;
use crate::templating::{HeaderContext, TemplateRenderer, DEFAULT_HEADER_TEMPLATE};
use crate::traits::{Notifier, NotifyError};

const TEST_MESSAGE: &str = "✅ *Upwork Job Watcher Connected!*\n\n\
    Your watcher is now monitoring Upwork and will send notifications for new jobs.";

#[derive(Debug)]
pub struct SlackNotifier {
    webhook_url: String,
    max_jobs: usize,
    header_template: String,
    renderer: Arc<TemplateRenderer>,
    client: reqwest::Client,
}

impl SlackNotifier {
    /// Create a notifier. The header template is syntax-checked up front.
    pub fn new(
        webhook_url: String,
        max_jobs: usize,
        header_template: Option<String>,
        renderer: Arc<TemplateRenderer>,
    ) -> Result<Self, NotifyError> {
        let header_template = header_template.unwrap_or_else(|| DEFAULT_HEADER_TEMPLATE.to_string());
        renderer
            .validate(&header_template)
            .map_err(|e| NotifyError::Config(format!("invalid header template: {e}")))?;

        Ok(Self {
            webhook_url,
            max_jobs: max_jobs.max(1),
            header_template,
            renderer,
            client: reqwest::Client::new(),
        })
    }

    /// `Ok(None)` when no webhook URL is configured.
    pub fn from_config(config: &SlackConfig) -> Result<Option<Self>, NotifyError> {
        let Some(url) = config.webhook_url.clone() else {
            return Ok(None);
        };
        Self::new(
            url,
            config.max_jobs_per_message,
            config.header_template.clone(),
            Arc::new(TemplateRenderer::new()),
        )
        .map(Some)
    }

    /// Full webhook payload for a non-empty batch.
    pub fn build_message(&self, jobs: &[QualifiedJob]) -> Result<Value, NotifyError> {
        let header = self
            .renderer
            .render(&self.header_template, &HeaderContext::new(jobs.len(), self.max_jobs))?;

        let mut blocks = vec![mrkdwn_section(&header), json!({ "type": "divider" })];
        for job in jobs.iter().take(self.max_jobs) {
            blocks.extend(job_blocks(job));
        }
        if jobs.len() > self.max_jobs {
            blocks.push(json!({
                "type": "context",
                "elements": [{
                    "type": "mrkdwn",
                    "text": format!(
                        "_... and {} more jobs. Check the logs for details._",
                        jobs.len() - self.max_jobs
                    ),
                }],
            }));
        }

        let plural = if jobs.len() == 1 { "" } else { "s" };
        Ok(json!({
            "blocks": blocks,
            "text": format!("{} new Upwork job{plural} found!", jobs.len()),
        }))
    }

    async fn post(&self, payload: &Value) -> Result<(), NotifyError> {
        let response = self.client.post(&self.webhook_url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(%status, body = %body, "Slack webhook returned non-2xx status");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, jobs: &[QualifiedJob]) -> Result<usize, NotifyError> {
        if jobs.is_empty() {
            tracing::debug!("no jobs to notify about");
            return Ok(0);
        }
        let payload = self.build_message(jobs)?;
        self.post(&payload).await?;
        tracing::info!(jobs = jobs.len(), "Slack notification sent");
        Ok(jobs.len())
    }

    async fn test(&self) -> Result<(), NotifyError> {
        let payload = json!({
            "blocks": [mrkdwn_section(TEST_MESSAGE)],
            "text": "Upwork Job Watcher Connected!",
        });
        self.post(&payload).await?;
        tracing::info!("Slack test notification sent");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "slack"
    }
}

fn mrkdwn_section(text: &str) -> Value {
    json!({ "type": "section", "text": { "type": "mrkdwn", "text": text } })
}

fn mrkdwn_field(text: &str) -> Value {
    json!({ "type": "mrkdwn", "text": text })
}

fn tier_badge(tier: Tier) -> Option<&'static str> {
    match tier {
        Tier::Ideal => Some("🎯 *TIER 1 - IDEAL MATCH*"),
        Tier::Upsell => Some("💡 *TIER 2 - UPSELL POTENTIAL*"),
        Tier::Unvetted | Tier::Reject => None,
    }
}

/// Blocks for a single job.
fn job_blocks(qualified: &QualifiedJob) -> Vec<Value> {
    let formatted = FormattedJob::from_posting(&qualified.job);
    let reasoning = qualified.reasoning.as_deref().filter(|r| !r.is_empty());
    let mut blocks = Vec::new();

    if reasoning.is_some() {
        if let Some(badge) = tier_badge(qualified.tier) {
            blocks.push(mrkdwn_section(badge));
        }
    }

    blocks.push(json!({
        "type": "header",
        "text": { "type": "plain_text", "text": formatted.title, "emoji": true },
    }));

    if let Some(reasoning) = reasoning {
        blocks.push(mrkdwn_section(&format!("💭 *AI Insight:* _{reasoning}_")));
    }

    blocks.push(json!({
        "type": "section",
        "fields": [
            mrkdwn_field(&format!("*Posted:*\n{}", formatted.posted_date)),
            mrkdwn_field(&formatted.budget),
        ],
    }));

    let extra: Vec<Value> = [formatted.duration.as_deref(), formatted.client_info.as_deref()]
        .into_iter()
        .flatten()
        .map(mrkdwn_field)
        .collect();
    if !extra.is_empty() {
        blocks.push(json!({ "type": "section", "fields": extra }));
    }

    if let Some(description) = &formatted.description {
        blocks.push(mrkdwn_section(&format!("*Description:*\n{description}")));
    }

    blocks.push(json!({
        "type": "actions",
        "elements": [{
            "type": "button",
            "text": { "type": "plain_text", "text": "View Job on Upwork", "emoji": true },
            "url": formatted.url,
            "style": "primary",
        }],
    }));
    blocks.push(json!({ "type": "divider" }));
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jobwatch_core::{ClientInfo, JobPosting};

    fn notifier(max_jobs: usize) -> SlackNotifier {
        SlackNotifier::new(
            "http://127.0.0.1:9/hook".into(),
            max_jobs,
            None,
            Arc::new(TemplateRenderer::new()),
        )
        .unwrap()
    }

    fn qualified(id: &str, tier: Tier, reasoning: Option<&str>) -> QualifiedJob {
        QualifiedJob {
            job: JobPosting::new(id, format!("Job {id}"), Utc::now()),
            tier,
            reasoning: reasoning.map(str::to_string),
        }
    }

    fn block_types(message: &Value) -> Vec<&str> {
        message["blocks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["type"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn message_for_single_unvetted_job() {
        let message = notifier(5)
            .build_message(&[QualifiedJob::unvetted(JobPosting::new("1", "Fix cart", Utc::now()))])
            .unwrap();

        assert_eq!(message["text"], "1 new Upwork job found!");
        assert_eq!(message["blocks"][0]["text"]["text"], "🎯 *1 New Upwork Job Found!*");
        assert_eq!(
            block_types(&message),
            vec!["section", "divider", "header", "section", "actions", "divider"]
        );
        assert_eq!(message["blocks"][2]["text"]["text"], "Fix cart");
        assert_eq!(
            message["blocks"][4]["elements"][0]["url"],
            "https://www.upwork.com/jobs/~1"
        );
    }

    #[test]
    fn tier_badge_and_insight_need_reasoning() {
        let n = notifier(5);

        let with_reason = n.build_message(&[qualified("1", Tier::Ideal, Some("Big brand"))]).unwrap();
        let blocks = with_reason["blocks"].as_array().unwrap();
        assert_eq!(blocks[2]["text"]["text"], "🎯 *TIER 1 - IDEAL MATCH*");
        assert_eq!(blocks[3]["type"], "header");
        assert_eq!(blocks[4]["text"]["text"], "💭 *AI Insight:* _Big brand_");

        let no_reason = n.build_message(&[qualified("2", Tier::Upsell, None)]).unwrap();
        assert_eq!(no_reason["blocks"][2]["type"], "header");

        let unvetted = n
            .build_message(&[qualified("3", Tier::Unvetted, Some("qualifier unavailable"))])
            .unwrap();
        assert_eq!(unvetted["blocks"][2]["type"], "header");
        assert_eq!(unvetted["blocks"][3]["text"]["text"], "💭 *AI Insight:* _qualifier unavailable_");
    }

    #[test]
    fn optional_sections_follow_job_fields() {
        let mut job = JobPosting::new("9", "Klaviyo flows", Utc::now());
        job.duration = Some("1 to 3 months".into());
        job.client = Some(ClientInfo {
            country: Some("Canada".into()),
            ..ClientInfo::default()
        });
        job.description = Some("Set up\n\nwelcome flow".into());

        let message = notifier(5).build_message(&[QualifiedJob::unvetted(job)]).unwrap();
        assert_eq!(
            block_types(&message),
            vec!["section", "divider", "header", "section", "section", "section", "actions", "divider"]
        );
        let fields = message["blocks"][4]["fields"].as_array().unwrap();
        assert_eq!(fields[0]["text"], "⏱️ 1 to 3 months");
        assert_eq!(fields[1]["text"], "👤 0 hires • 0 jobs • 0 reviews • Canada");
        assert_eq!(message["blocks"][5]["text"]["text"], "*Description:*\nSet up welcome flow");
    }

    #[test]
    fn overflow_beyond_limit_is_summarised() {
        let jobs: Vec<QualifiedJob> = (0..8)
            .map(|i| qualified(&i.to_string(), Tier::Unvetted, None))
            .collect();
        let message = notifier(5).build_message(&jobs).unwrap();

        let headers = block_types(&message).iter().filter(|t| **t == "header").count();
        assert_eq!(headers, 5);

        let last = message["blocks"].as_array().unwrap().last().unwrap();
        assert_eq!(last["type"], "context");
        assert_eq!(
            last["elements"][0]["text"],
            "_... and 3 more jobs. Check the logs for details._"
        );
        assert_eq!(message["text"], "8 new Upwork jobs found!");
    }

    #[test]
    fn custom_header_template() {
        let n = SlackNotifier::new(
            "http://127.0.0.1:9/hook".into(),
            2,
            Some("{{ count }} jobs ({{ hidden }} not shown)".into()),
            Arc::new(TemplateRenderer::new()),
        )
        .unwrap();
        let jobs: Vec<QualifiedJob> = (0..3)
            .map(|i| qualified(&i.to_string(), Tier::Unvetted, None))
            .collect();
        let message = n.build_message(&jobs).unwrap();
        assert_eq!(message["blocks"][0]["text"]["text"], "3 jobs (1 not shown)");
    }

    #[test]
    fn invalid_header_template_is_config_error() {
        let err = SlackNotifier::new(
            "http://127.0.0.1:9/hook".into(),
            5,
            Some("{{ unclosed".into()),
            Arc::new(TemplateRenderer::new()),
        )
        .unwrap_err();
        assert!(matches!(err, NotifyError::Config(_)));
    }

    #[test]
    fn from_config_without_url_is_none() {
        let config = SlackConfig {
            webhook_url: None,
            max_jobs_per_message: 5,
            header_template: None,
        };
        assert!(SlackNotifier::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        assert_eq!(notifier(5).send(&[]).await.unwrap(), 0);
    }
}
