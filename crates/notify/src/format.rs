//! Plain-text rendering of a job's fields for chat messages.

use chrono::{DateTime, Utc};

use jobwatch_core::JobPosting;

/// Longest description shown, in characters, including the ellipsis.
pub const DESCRIPTION_LIMIT: usize = 300;

/// Display strings for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedJob {
    pub title: String,
    pub url: String,
    pub posted_date: String,
    pub budget: String,
    pub duration: Option<String>,
    pub client_info: Option<String>,
    pub description: Option<String>,
}

impl FormattedJob {
    pub fn from_posting(job: &JobPosting) -> Self {
        let title = if job.title.trim().is_empty() {
            "Untitled Job".to_string()
        } else {
            job.title.clone()
        };

        let client_info = job.client.as_ref().map(|client| {
            format!(
                "👤 {} hires • {} jobs • {} reviews • {}",
                client.total_hires.unwrap_or(0),
                client.total_posted_jobs.unwrap_or(0),
                client.total_reviews.unwrap_or(0),
                client.country.as_deref().unwrap_or("Unknown"),
            )
        });

        Self {
            title,
            url: job.url(),
            posted_date: posted_date(job.posted_at),
            budget: format!("💰 {}", job.budget),
            duration: job.duration.as_ref().map(|d| format!("⏱️ {d}")),
            client_info,
            description: job
                .description
                .as_deref()
                .map(truncate_description)
                .filter(|d| !d.is_empty()),
        }
    }
}

/// e.g. "3/1/2025, 12:00 PM UTC"
pub fn posted_date(at: DateTime<Utc>) -> String {
    at.format("%-m/%-d/%Y, %-I:%M %p UTC").to_string()
}

/// Cut to [`DESCRIPTION_LIMIT`] characters with a trailing "...", then
/// collapse runs of whitespace into single spaces.
pub fn truncate_description(text: &str) -> String {
    let cut: String = if text.chars().count() > DESCRIPTION_LIMIT {
        let mut head: String = text.chars().take(DESCRIPTION_LIMIT - 3).collect();
        head.push_str("...");
        head
    } else {
        text.to_string()
    };
    cut.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jobwatch_core::{Budget, ClientInfo};

    fn posting() -> JobPosting {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 14, 5, 0).unwrap();
        let mut job = JobPosting::new("42", "Shopify PDP redesign", at);
        job.ciphertext = Some("~01abc".into());
        job.budget = Budget::Fixed { amount: "750".into() };
        job
    }

    #[test]
    fn formats_core_fields() {
        let formatted = FormattedJob::from_posting(&posting());
        assert_eq!(formatted.title, "Shopify PDP redesign");
        assert_eq!(formatted.url, "https://www.upwork.com/jobs/~01abc");
        assert_eq!(formatted.posted_date, "3/1/2025, 2:05 PM UTC");
        assert_eq!(formatted.budget, "💰 $750 (Fixed Price)");
        assert_eq!(formatted.duration, None);
        assert_eq!(formatted.client_info, None);
        assert_eq!(formatted.description, None);
    }

    #[test]
    fn formats_client_with_defaults() {
        let mut job = posting();
        job.client = Some(ClientInfo {
            total_hires: Some(3),
            ..ClientInfo::default()
        });
        job.duration = Some("Less than 1 month".into());

        let formatted = FormattedJob::from_posting(&job);
        assert_eq!(
            formatted.client_info.as_deref(),
            Some("👤 3 hires • 0 jobs • 0 reviews • Unknown")
        );
        assert_eq!(formatted.duration.as_deref(), Some("⏱️ Less than 1 month"));
    }

    #[test]
    fn hourly_and_unspecified_budget() {
        let mut job = posting();
        job.budget = Budget::Hourly {
            min: Some("25".into()),
            max: Some("50".into()),
        };
        assert_eq!(FormattedJob::from_posting(&job).budget, "💰 $25 - $50/hr");

        job.budget = Budget::Unspecified;
        assert_eq!(FormattedJob::from_posting(&job).budget, "💰 Not specified");
    }

    #[test]
    fn long_description_is_truncated() {
        let text = "word ".repeat(100);
        let out = truncate_description(&text);
        assert!(out.ends_with("..."));
        assert!(out.chars().count() <= DESCRIPTION_LIMIT);
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(truncate_description("  Need\n\nhelp   with\tcart  "), "Need help with cart");
        assert_eq!(truncate_description("   "), "");
    }
}
