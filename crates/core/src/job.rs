use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Base path of every public job listing.
pub const JOB_LINK_BASE: &str = "https://www.upwork.com/jobs/";

/// Marker placed before a raw id when no encrypted id is available.
const RAW_ID_MARKER: &str = "~";

/// A job posting as returned by the marketplace, normalized at the
/// ingestion boundary (timestamps parsed, price fields folded into [`Budget`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub posted_at: DateTime<Utc>,
    pub description: Option<String>,
    /// Encrypted identifier; already carries its `~` prefix.
    pub ciphertext: Option<String>,
    pub budget: Budget,
    pub duration: Option<String>,
    pub client: Option<ClientInfo>,
}

impl JobPosting {
    /// Minimal posting with only the identity fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>, posted_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            posted_at,
            description: None,
            ciphertext: None,
            budget: Budget::Unspecified,
            duration: None,
            client: None,
        }
    }

    /// Canonical deep link for this posting.
    pub fn url(&self) -> String {
        job_url(&self.id, self.ciphertext.as_deref())
    }

    /// Client country, if the marketplace reported one.
    pub fn client_country(&self) -> Option<&str> {
        self.client.as_ref().and_then(|c| c.country.as_deref())
    }
}

/// Build the public link for a job.
///
/// The encrypted id is appended as-is; otherwise the raw id is appended
/// behind the `~` marker.
pub fn job_url(id: &str, ciphertext: Option<&str>) -> String {
    match ciphertext.filter(|c| !c.is_empty()) {
        Some(cipher) => format!("{JOB_LINK_BASE}{cipher}"),
        None => format!("{JOB_LINK_BASE}{RAW_ID_MARKER}{id}"),
    }
}

/// Pricing shape of a posting. Amounts keep the marketplace's raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Budget {
    Hourly {
        min: Option<String>,
        max: Option<String>,
    },
    Fixed {
        amount: String,
    },
    Weekly {
        amount: String,
    },
    Unspecified,
}

impl Budget {
    /// Pick a pricing shape from the raw price fields.
    ///
    /// Precedence: hourly range, then fixed amount, then weekly budget.
    /// Empty strings count as absent.
    pub fn from_raw(
        hourly_min: Option<String>,
        hourly_max: Option<String>,
        fixed: Option<String>,
        weekly: Option<String>,
    ) -> Self {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let (min, max) = (present(hourly_min), present(hourly_max));
        if min.is_some() || max.is_some() {
            return Budget::Hourly { min, max };
        }
        if let Some(amount) = present(fixed) {
            return Budget::Fixed { amount };
        }
        if let Some(amount) = present(weekly) {
            return Budget::Weekly { amount };
        }
        Budget::Unspecified
    }

    pub fn is_specified(&self) -> bool {
        !matches!(self, Budget::Unspecified)
    }

    /// Compact label, e.g. `$25-$50/hr`, `$500 fixed`, `$300/week`.
    pub fn short_label(&self) -> String {
        match self {
            Budget::Hourly { min, max } => match (min, max) {
                (Some(min), Some(max)) => format!("${min}-${max}/hr"),
                (Some(rate), None) | (None, Some(rate)) => format!("${rate}/hr"),
                (None, None) => "Not specified".to_string(),
            },
            Budget::Fixed { amount } => format!("${amount} fixed"),
            Budget::Weekly { amount } => format!("${amount}/week"),
            Budget::Unspecified => "Not specified".to_string(),
        }
    }
}

impl std::fmt::Display for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Budget::Hourly { min, max } => match (min, max) {
                (Some(min), Some(max)) => write!(f, "${min} - ${max}/hr"),
                (Some(rate), None) | (None, Some(rate)) => write!(f, "${rate}/hr"),
                (None, None) => write!(f, "Not specified"),
            },
            Budget::Fixed { amount } => write!(f, "${amount} (Fixed Price)"),
            Budget::Weekly { amount } => write!(f, "${amount}/week"),
            Budget::Unspecified => write!(f, "Not specified"),
        }
    }
}

/// Client reputation fields attached to a posting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub total_hires: Option<u32>,
    pub total_posted_jobs: Option<u32>,
    pub total_reviews: Option<u32>,
    pub total_charges: Option<String>,
    pub payment_verification_status: Option<String>,
    pub country: Option<String>,
}

/// Parse a marketplace timestamp into a UTC instant.
///
/// Accepts RFC 3339 and, as a fallback, offset-less ISO 8601 which is
/// taken to be UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, CoreError> {
    let trimmed = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| CoreError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
