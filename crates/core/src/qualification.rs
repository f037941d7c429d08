use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::job::JobPosting;

/// Classification assigned to a job by the qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    /// Not scored: qualifier disabled, failed, or timed out.
    Unvetted,
    Ideal,
    Upsell,
    Reject,
}

impl Tier {
    pub fn as_number(self) -> u8 {
        match self {
            Tier::Unvetted => 0,
            Tier::Ideal => 1,
            Tier::Upsell => 2,
            Tier::Reject => 3,
        }
    }

    /// Tiers 1 and 2 are forwarded; unvetted jobs pass by fail-open.
    pub fn is_qualified(self) -> bool {
        !matches!(self, Tier::Reject)
    }

    /// Parse a tier reported by the classifier. Only 1..=3 are valid there.
    pub fn from_classifier(value: i64) -> Result<Self, CoreError> {
        match value {
            1 => Ok(Tier::Ideal),
            2 => Ok(Tier::Upsell),
            3 => Ok(Tier::Reject),
            other => Err(CoreError::InvalidTier(other)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Unvetted => "Unvetted",
            Tier::Ideal => "Ideal",
            Tier::Upsell => "Upsell",
            Tier::Reject => "Reject",
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier.as_number()
    }
}

impl TryFrom<u8> for Tier {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tier::Unvetted),
            n => Tier::from_classifier(i64::from(n)),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tier {} ({})", self.as_number(), self.label())
    }
}

/// A job enriched with the qualifier's verdict, as handed to the delivery sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifiedJob {
    pub job: JobPosting,
    pub tier: Tier,
    pub reasoning: Option<String>,
}

impl QualifiedJob {
    /// Wrap a job that never went through classification.
    pub fn unvetted(job: JobPosting) -> Self {
        Self {
            job,
            tier: Tier::Unvetted,
            reasoning: None,
        }
    }
}
