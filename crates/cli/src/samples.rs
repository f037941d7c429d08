//! Built-in postings for `jobwatch test-qualifier`.

use chrono::Utc;

use jobwatch_core::{Budget, ClientInfo, JobPosting};

struct Sample {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    budget: Budget,
    hires: u32,
    posted: u32,
    country: &'static str,
    expected: u8,
}

fn samples() -> Vec<Sample> {
    vec![
        Sample {
            id: "sample-1",
            title: "Shopify CRO expert to scale Meta ads spend",
            description: "Supplement brand doing $300k/month on Shopify. CPA climbs from $30 to $65 \
                          as we scale ad spend; we need landing pages and PDPs that keep converting.",
            budget: Budget::Fixed { amount: "5000".into() },
            hires: 45,
            posted: 52,
            country: "United States",
            expected: 1,
        },
        Sample {
            id: "sample-2",
            title: "Klaviyo email flows for a Shopify store",
            description: "Set up welcome, abandoned cart and post-purchase flows in Klaviyo. \
                          Store has been running for two years.",
            budget: Budget::Hourly {
                min: Some("35".into()),
                max: Some("60".into()),
            },
            hires: 12,
            posted: 18,
            country: "United States",
            expected: 2,
        },
        Sample {
            id: "sample-3",
            title: "Shopify banner design - $5 budget",
            description: "Simple banner, should take 30 minutes. Looking for someone cheap and fast.",
            budget: Budget::Fixed { amount: "5".into() },
            hires: 340,
            posted: 410,
            country: "India",
            expected: 3,
        },
        Sample {
            id: "sample-4",
            title: "WordPress WooCommerce developer needed",
            description: "Customize product options and the checkout flow of a WooCommerce shop.",
            budget: Budget::Hourly {
                min: Some("15".into()),
                max: Some("30".into()),
            },
            hires: 8,
            posted: 11,
            country: "United Kingdom",
            expected: 3,
        },
    ]
}

/// Sample postings paired with the tier a sensible classifier should give.
pub fn sample_jobs() -> Vec<(JobPosting, u8)> {
    samples()
        .into_iter()
        .map(|s| {
            let mut job = JobPosting::new(s.id, s.title, Utc::now());
            job.description = Some(s.description.to_string());
            job.budget = s.budget;
            job.client = Some(ClientInfo {
                total_hires: Some(s.hires),
                total_posted_jobs: Some(s.posted),
                country: Some(s.country.to_string()),
                ..ClientInfo::default()
            });
            (job, s.expected)
        })
        .collect()
}
