//! Marketplace GraphQL search client.
//!
//! Requests carry a bearer token from a [`TokenProvider`]. An HTTP 401 or
//! a GraphQL error that mentions authentication triggers one token refresh
//! and one retry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use jobwatch_core::config::MarketplaceConfig;
use jobwatch_core::{parse_timestamp, Budget, ClientInfo, CoreError, JobPosting};

use crate::auth::TokenProvider;
use crate::error::SearchError;
use crate::search::{SearchPage, SearchProvider};

const SEARCH_QUERY: &str = r#"
query MarketplaceJobSearch(
  $titleExpression: String
  $searchType: MarketplaceJobPostingSearchType
  $sortAttributes: [MarketplaceJobPostingSearchSortAttribute]
) {
  marketplaceJobPostingsSearch(
    marketPlaceJobFilter: { titleExpression_eq: $titleExpression }
    searchType: $searchType
    sortAttributes: $sortAttributes
  ) {
    totalCount
    edges {
      node {
        id
        title
        createdDateTime
        description
        ciphertext
        weeklyBudget { rawValue }
        amount { rawValue }
        hourlyBudgetMin { rawValue }
        hourlyBudgetMax { rawValue }
        duration
        client {
          totalHires
          totalPostedJobs
          totalReviews
          totalCharges { rawValue }
          paymentVerificationStatus
          location { country }
        }
      }
    }
  }
}
"#;

/// Substrings that mark a GraphQL error as an expired/invalid token.
const AUTH_ERROR_MARKERS: &[&str] = &["authentication", "Unauthorized", "token"];

pub struct UpworkClient {
    http: reqwest::Client,
    endpoint: String,
    auth: Arc<dyn TokenProvider>,
}

impl UpworkClient {
    pub fn new(endpoint: String, auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            auth,
        }
    }

    pub fn from_config(config: &MarketplaceConfig, auth: Arc<dyn TokenProvider>) -> Self {
        Self::new(config.graphql_url.clone(), auth)
    }

    /// Run a GraphQL request, refreshing the token once on auth failure.
    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, SearchError> {
        let token = self.auth.access_token().await?;
        match self.send(query, &variables, &token).await {
            Err(Attempt::Unauthorized(reason)) => {
                info!(reason = %reason, "access token rejected, refreshing and retrying");
                let token = self.auth.refresh(&token).await?;
                self.send(query, &variables, &token).await.map_err(Attempt::into_error)
            }
            other => other.map_err(Attempt::into_error),
        }
    }

    async fn send(&self, query: &str, variables: &Value, token: &str) -> Result<Value, Attempt> {
        debug!(endpoint = %self.endpoint, "GraphQL request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| Attempt::Failed(e.into()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Attempt::Unauthorized(format!("HTTP {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Attempt::Failed(SearchError::Api {
                status: status.as_u16(),
                body,
            }));
        }

        let body: GraphqlResponse = response.json().await.map_err(|e| Attempt::Failed(e.into()))?;
        if let Some(errors) = body.errors.filter(|errs| !errs.is_empty()) {
            warn!(errors = ?errors, "GraphQL errors in response");
            let message = errors[0].message.clone();
            if errors.iter().any(|e| is_auth_message(&e.message)) {
                return Err(Attempt::Unauthorized(message));
            }
            return Err(Attempt::Failed(SearchError::Graphql(message)));
        }

        body.data
            .ok_or_else(|| Attempt::Failed(SearchError::UnexpectedResponse("missing data".into())))
    }
}

#[async_trait]
impl SearchProvider for UpworkClient {
    async fn search(&self, keyword: &str) -> Result<SearchPage, SearchError> {
        let variables = json!({
            "titleExpression": keyword,
            "searchType": "USER_JOBS_SEARCH",
            "sortAttributes": [{ "field": "RECENCY" }],
        });
        let data = self.graphql(SEARCH_QUERY, variables).await?;
        parse_search_page(data)
    }

    fn name(&self) -> &str {
        "upwork"
    }
}

/// Outcome of a single request attempt.
enum Attempt {
    Unauthorized(String),
    Failed(SearchError),
}

impl Attempt {
    fn into_error(self) -> SearchError {
        match self {
            Attempt::Unauthorized(reason) => SearchError::Graphql(format!("unauthorized after refresh: {reason}")),
            Attempt::Failed(e) => e,
        }
    }
}

fn is_auth_message(message: &str) -> bool {
    AUTH_ERROR_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Turn the `data` object into a page, dropping nodes with bad timestamps.
fn parse_search_page(data: Value) -> Result<SearchPage, SearchError> {
    let results = data
        .get("marketplaceJobPostingsSearch")
        .cloned()
        .filter(|v| !v.is_null())
        .ok_or_else(|| SearchError::UnexpectedResponse("missing marketplaceJobPostingsSearch".into()))?;
    let results: SearchResults = serde_json::from_value(results)
        .map_err(|e| SearchError::UnexpectedResponse(e.to_string()))?;

    let mut jobs = Vec::with_capacity(results.edges.len());
    for edge in results.edges {
        let id = edge.node.id.clone();
        match edge.node.into_posting() {
            Ok(job) => jobs.push(job),
            Err(e) => warn!(job_id = %id, error = %e, "skipping job with unusable data"),
        }
    }

    Ok(SearchPage {
        total_count: results.total_count.unwrap_or(jobs.len() as u64),
        jobs,
    })
}

// ── Wire types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResults {
    total_count: Option<u64>,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: JobNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobNode {
    id: String,
    title: Option<String>,
    created_date_time: Option<String>,
    description: Option<String>,
    ciphertext: Option<String>,
    weekly_budget: Option<Money>,
    amount: Option<Money>,
    hourly_budget_min: Option<Money>,
    hourly_budget_max: Option<Money>,
    duration: Option<String>,
    client: Option<ClientNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Money {
    raw_value: Option<Value>,
}

impl Money {
    /// Raw value as text; the API sends strings but numbers are tolerated.
    fn text(money: Option<Money>) -> Option<String> {
        match money?.raw_value? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientNode {
    total_hires: Option<u32>,
    total_posted_jobs: Option<u32>,
    total_reviews: Option<u32>,
    total_charges: Option<Money>,
    payment_verification_status: Option<String>,
    location: Option<LocationNode>,
}

#[derive(Debug, Deserialize)]
struct LocationNode {
    country: Option<String>,
}

impl JobNode {
    fn into_posting(self) -> Result<JobPosting, CoreError> {
        let created = self.created_date_time.unwrap_or_default();
        let posted_at = parse_timestamp(&created)?;
        Ok(JobPosting {
            id: self.id,
            title: self.title.unwrap_or_else(|| "Untitled Job".to_string()),
            posted_at,
            description: self.description.filter(|d| !d.trim().is_empty()),
            ciphertext: self.ciphertext.filter(|c| !c.is_empty()),
            budget: Budget::from_raw(
                Money::text(self.hourly_budget_min),
                Money::text(self.hourly_budget_max),
                Money::text(self.amount),
                Money::text(self.weekly_budget),
            ),
            duration: self.duration.filter(|d| !d.is_empty()),
            client: self.client.map(|c| ClientInfo {
                total_hires: c.total_hires,
                total_posted_jobs: c.total_posted_jobs,
                total_reviews: c.total_reviews,
                total_charges: Money::text(c.total_charges),
                payment_verification_status: c.payment_verification_status,
                country: c.location.and_then(|l| l.country),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> Value {
        json!({
            "marketplaceJobPostingsSearch": {
                "totalCount": 57,
                "edges": [
                    {
                        "node": {
                            "id": "1001",
                            "title": "Shopify PDP redesign",
                            "createdDateTime": "2025-03-01T12:00:00.000Z",
                            "description": "Need CRO help",
                            "ciphertext": "~01abcdef",
                            "weeklyBudget": null,
                            "amount": { "rawValue": "750.0" },
                            "hourlyBudgetMin": null,
                            "hourlyBudgetMax": null,
                            "duration": "1 to 3 months",
                            "client": {
                                "totalHires": 12,
                                "totalPostedJobs": 20,
                                "totalReviews": 9,
                                "totalCharges": { "rawValue": 15000 },
                                "paymentVerificationStatus": "VERIFIED",
                                "location": { "country": "United States" }
                            }
                        }
                    },
                    {
                        "node": {
                            "id": "1002",
                            "title": "Broken timestamp",
                            "createdDateTime": "not a date"
                        }
                    }
                ]
            }
        })
    }

    #[test]
    fn parse_page_converts_nodes() {
        let page = parse_search_page(sample_data()).unwrap();
        assert_eq!(page.total_count, 57);
        assert_eq!(page.jobs.len(), 1, "node with bad timestamp is dropped");

        let job = &page.jobs[0];
        assert_eq!(job.id, "1001");
        assert_eq!(job.url(), "https://www.upwork.com/jobs/~01abcdef");
        assert_eq!(job.budget, Budget::Fixed { amount: "750.0".into() });
        assert_eq!(job.client_country(), Some("United States"));
        let client = job.client.as_ref().unwrap();
        assert_eq!(client.total_hires, Some(12));
        assert_eq!(client.total_charges.as_deref(), Some("15000"));
    }

    #[test]
    fn parse_page_requires_search_field() {
        let err = parse_search_page(json!({ "somethingElse": {} })).unwrap_err();
        assert!(matches!(err, SearchError::UnexpectedResponse(_)));

        let err = parse_search_page(json!({ "marketplaceJobPostingsSearch": null })).unwrap_err();
        assert!(matches!(err, SearchError::UnexpectedResponse(_)));
    }

    #[test]
    fn hourly_range_wins_over_fixed() {
        let node: JobNode = serde_json::from_value(json!({
            "id": "7",
            "createdDateTime": "2025-03-01T12:00:00Z",
            "amount": { "rawValue": "0.0" },
            "hourlyBudgetMin": { "rawValue": "30.0" },
            "hourlyBudgetMax": { "rawValue": "60.0" }
        }))
        .unwrap();
        let job = node.into_posting().unwrap();
        assert_eq!(job.title, "Untitled Job");
        assert_eq!(job.budget.short_label(), "$30.0-$60.0/hr");
    }

    #[test]
    fn auth_messages_are_detected() {
        assert!(is_auth_message("Authentication failed: token expired"));
        assert!(is_auth_message("Unauthorized"));
        assert!(!is_auth_message("Field 'foo' not found"));
    }
}
