//! Job ingestion: marketplace search, OAuth tokens, and the multi-keyword
//! pipeline that feeds the tracker.

pub mod auth;
pub mod error;
pub mod pipeline;
pub mod search;
pub mod upwork;

pub use auth::{OAuthClient, TokenProvider, TokenResponse};
pub use error::{AuthError, SearchError};
pub use pipeline::{merge_results, IngestBatch, IngestReport, IngestionPipeline, KeywordResult, LocationFilter};
pub use search::{SearchPage, SearchProvider};
pub use upwork::UpworkClient;
