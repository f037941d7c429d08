//! Notifier trait definition and shared error types.

use jobwatch_core::QualifiedJob;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel rejected message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Trait for delivery sink implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a batch of jobs. Returns how many jobs the batch announced;
    /// an empty batch sends nothing and returns 0.
    async fn send(&self, jobs: &[QualifiedJob]) -> Result<usize, NotifyError>;

    /// Send a connectivity check message.
    async fn test(&self) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "slack").
    fn channel_name(&self) -> &str;
}
