//! Delivery of qualified jobs to chat channels.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery sinks
//! - Slack incoming-webhook notifier built from Block Kit sections
//! - Minijinja rendering for the message header line
//! - Plain-text job formatting shared by the blocks

pub mod format;
pub mod slack;
pub mod templating;
pub mod traits;

pub use format::FormattedJob;
pub use slack::SlackNotifier;
pub use templating::{HeaderContext, TemplateRenderer, DEFAULT_HEADER_TEMPLATE};
pub use traits::{Notifier, NotifyError};
