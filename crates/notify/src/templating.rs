//! Minijinja rendering for the notification header line.
//!
//! The header is an operator-supplied string (`SLACK_HEADER_TEMPLATE`), so a
//! fresh [`minijinja::Environment`] is created per render call.

use crate::traits::NotifyError;

/// Header used when no template is configured.
pub const DEFAULT_HEADER_TEMPLATE: &str =
    "🎯 *{{ count }} New Upwork Job{{ count | pluralize }} Found!*";

/// Values available to the header template.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HeaderContext {
    /// Jobs in the batch.
    pub count: usize,
    /// Jobs rendered as blocks in this message.
    pub shown: usize,
    /// Jobs left out because of the per-message limit.
    pub hidden: usize,
    /// Current timestamp in ISO 8601 format.
    pub now: String,
}

impl HeaderContext {
    pub fn new(count: usize, max_shown: usize) -> Self {
        let shown = count.min(max_shown);
        Self {
            count,
            shown,
            hidden: count - shown,
            now: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("pluralize", pluralize_filter);
        env
    }

    /// Render a template string with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, ctx: &HeaderContext) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Check that a template string parses, without evaluating it.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

/// `{{ n | pluralize }}` is "s" unless n is 1; a custom suffix may be passed.
fn pluralize_filter(value: i64, suffix: Option<String>) -> String {
    if value == 1 {
        String::new()
    } else {
        suffix.unwrap_or_else(|| "s".to_string())
    }
}
