pub mod ollama;
pub mod openai;

use jobwatch_core::config::QualifierConfig;

use crate::provider::{LlmError, LlmProvider};

/// Create the configured LLM provider, asking it for JSON-only replies.
pub fn create_provider(config: &QualifierConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            let base_url = config
                .openai_base_url
                .as_deref()
                .unwrap_or("https://api.openai.com");
            Ok(Box::new(
                openai::OpenAiProvider::new(
                    api_key.clone(),
                    config.openai_model.clone(),
                    base_url.trim_end_matches('/').to_string(),
                )
                .with_json_responses(),
            ))
        }
        "ollama" => Ok(Box::new(
            ollama::OllamaProvider::new(config.ollama_url.clone(), config.ollama_model.clone())
                .with_json_responses(),
        )),
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}
