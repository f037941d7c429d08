//! Local models through Ollama's `/api/chat`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::provider::{LlmError, LlmProvider, Message};

pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    json_responses: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<Message>,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            model,
            json_responses: false,
        }
    }

    /// Ask Ollama to constrain output to JSON (`format: "json"`).
    pub fn with_json_responses(mut self) -> Self {
        self.json_responses = true;
        self
    }

    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            },
        });
        if self.json_responses {
            body["format"] = json!("json");
        }
        body
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        debug!(model = %self.model, %url, "chat request");

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(&messages, temperature, max_tokens))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .message
            .map(|m| m.content)
            .ok_or_else(|| LlmError::ParseError("missing message.content".into()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_sets_options_and_format() {
        let provider = OllamaProvider::new("http://localhost:11434".into(), "llama3.2".into()).with_json_responses();
        let body = provider.request_body(&[Message::user("hi")], 0.3, 150);
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 150);
        assert_eq!(body["format"], "json");
        assert_eq!(body["messages"][0]["role"], "user");
    }
}
