//! OpenAI-compatible chat completions (`/v1/chat/completions`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::provider::{LlmError, LlmProvider, Message};

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    json_responses: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url,
            json_responses: false,
        }
    }

    /// Request `response_format: json_object` on every completion.
    pub fn with_json_responses(mut self) -> Self {
        self.json_responses = true;
        self
    }

    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        if self.json_responses {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(model = %self.model, %url, "chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_includes_json_mode() {
        let provider = OpenAiProvider::new("sk".into(), "gpt-4o-mini".into(), "https://api.openai.com".into())
            .with_json_responses();
        let body = provider.request_body(&[Message::system("s"), Message::user("u")], 0.3, 150);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "u");
        assert_eq!(body["max_tokens"], 150);
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn request_body_plain_by_default() {
        let provider = OpenAiProvider::new("sk".into(), "gpt-4o".into(), "https://api.openai.com".into());
        let body = provider.request_body(&[Message::user("hi")], 0.1, 10);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn response_without_content_is_empty() {
        let parsed: ChatResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(parsed.choices.is_empty());

        let parsed: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"tier\": 1}" } }]
        }))
        .unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{\"tier\": 1}"));
    }
}
