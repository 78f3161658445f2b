//! HTTP client for the OpenAI-compatible chat-completion endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bound on a single completion request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors from the completion endpoint. These are never retried by the
/// pipeline; they surface to the caller unmodified.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("completion request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    #[error("completion endpoint returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("completion endpoint returned no choices")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// A configured completion-endpoint client.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CompletionClient {
    /// Create a client for `base_url` (without the `/chat/completions`
    /// suffix) using `model` for every request.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, CompletionError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a system+user message pair and return the trimmed completion
    /// text.
    pub async fn chat(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
        };

        tracing::debug!(model = %self.model, "sending completion request");
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_empty_api_key_is_rejected() {
        let error = CompletionClient::new("https://api.example.com/v1", "", "some-model");
        assert!(matches!(error, Err(CompletionError::MissingApiKey)));
    }

    #[test]
    fn trailing_slashes_are_stripped_from_the_base_url() {
        let client =
            CompletionClient::new("https://api.example.com/v1/", "key", "some-model").unwrap();
        assert_eq!(client.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn the_request_serializes_to_the_wire_format() {
        let request = ChatRequest {
            model: "llama-3.1-8b",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "Du bist ein Concierge.",
                },
                ChatMessage {
                    role: "user",
                    content: "Ab wann ist Check-in?",
                },
            ],
            temperature: 0.2,
            max_tokens: 700,
        };
        let encoded = serde_json::to_value(&request).unwrap();

        assert_eq!(encoded["model"], "llama-3.1-8b");
        assert_eq!(encoded["messages"][0]["role"], "system");
        assert_eq!(encoded["messages"][1]["role"], "user");
        assert_eq!(encoded["max_tokens"], 700);
    }

    #[test]
    fn the_response_parses_down_to_the_first_choice() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Ab 14:00 Uhr."}}
            ],
            "usage": {"total_tokens": 20}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap();

        assert_eq!(content, "Ab 14:00 Uhr.");
    }
}
