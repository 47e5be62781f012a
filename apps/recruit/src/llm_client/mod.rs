/// LLM Client — the single point of entry for chat-completion calls.
///
/// Talks to an OpenAI-compatible `/chat/completions` endpoint (OpenRouter by
/// default). One call is one HTTP exchange; retry policy belongs to the caller,
/// which needs to tell rate limiting apart from other failures.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited (status 429): {message}")]
    RateLimited { message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// True for the error class that earns exponential backoff.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }
}

/// Connection settings for the completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl LlmSettings {
    pub fn from_config(config: &Config, api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: config.openrouter_base_url.clone(),
            model: config.filter_model.clone(),
            max_tokens: config.filter_max_tokens,
            timeout: config.request_timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Text of the first choice, if it has any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Chat-completion client shared by every classification worker in a run.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Sends a single user message and returns the completion text.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.settings.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let chat_response: ChatResponse = response.json().await?;

        if let Some(usage) = &chat_response.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        chat_response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Maps a non-success status and body to the matching error class.
fn classify_status(status: StatusCode, body: String) -> LlmError {
    // Try to parse error message
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    if status == StatusCode::TOO_MANY_REQUESTS {
        LlmError::RateLimited { message }
    } else {
        LlmError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_is_rate_limited() {
        let err = classify_status(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "slow down"}}"#.to_string(),
        );
        assert!(err.is_rate_limited());
        assert_eq!(err.to_string(), "Rate limited (status 429): slow down");
    }

    #[test]
    fn test_server_error_is_not_rate_limited() {
        let err = classify_status(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert!(!err.is_rate_limited());
        assert!(matches!(err, LlmError::Api { status: 502, .. }));
    }

    #[test]
    fn test_chat_response_text_takes_first_choice() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "{\"match\": true}"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("{\"match\": true}"));
    }

    #[test]
    fn test_chat_response_blank_content_is_none() {
        let json = r#"{"choices": [{"message": {"content": "   "}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_chat_response_without_choices_is_none() {
        let response: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text().is_none());
    }
}
