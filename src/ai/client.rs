//! Chat-completion client over an upstream multi-model routing API.
//!
//! Issues `POST {base}/chat/completions` with Bearer auth and expects
//! OpenAI-chat-shaped JSON back. Upstream error payloads become typed
//! errors; a missing AI answer is never silently swallowed, since it
//! invalidates the analysis depending on it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use super::models::TierModels;

/// AI gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Chat-completions API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for the upstream API.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds (AI calls are slow; default 5 minutes).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Models substituted when a request names neither `model` nor `models`.
    #[serde(default = "default_models")]
    pub default_models: Vec<String>,

    /// Per-tier models for escalating JSON repair.
    #[serde(default)]
    pub tiers: TierModels,

    /// Vision-capable model for screenshot and image analysis.
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_models() -> Vec<String> {
    vec![
        "openai/gpt-4o-mini".to_string(),
        "google/gemini-2.0-flash-001".to_string(),
    ]
}

fn default_vision_model() -> String {
    "openai/gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            default_models: default_models(),
            tiers: TierModels::default(),
            vision_model: default_vision_model(),
            temperature: default_temperature(),
        }
    }
}

/// One chat message. Content is a JSON value so vision messages can carry
/// image_url content parts alongside plain strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiMessage {
    pub role: String,
    pub content: Value,
}

impl AiMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Value::String(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Value::String(content.into()),
        }
    }

    /// User message pairing a text prompt with an inline image
    /// (`data:image/png;base64,...` or a plain URL).
    pub fn user_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: json!([
                {"type": "text", "text": text.into()},
                {"type": "image_url", "image_url": {"url": image_url.into()}},
            ]),
        }
    }
}

/// Chat-completion request. `stream` is part of the upstream contract but
/// this client only issues non-streaming calls.
#[derive(Debug, Clone, Serialize)]
pub struct AiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
    pub messages: Vec<AiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

impl AiRequest {
    pub fn new(messages: Vec<AiMessage>) -> Self {
        Self {
            model: None,
            models: None,
            messages,
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Token accounting. Always present on non-streaming responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiChoiceMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiChoice {
    pub message: AiChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Parsed chat-completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct AiResponse {
    pub choices: Vec<AiChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl AiResponse {
    /// Content of the first choice.
    pub fn first_content(&self) -> Result<&str, AiError> {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .filter(|c| !c.is_empty())
            .ok_or(AiError::MissingContent)
    }
}

/// Errors from the AI gateway.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Upstream AI error {code} (status {status}): {message}")]
    Upstream {
        code: String,
        status: u16,
        message: String,
    },

    #[error("AI request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("AI request failed with HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("AI transport error: {0}")]
    Transport(String),

    #[error("AI response contained no content")]
    MissingContent,

    #[error("Unexpected AI response shape: {0}")]
    InvalidResponse(String),
}

/// Seam for everything that issues chat completions, so the repair loop
/// and the analyzers can run against mocks in tests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, request: AiRequest) -> Result<AiResponse, AiError>;
}

/// HTTP client for the upstream chat-completions API.
pub struct AiClient {
    config: AiConfig,
    client: Client,
}

impl AiClient {
    pub fn new(config: AiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }
}

#[async_trait]
impl ChatBackend for AiClient {
    async fn chat(&self, mut request: AiRequest) -> Result<AiResponse, AiError> {
        // Neither model nor models given: fall back to the configured list
        if request.model.is_none() && request.models.is_none() {
            request.models = Some(self.config.default_models.clone());
        }
        if request.temperature.is_none() {
            request.temperature = Some(self.config.temperature);
        }

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        debug!(
            "AI request to {} (model={:?}, models={:?})",
            url, request.model, request.models
        );

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = self.config.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AiError::Timeout {
                    secs: self.config.timeout_secs,
                }
            } else {
                AiError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AiError::Transport(e.to_string()))?;

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| AiError::InvalidResponse(format!("{}: {}", e, truncate(&body))))?;

        // Upstream may embed an error payload even under HTTP 200
        if let Some(error) = payload.get("error") {
            let code = error
                .get("code")
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("upstream error")
                .to_string();
            return Err(AiError::Upstream {
                code: code.trim_matches('"').to_string(),
                status: status.as_u16(),
                message,
            });
        }

        if !status.is_success() {
            return Err(AiError::Http {
                status: status.as_u16(),
                message: truncate(&body),
            });
        }

        let parsed: AiResponse = serde_json::from_value(payload)
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "AI usage: prompt={} completion={} total={}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        Ok(parsed)
    }
}

fn truncate(body: &str) -> String {
    crate::utils::truncate_utf8(body, 500).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_skips_absent_fields() {
        let request = AiRequest::new(vec![AiMessage::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("model").is_none());
        assert!(json.get("models").is_none());
        assert_eq!(json["stream"], serde_json::json!(false));
    }

    #[test]
    fn test_response_first_content() {
        let response: AiResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        }))
        .unwrap();
        assert_eq!(response.first_content().unwrap(), "hello");
        assert_eq!(response.usage.unwrap().total_tokens, 7);
    }

    #[test]
    fn test_empty_choices_is_missing_content() {
        let response: AiResponse =
            serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            response.first_content(),
            Err(AiError::MissingContent)
        ));
    }

    #[test]
    fn test_vision_message_shape() {
        let msg = AiMessage::user_with_image("describe", "data:image/png;base64,AAAA");
        let parts = msg.content.as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }
}
