//! OpenAI-compatible chat-completion client

use async_trait::async_trait;
use careline_config::LlmConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::prompt::EnhancementPrompt;

/// Completion errors. Callers treat every variant the same way: fall back to
/// the scripted response.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM enhancement is disabled (no endpoint configured)")]
    Disabled,

    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),

    #[error("LLM returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("LLM returned no usable completion")]
    EmptyCompletion,
}

/// A chat-completion backend
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Rephrase a scripted response. Implementations must bound their own
    /// latency; the caller races this against a timeout regardless.
    async fn enhance(&self, prompt: &EnhancementPrompt) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
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

/// Client for any OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    /// Whether an endpoint is configured at all
    pub fn is_enabled(&self) -> bool {
        self.config.endpoint.is_some()
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn enhance(&self, prompt: &EnhancementPrompt) -> Result<String, LlmError> {
        let endpoint = self.config.endpoint.as_ref().ok_or(LlmError::Disabled)?;
        let url = format!("{}/chat/completions", endpoint.trim_end_matches('/'));

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt.system_message(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.user_message(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!(model = %self.config.model, "requesting response enhancement");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "LLM endpoint returned an error");
            return Err(LlmError::Status(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyCompletion)?;

        Ok(content)
    }
}
