use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use remai_core::types::Turn;

/// Request to a completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    /// Full ordered turn list, system turn first when present.
    pub turns: Vec<Turn>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, turns: Vec<Turn>) -> Self {
        Self {
            model: model.into(),
            turns,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token usage reported by the API for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

/// Result of running user content through a moderation endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModerationVerdict {
    pub flagged: bool,
    /// Names of the categories that triggered the flag.
    pub categories: Vec<String>,
}

/// Request to an image generation endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: String,
    /// `WIDTHxHEIGHT`, as the API spells it.
    pub size: String,
    pub n: u8,
    pub quality: Option<String>,
    pub style: Option<String>,
    /// End-user id forwarded for abuse monitoring.
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Temporary URL of the image.
    pub url: String,
    /// Prompt as rewritten by the model, when it did.
    pub revised_prompt: Option<String>,
}

/// Everything the conversation layer needs from a completion API.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    /// Send a non-streaming completion request and wait for the full answer.
    async fn complete(&self, req: &CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// Classify `input`. Providers without a moderation endpoint let
    /// everything through.
    async fn moderate(&self, _input: &str) -> Result<ModerationVerdict, ProviderError> {
        Ok(ModerationVerdict::default())
    }

    async fn generate_image(
        &self,
        _req: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, ProviderError> {
        Err(ProviderError::Unavailable(format!(
            "{} does not generate images",
            self.name()
        )))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Short text suitable for an error embed shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::Api { status, message } => {
                let detail = extract_api_message(message).unwrap_or_else(|| message.clone());
                format!("The API answered with status {status}: {detail}")
            }
            ProviderError::RateLimited { retry_after_ms } => format!(
                "Too many requests, try again in {}s.",
                retry_after_ms.div_ceil(1000)
            ),
            other => other.to_string(),
        }
    }
}

/// OpenAI-style error bodies look like `{"error": {"message": "..."}}`.
fn extract_api_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(String::from)
}
