use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, GeneratedImage, ImageRequest,
    ModerationVerdict, ProviderError, Usage,
};

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000)
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, path, body = %text, "OpenAI API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        Ok(resp)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let body = build_request_body(req);
        debug!(model = %req.model, turns = req.turns.len(), "sending request to OpenAI");

        let api_resp: ApiResponse = self
            .post("/v1/chat/completions", &body)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parse_response(api_resp)
    }

    async fn moderate(&self, input: &str) -> Result<ModerationVerdict, ProviderError> {
        let body = serde_json::json!({ "input": input });
        let api_resp: ModerationResponse = self
            .post("/v1/moderations", &body)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(parse_moderation(api_resp))
    }

    async fn generate_image(
        &self,
        req: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, ProviderError> {
        let body = build_image_body(req);
        debug!(model = %req.model, size = %req.size, n = req.n, "sending image request to OpenAI");

        let api_resp: ImagesResponse = self
            .post("/v1/images/generations", &body)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parse_images(api_resp)
    }
}

fn build_request_body(req: &CompletionRequest) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": req.model,
        "messages": req.turns,
    });
    if let Some(temperature) = req.temperature {
        body["temperature"] = serde_json::json!(temperature);
    }
    if let Some(max_tokens) = req.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    body
}

fn build_image_body(req: &ImageRequest) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": req.model,
        "prompt": req.prompt,
        "n": req.n,
        "size": req.size,
        "response_format": "url",
    });
    if let Some(quality) = &req.quality {
        body["quality"] = serde_json::json!(quality);
    }
    if let Some(style) = &req.style {
        body["style"] = serde_json::json!(style);
    }
    if let Some(user) = &req.user {
        body["user"] = serde_json::json!(user);
    }
    body
}

fn parse_images(resp: ImagesResponse) -> Result<Vec<GeneratedImage>, ProviderError> {
    let images: Vec<GeneratedImage> = resp
        .data
        .into_iter()
        .filter_map(|d| {
            Some(GeneratedImage {
                url: d.url?,
                revised_prompt: d.revised_prompt,
            })
        })
        .collect();
    if images.is_empty() {
        return Err(ProviderError::Parse(
            "response contained no image URLs".to_string(),
        ));
    }
    Ok(images)
}

fn parse_response(resp: ApiResponse) -> Result<CompletionResponse, ProviderError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("response contained no choices".to_string()))?;

    Ok(CompletionResponse {
        content: choice.message.content.unwrap_or_default(),
        model: resp.model,
        usage: resp.usage.unwrap_or_default(),
    })
}

fn parse_moderation(resp: ModerationResponse) -> ModerationVerdict {
    let mut verdict = ModerationVerdict::default();
    for result in resp.results {
        if !result.flagged {
            continue;
        }
        verdict.flagged = true;
        let mut names: Vec<String> = result
            .categories
            .into_iter()
            .filter(|(_, hit)| *hit)
            .map(|(name, _)| name)
            .collect();
        names.sort();
        verdict.categories.extend(names);
    }
    verdict
}

// OpenAI API response types (deserialization only)

#[derive(Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: std::collections::HashMap<String, bool>,
}

#[derive(Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
    revised_prompt: Option<String>,
}
