use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BlogConfig;
use crate::error::Result;

use super::{CompletionRequest, LlmBackend, ProviderError};

/// LLM backend for the OpenAI chat completions API (or any endpoint that
/// speaks the same wire format).
///
/// The HTTP client carries no overall request timeout: the caller bounds
/// each call with its own budget.
pub struct OpenAiEngine {
    client: Client,
    base_url: String,
    model: String,
}

// -- OpenAI request/response types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl OpenAiEngine {
    pub fn new(config: &BlogConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();

        info!(
            model = %config.model,
            base_url = %base_url,
            max_tokens = config.max_tokens,
            temperature = config.temperature,
            "OpenAI engine initialized"
        );

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
        })
    }
}

#[async_trait::async_trait]
impl LlmBackend for OpenAiEngine {
    fn name(&self) -> &str {
        "OpenAI API"
    }

    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest<'_>,
    ) -> std::result::Result<Option<String>, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(
            model = %self.model,
            prompt_len = request.user.len(),
            max_tokens = request.max_tokens,
            "invoking OpenAI API"
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::TimedOut
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();

        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            let err = classify_error(status, &error_text);
            warn!(status = %status, error = %err, "OpenAI API error");
            return Err(err);
        }

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        if let Some(ref usage) = chat_resp.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "OpenAI usage"
            );
        }

        Ok(first_content(chat_resp))
    }
}

fn first_content(resp: ChatResponse) -> Option<String> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
}

/// Classify a non-success response.
///
/// HTTP status decides first, then the structured `code`/`type` of the
/// error body; the message text is only consulted when neither is conclusive.
fn classify_error(status: StatusCode, body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error);

    let message = match parsed {
        Some(ref e) if !e.message.is_empty() => e.message.clone(),
        _ if body.is_empty() => status.to_string(),
        _ => body.to_string(),
    };
    let code = parsed
        .as_ref()
        .and_then(|e| e.code.as_deref().or(e.kind.as_deref()))
        .unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED => return ProviderError::Unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS => return ProviderError::RateLimited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            return ProviderError::TimedOut;
        }
        _ => {}
    }

    match code {
        "invalid_api_key" | "invalid_authentication" => ProviderError::Unauthorized(message),
        "rate_limit_exceeded" | "insufficient_quota" => ProviderError::RateLimited(message),
        _ if message.to_lowercase().contains("rate limit") => ProviderError::RateLimited(message),
        _ => ProviderError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
