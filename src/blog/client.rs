use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::config::BlogConfig;
use crate::llm::{CompletionRequest, LlmBackend, ProviderError};

use super::{ErrorKind, Failure, GenerationResult};

const UNAVAILABLE: &str =
    "The blog generation service is temporarily unavailable. Please try again later.";
const RATE_LIMITED: &str = "Too many requests. Please wait a moment and try again.";
const TIMED_OUT: &str = "The request took too long to complete. Please try again.";
const NO_CONTENT: &str = "No content was generated. Please try again.";
const FAILED: &str = "Failed to generate blog content. Please try again.";

/// Issues one bounded completion call per request and folds every outcome
/// into a [`GenerationResult`].
///
/// The provider credential is injected here rather than read per call; a
/// missing credential short-circuits before the backend is touched.
pub struct GenerationClient {
    backend: Arc<dyn LlmBackend>,
    api_key: Option<String>,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
    budget: Duration,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn LlmBackend>, api_key: Option<String>, config: &BlogConfig) -> Self {
        Self {
            backend,
            api_key,
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            budget: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Generate content for an already-built prompt.
    pub async fn generate(&self, prompt: &str) -> GenerationResult {
        let Some(api_key) = self.api_key.as_deref() else {
            error!("OpenAI API key is not configured");
            return Err(Failure::new(ErrorKind::ProviderUnavailable, UNAVAILABLE));
        };

        let request = CompletionRequest {
            system: &self.system_prompt,
            user: prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        // Whichever settles first wins; on timeout the call future is dropped.
        let outcome = tokio::time::timeout(self.budget, self.backend.complete(api_key, &request)).await;

        match outcome {
            Err(_) => {
                warn!(
                    backend = self.backend.name(),
                    budget_secs = self.budget.as_secs(),
                    "generation timed out"
                );
                Err(Failure::new(ErrorKind::Timeout, TIMED_OUT))
            }
            Ok(Err(e)) => Err(map_provider_error(e)),
            Ok(Ok(Some(content))) if !content.trim().is_empty() => Ok(content),
            Ok(Ok(_)) => {
                warn!(backend = self.backend.name(), "provider returned no content");
                Err(Failure::new(ErrorKind::Unexpected, NO_CONTENT))
            }
        }
    }
}

fn map_provider_error(err: ProviderError) -> Failure {
    match err {
        ProviderError::Unauthorized(detail) => {
            error!(%detail, "provider rejected the API key");
            Failure::new(ErrorKind::ProviderUnavailable, UNAVAILABLE)
        }
        ProviderError::RateLimited(detail) => {
            warn!(%detail, "provider rate limit hit");
            Failure::new(ErrorKind::RateLimited, RATE_LIMITED)
        }
        ProviderError::TimedOut => {
            warn!("provider reported a timeout");
            Failure::new(ErrorKind::Timeout, TIMED_OUT)
        }
        ProviderError::Api { status, message } => {
            error!(status, error = %message, "provider error");
            Failure::new(ErrorKind::Unexpected, message)
        }
        other @ (ProviderError::Transport(_) | ProviderError::Malformed(_)) => {
            error!(error = %other, "provider call failed");
            Failure::new(ErrorKind::Unexpected, FAILED)
        }
    }
}
