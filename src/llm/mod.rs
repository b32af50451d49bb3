mod openai;

use thiserror::Error;

pub use openai::OpenAiEngine;

/// One chat-style completion: a system instruction, the user prompt and the
/// sampling bounds.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Failures reported by a completion provider, classified at the provider
/// boundary so callers never inspect message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider rejected the credential: {0}")]
    Unauthorized(String),

    #[error("provider rate limit: {0}")]
    RateLimited(String),

    #[error("provider timed out")]
    TimedOut,

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("unreadable provider response: {0}")]
    Malformed(String),
}

/// Trait implemented by every text-generation backend.
#[async_trait::async_trait]
pub trait LlmBackend: Send + Sync {
    /// Human-readable name of this backend (e.g. "OpenAI API").
    fn name(&self) -> &str;

    /// Issue exactly one completion call.
    ///
    /// `Ok(None)` means the provider answered but produced no text.
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest<'_>,
    ) -> std::result::Result<Option<String>, ProviderError>;
}
