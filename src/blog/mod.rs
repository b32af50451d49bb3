//! Blog-post generation function.
//!
//! Every request runs the same linear pipeline: validate → build prompt →
//! one bounded provider call → map to an HTTP response.  Nothing is kept
//! between requests.

pub mod client;
pub mod prompt;
pub mod response;
pub mod validate;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use tracing::{debug, info};

use crate::server::routes::AppState;

pub use client::GenerationClient;

/// A validated generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub keywords: Vec<String>,
    pub tone: String,
}

/// Why a request did not produce content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MethodNotAllowed,
    Unauthorized,
    ValidationFailed,
    ProviderUnavailable,
    RateLimited,
    Timeout,
    Unexpected,
}

impl ErrorKind {
    /// Caller-caused conditions that are not worth a server-side log line.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::MethodNotAllowed | ErrorKind::Unauthorized | ErrorKind::ValidationFailed
        )
    }
}

/// A failed request: the kind picks the status, the message is what the
/// caller sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Generated markdown, or the failure that stopped the pipeline.
pub type GenerationResult = Result<String, Failure>;

/// `/functions/v1/generate-blog`
pub async fn generate(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return crate::server::cors::preflight();
    }

    let result = run(&state, &method, &headers, &body).await;
    match &result {
        Ok(content) => info!(content_len = content.len(), "blog post generated"),
        Err(f) if f.kind.is_client_error() => {
            debug!(kind = ?f.kind, error = %f.message, "blog request rejected")
        }
        Err(_) => {}
    }
    response::into_response(result)
}

async fn run(
    state: &AppState,
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> GenerationResult {
    let request = validate::validate(method, headers, body, state.bearer_token.as_deref())?;
    let prompt = prompt::build(&request);
    state.blog.generate(&prompt).await
}
