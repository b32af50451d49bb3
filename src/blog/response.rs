use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::server::cors::no_cache_json;

use super::{ErrorKind, Failure, GenerationResult};

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorKind::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn into_response(result: GenerationResult) -> Response {
    match result {
        Ok(content) => no_cache_json(StatusCode::OK, json!({ "content": content })),
        Err(failure) => failure.into_response(),
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        no_cache_json(status_for(self.kind), json!({ "error": self.message }))
    }
}
