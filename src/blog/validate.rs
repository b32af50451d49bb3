use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method};
use serde_json::Value;

use super::{ErrorKind, Failure, GenerationRequest};

/// Check an inbound request and extract its fields.
///
/// Checks run in a fixed order (method, authorization, body, topic,
/// keywords, tone) and the first failing one decides the error.  When
/// `expected_token` is set the bearer token must equal it.
pub fn validate(
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
    expected_token: Option<&str>,
) -> Result<GenerationRequest, Failure> {
    if method != Method::POST {
        return Err(Failure::new(ErrorKind::MethodNotAllowed, "Method not allowed"));
    }

    match bearer_token(headers) {
        Some(token) if expected_token.is_none_or(|expected| expected == token) => {}
        _ => {
            return Err(Failure::new(
                ErrorKind::Unauthorized,
                "Missing or invalid authorization header",
            ));
        }
    }

    let body: Value = serde_json::from_slice(body).map_err(|_| invalid_json())?;
    let Value::Object(fields) = body else {
        return Err(invalid_json());
    };

    let topic = non_blank(fields.get("topic")).ok_or_else(|| required("Topic is required"))?;

    let keywords = match fields.get("keywords") {
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>(),
        _ => None,
    }
    .ok_or_else(|| required("At least one keyword is required"))?;

    let tone = non_blank(fields.get("tone")).ok_or_else(|| required("Tone is required"))?;

    Ok(GenerationRequest {
        topic,
        keywords,
        tone,
    })
}

/// The token of a well-formed `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn invalid_json() -> Failure {
    Failure::new(ErrorKind::ValidationFailed, "Invalid JSON in request body")
}

fn required(message: &str) -> Failure {
    Failure::new(ErrorKind::ValidationFailed, message)
}
