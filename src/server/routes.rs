use std::sync::Arc;

use axum::routing::{any, get};
use axum::{Json, Router};

use crate::blog::{self, GenerationClient};
use crate::checkout::{self, CheckoutService};
use crate::contact::{self, ContactService};

use super::cors;

/// State shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub blog: Arc<GenerationClient>,
    pub checkout: Arc<CheckoutService>,
    pub contact: Arc<ContactService>,
    /// Bearer token callers must present to the blog function, if pinned.
    pub bearer_token: Option<Arc<str>>,
}

pub fn build(state: AppState) -> Router {
    let functions = Router::new()
        .route("/functions/v1/generate-blog", any(blog::generate))
        .route("/functions/v1/create-checkout", any(checkout::create))
        .route("/functions/v1/send-email", any(contact::send))
        .route("/healthz", get(healthz));

    cors::apply(functions).with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::blog::client::tests::FakeBackend;
    use crate::checkout::tests::RecordingGateway;
    use crate::config::{BlogConfig, CheckoutConfig};
    use crate::contact::tests::RecordingMailer;
    use crate::llm::ProviderError;

    const BLOG: &str = "/functions/v1/generate-blog";
    const VALID_BODY: &str = r#"{"topic":"Web performance","keywords":["core web vitals","caching"],"tone":"practical"}"#;

    fn state(backend: Arc<FakeBackend>, key: Option<&str>) -> AppState {
        AppState {
            blog: Arc::new(GenerationClient::new(
                backend,
                key.map(str::to_string),
                &BlogConfig::default(),
            )),
            checkout: Arc::new(CheckoutService::new(
                RecordingGateway::ok(),
                Some("sk_test".into()),
                &CheckoutConfig::default(),
            )),
            contact: Arc::new(ContactService::new(
                Some(RecordingMailer::new()),
                "hello@nextwave.dev".into(),
                "NextWave Digital Solutions".into(),
            )),
            bearer_token: None,
        }
    }

    fn ok_backend() -> Arc<FakeBackend> {
        FakeBackend::replying(Ok(Some("# Fast sites\n\nAlways cache.".into())))
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(AUTHORIZATION, "Bearer anon-key")
            .header(CONTENT_TYPE, "application/json")
            .header(ORIGIN, "https://nextwave.dev")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn call(state: AppState, req: Request<Body>) -> Response {
        build(state).oneshot(req).await.unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_cors(resp: &Response) {
        for (name, value) in cors::CORS_HEADERS {
            assert_eq!(resp.headers()[&name], value, "header {name}");
        }
    }

    #[tokio::test]
    async fn preflight_is_empty_204_on_every_function() {
        for uri in [BLOG, "/functions/v1/create-checkout", "/functions/v1/send-email"] {
            let req = Request::builder()
                .method("OPTIONS")
                .uri(uri)
                .body(Body::from("not even json"))
                .unwrap();
            let resp = call(state(ok_backend(), Some("k")), req).await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
            assert_cors(&resp);
            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            assert!(bytes.is_empty());
        }
    }

    #[tokio::test]
    async fn other_methods_are_405() {
        for method in ["GET", "PUT", "DELETE", "PATCH"] {
            let req = Request::builder()
                .method(method)
                .uri(BLOG)
                .header(AUTHORIZATION, "Bearer anon-key")
                .body(Body::from(VALID_BODY))
                .unwrap();
            let resp = call(state(ok_backend(), Some("k")), req).await;
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_cors(&resp);
            assert_eq!(json_body(resp).await, json!({ "error": "Method not allowed" }));
        }
    }

    #[tokio::test]
    async fn missing_authorization_is_401_even_with_valid_body() {
        let req = Request::builder()
            .method("POST")
            .uri(BLOG)
            .body(Body::from(VALID_BODY))
            .unwrap();
        let backend = ok_backend();
        let resp = call(state(backend.clone(), Some("k")), req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_cors(&resp);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn pinned_token_rejects_other_tokens() {
        let mut s = state(ok_backend(), Some("k"));
        s.bearer_token = Some(Arc::from("the-real-token"));
        let resp = call(s, post(BLOG, VALID_BODY)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_fields_are_400() {
        let cases = [
            (r#"{"keywords":["a"],"tone":"calm"}"#, "Topic"),
            (r#"{"topic":"t","tone":"calm"}"#, "keyword"),
            (r#"{"topic":"t","keywords":["a"]}"#, "Tone"),
        ];
        for (body, field) in cases {
            let backend = ok_backend();
            let resp = call(state(backend.clone(), Some("k")), post(BLOG, body)).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let error = json_body(resp).await["error"].as_str().unwrap().to_string();
            assert!(error.contains(field), "{error} should mention {field}");
            assert_eq!(backend.call_count(), 0);
        }
    }

    #[tokio::test]
    async fn valid_request_returns_content_verbatim() {
        let resp = call(state(ok_backend(), Some("k")), post(BLOG, VALID_BODY)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_cors(&resp);
        assert_eq!(resp.headers()["cache-control"], "no-cache");
        assert_eq!(
            json_body(resp).await,
            json!({ "content": "# Fast sites\n\nAlways cache." })
        );
    }

    #[tokio::test]
    async fn missing_credential_is_503_without_provider_call() {
        let backend = ok_backend();
        let resp = call(state(backend.clone(), None), post(BLOG, VALID_BODY)).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_cors(&resp);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn provider_rate_limit_is_429() {
        let backend = FakeBackend::replying(Err(ProviderError::RateLimited("slow down".into())));
        let resp = call(state(backend, Some("k")), post(BLOG, VALID_BODY)).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_is_504_without_content() {
        let backend = FakeBackend::slow(Duration::from_secs(120));
        let resp = call(state(backend, Some("k")), post(BLOG, VALID_BODY)).await;
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = json_body(resp).await;
        assert!(body.get("content").is_none());
        assert!(body["error"].as_str().unwrap().contains("too long"));
    }

    #[tokio::test]
    async fn checkout_returns_session_id() {
        let resp = call(
            state(ok_backend(), Some("k")),
            post("/functions/v1/create-checkout", r#"{"plan":"pro"}"#),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_cors(&resp);
        assert_eq!(json_body(resp).await, json!({ "sessionId": "cs_test_123" }));
    }

    #[tokio::test]
    async fn checkout_rejects_unknown_plan() {
        for body in [r#"{"plan":"platinum"}"#, r#"{"plan":3}"#, "{}"] {
            let resp = call(
                state(ok_backend(), Some("k")),
                post("/functions/v1/create-checkout", body),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json_body(resp).await, json!({ "error": "Invalid plan selected" }));
        }
    }

    #[tokio::test]
    async fn contact_form_is_sent() {
        let resp = call(
            state(ok_backend(), Some("k")),
            post(
                "/functions/v1/send-email",
                r#"{"name":"Ada","email":"ada@example.com","message":"Need a site"}"#,
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_cors(&resp);
        assert_eq!(json_body(resp).await, json!({ "success": true }));
    }

    #[tokio::test]
    async fn contact_form_requires_fields() {
        let resp = call(
            state(ok_backend(), Some("k")),
            post("/functions/v1/send-email", r#"{"name":"Ada"}"#),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let resp = call(state(ok_backend(), None), req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(json_body(resp).await, json!({ "status": "ok" }));
    }
}
