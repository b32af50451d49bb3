//! Checkout-session function for the pricing page.

mod stripe;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::ORIGIN;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::{CheckoutConfig, PlanPrices};
use crate::error::{NextWaveError, Result};
use crate::server::cors;
use crate::server::routes::AppState;

pub use stripe::StripeGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Starter,
    Pro,
    Infinite,
}

impl Plan {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "starter" => Some(Plan::Starter),
            "pro" => Some(Plan::Pro),
            "infinite" => Some(Plan::Infinite),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Starter => "starter",
            Plan::Pro => "pro",
            Plan::Infinite => "infinite",
        }
    }

    pub fn price_id(self, prices: &PlanPrices) -> &str {
        match self {
            Plan::Starter => &prices.starter,
            Plan::Pro => &prices.pro,
            Plan::Infinite => &prices.infinite,
        }
    }

    /// The unlimited plan bills monthly; the others are one-off payments.
    pub fn mode(self) -> CheckoutMode {
        match self {
            Plan::Infinite => CheckoutMode::Subscription,
            Plan::Starter | Plan::Pro => CheckoutMode::Payment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

/// Everything the payment processor needs to open a hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub price_id: String,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
}

impl SessionRequest {
    pub fn new(plan: Plan, prices: &PlanPrices, origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            price_id: plan.price_id(prices).to_string(),
            mode: plan.mode(),
            success_url: format!("{origin}/onboarding?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{origin}#pricing"),
        }
    }
}

/// Payment processor able to create checkout sessions.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &str;

    /// Create a session and return its id.
    async fn create_session(&self, secret_key: &str, request: &SessionRequest) -> Result<String>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Invalid JSON in request body")]
    InvalidBody,

    #[error("Invalid plan selected")]
    InvalidPlan,

    #[error("Missing Origin header")]
    MissingOrigin,

    #[error("Checkout is temporarily unavailable. Please try again later.")]
    NotConfigured,

    #[error("{0}")]
    Gateway(String),
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let status = match self {
            CheckoutError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            CheckoutError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            CheckoutError::InvalidBody
            | CheckoutError::InvalidPlan
            | CheckoutError::MissingOrigin
            | CheckoutError::Gateway(_) => StatusCode::BAD_REQUEST,
        };
        cors::no_cache_json(status, json!({ "error": self.to_string() }))
    }
}

pub struct CheckoutService {
    gateway: Arc<dyn PaymentGateway>,
    secret_key: Option<String>,
    prices: PlanPrices,
}

impl CheckoutService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        secret_key: Option<String>,
        config: &CheckoutConfig,
    ) -> Self {
        Self {
            gateway,
            secret_key,
            prices: config.prices.clone(),
        }
    }

    /// Open a checkout session for `plan`, returning to `origin` afterwards.
    pub async fn create_session(
        &self,
        plan: Plan,
        origin: &str,
    ) -> std::result::Result<String, CheckoutError> {
        let Some(secret_key) = self.secret_key.as_deref() else {
            error!("STRIPE_SECRET_KEY is not configured");
            return Err(CheckoutError::NotConfigured);
        };

        let request = SessionRequest::new(plan, &self.prices, origin);
        self.gateway
            .create_session(secret_key, &request)
            .await
            .map_err(|e| {
                error!(gateway = self.gateway.name(), plan = plan.as_str(), "checkout session failed: {e}");
                match e {
                    NextWaveError::Payment(message) => CheckoutError::Gateway(message),
                    other => CheckoutError::Gateway(other.to_string()),
                }
            })
    }
}

/// `/functions/v1/create-checkout`
pub async fn create(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return cors::preflight();
    }

    match run(&state, &method, &headers, &body).await {
        Ok(session_id) => cors::no_cache_json(StatusCode::OK, json!({ "sessionId": session_id })),
        Err(e) => e.into_response(),
    }
}

async fn run(
    state: &AppState,
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> std::result::Result<String, CheckoutError> {
    if method != Method::POST {
        return Err(CheckoutError::MethodNotAllowed);
    }

    let body: Value = serde_json::from_slice(body).map_err(|_| CheckoutError::InvalidBody)?;
    let plan = body
        .get("plan")
        .and_then(Value::as_str)
        .and_then(Plan::parse)
        .ok_or_else(|| {
            let raw = body.get("plan").cloned().unwrap_or_default();
            debug!(plan = %raw, "invalid plan selected");
            CheckoutError::InvalidPlan
        })?;

    let origin = headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|o| !o.is_empty())
        .ok_or(CheckoutError::MissingOrigin)?;

    let session_id = state.checkout.create_session(plan, origin).await?;
    info!(plan = plan.as_str(), session_id = %session_id, "checkout session created");
    Ok(session_id)
}
