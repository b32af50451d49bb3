use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::CheckoutConfig;
use crate::error::{NextWaveError, Result};

use super::{PaymentGateway, SessionRequest};

/// Checkout sessions through the Stripe REST API.
pub struct StripeGateway {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl StripeGateway {
    pub fn new(config: &CheckoutConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Stripe's form encoding for a single-item checkout session.
fn session_form(request: &SessionRequest) -> Vec<(&'static str, &str)> {
    vec![
        ("payment_method_types[0]", "card"),
        ("line_items[0][price]", request.price_id.as_str()),
        ("line_items[0][quantity]", "1"),
        ("mode", request.mode.as_str()),
        ("success_url", request.success_url.as_str()),
        ("cancel_url", request.cancel_url.as_str()),
    ]
}

/// Stripe's own error message, or the bare status when the body has none.
fn stripe_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Stripe returned {status}"))
}

fn session_id(body: &str) -> Result<String> {
    let session: SessionResponse = serde_json::from_str(body)?;
    Ok(session.id)
}

#[async_trait::async_trait]
impl PaymentGateway for StripeGateway {
    fn name(&self) -> &str {
        "Stripe"
    }

    async fn create_session(&self, secret_key: &str, request: &SessionRequest) -> Result<String> {
        let url = format!("{}/checkout/sessions", self.base_url);
        debug!(price = %request.price_id, mode = request.mode.as_str(), "creating Stripe checkout session");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(secret_key)
            .form(&session_form(request))
            .send()
            .await
            .map_err(|e| NextWaveError::Payment(format!("Stripe request failed: {e}")))?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = stripe_error_message(status, &body);
            warn!(status = %status, error = %message, "Stripe API error");
            return Err(NextWaveError::Payment(message));
        }

        session_id(&body)
    }
}
