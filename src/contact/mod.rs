//! Contact-form function: forwards a visitor's message to the agency inbox.

mod smtp;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::error::{NextWaveError, Result};
use crate::server::cors;
use crate::server::routes::AppState;

pub use smtp::SmtpMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// A fully rendered notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEmail {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Mail delivery backend.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &ContactEmail) -> Result<()>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Invalid JSON in request body")]
    InvalidBody,

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("Email address is invalid")]
    InvalidEmail,

    #[error("Email sending failed: {0}")]
    Delivery(String),
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        let status = match self {
            ContactError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ContactError::InvalidBody | ContactError::Missing(_) | ContactError::InvalidEmail => {
                StatusCode::BAD_REQUEST
            }
            ContactError::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        cors::no_cache_json(status, json!({ "error": self.to_string() }))
    }
}

#[derive(Deserialize)]
struct RawContact {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ContactRequest {
    pub fn parse(body: &[u8]) -> std::result::Result<Self, ContactError> {
        let raw: RawContact = serde_json::from_slice(body).map_err(|_| ContactError::InvalidBody)?;

        let field = |value: Option<String>, label: &'static str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ContactError::Missing(label))
        };

        let name = field(raw.name, "Name")?;
        let email = field(raw.email, "Email")?;
        let message = field(raw.message, "Message")?;

        if email.parse::<lettre::Address>().is_err() {
            return Err(ContactError::InvalidEmail);
        }

        Ok(Self {
            name,
            email,
            message,
        })
    }
}

pub struct ContactService {
    /// `None` when SMTP is not configured.
    mailer: Option<Arc<dyn Mailer>>,
    inbox: String,
    site_name: String,
}

impl ContactService {
    pub fn new(mailer: Option<Arc<dyn Mailer>>, inbox: String, site_name: String) -> Self {
        Self {
            mailer,
            inbox,
            site_name,
        }
    }

    /// Render the notification sent to the agency inbox.
    pub fn render(&self, request: &ContactRequest) -> ContactEmail {
        let ContactRequest {
            name,
            email,
            message,
        } = request;
        let site = &self.site_name;

        let text = format!(
            "New Contact Form Submission\n\nName: {name}\nEmail: {email}\n\nMessage:\n{message}\n\n--\nSent from {site} contact form\n"
        );

        let (name, email, site) = (escape_html(name), escape_html(email), escape_html(site));
        let message = escape_html(message).replace('\n', "<br>");
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #3A36DB;">New Contact Form Submission</h2>
  <div style="background: #f8f9fa; padding: 20px; border-radius: 8px;">
    <p><strong>Name:</strong> {name}</p>
    <p><strong>Email:</strong> <a href="mailto:{email}">{email}</a></p>
    <p><strong>Message:</strong></p>
    <div style="white-space: pre-wrap; background: white; padding: 15px; border-radius: 4px; margin-top: 10px;">
      {message}
    </div>
  </div>
  <p style="color: #666; font-size: 12px; margin-top: 20px;">
    This message was sent from the {site} contact form.
  </p>
</div>"#
        );

        ContactEmail {
            from: self.inbox.clone(),
            to: self.inbox.clone(),
            reply_to: request.email.clone(),
            subject: format!("New Contact Form Message from {}", request.name),
            text,
            html,
        }
    }

    pub async fn deliver(&self, request: &ContactRequest) -> std::result::Result<(), ContactError> {
        let Some(mailer) = &self.mailer else {
            error!("SMTP credentials not configured");
            return Err(ContactError::Delivery("SMTP credentials not configured".into()));
        };

        let email = self.render(request);
        debug!(reply_to = %email.reply_to, "sending contact email");
        mailer.send(&email).await.map_err(|e| {
            error!("contact email failed: {e}");
            match e {
                NextWaveError::Mail(reason) => ContactError::Delivery(reason),
                other => ContactError::Delivery(other.to_string()),
            }
        })
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// `/functions/v1/send-email`
pub async fn send(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if method == Method::OPTIONS {
        return cors::preflight();
    }

    match run(&state, &method, &body).await {
        Ok(()) => {
            info!("contact email sent");
            cors::no_cache_json(StatusCode::OK, json!({ "success": true }))
        }
        Err(e) => e.into_response(),
    }
}

async fn run(state: &AppState, method: &Method, body: &[u8]) -> std::result::Result<(), ContactError> {
    if method != Method::POST {
        return Err(ContactError::MethodNotAllowed);
    }
    let request = ContactRequest::parse(body)?;
    state.contact.deliver(&request).await
}
