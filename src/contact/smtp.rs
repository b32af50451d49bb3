use std::time::Duration;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::SmtpSettings;
use crate::error::{NextWaveError, Result};

use super::{ContactEmail, Mailer};

/// Delivers contact emails through an authenticated STARTTLS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, timeout: Duration) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| NextWaveError::Mail(format!("invalid SMTP relay {}: {e}", settings.host)))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(timeout))
            .build();

        info!(
            host = %settings.host,
            port = settings.port,
            user = %settings.user,
            "SMTP mailer initialized"
        );

        Ok(Self { transport })
    }
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| NextWaveError::Mail(format!("invalid address {address}: {e}")))
}

fn build_message(email: &ContactEmail) -> Result<Message> {
    Message::builder()
        .from(mailbox(&email.from)?)
        .to(mailbox(&email.to)?)
        .reply_to(mailbox(&email.reply_to)?)
        .subject(email.subject.as_str())
        .multipart(MultiPart::alternative_plain_html(
            email.text.clone(),
            email.html.clone(),
        ))
        .map_err(|e| NextWaveError::Mail(format!("failed to build message: {e}")))
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &ContactEmail) -> Result<()> {
        let message = build_message(email)?;
        debug!(subject = %email.subject, "sending via SMTP");
        self.transport
            .send(message)
            .await
            .map_err(|e| NextWaveError::Mail(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> ContactEmail {
        ContactEmail {
            from: "hello@nextwave.dev".into(),
            to: "hello@nextwave.dev".into(),
            reply_to: "ada@example.com".into(),
            subject: "New Contact Form Message from Ada".into(),
            text: "plain".into(),
            html: "<p>html</p>".into(),
        }
    }

    #[test]
    fn message_carries_reply_to_and_both_bodies() {
        let formatted = String::from_utf8(build_message(&email()).unwrap().formatted()).unwrap();
        assert!(formatted.contains("Reply-To: ada@example.com"));
        assert!(formatted.contains("Subject: New Contact Form Message from Ada"));
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("plain"));
        assert!(formatted.contains("<p>html</p>"));
    }

    #[test]
    fn bad_address_is_a_mail_error() {
        let mut e = email();
        e.reply_to = "nobody".into();
        assert!(matches!(build_message(&e), Err(NextWaveError::Mail(_))));
    }

    #[tokio::test]
    async fn mailer_builds_without_connecting() {
        let settings = SmtpSettings {
            host: "smtp.example.com".into(),
            port: 2525,
            user: "hello@nextwave.dev".into(),
            password: "secret".into(),
        };
        assert!(SmtpMailer::new(&settings, Duration::from_secs(5)).is_ok());
    }
}
