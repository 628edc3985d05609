use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::MailConfig;

const SUBJECT: &str = "Domain/SSL Expiry Reminder";

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The outbound channel has no credentials or addresses.
    #[error("dispatcher not configured: {0}")]
    Configuration(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivers a reminder to a human. One call sends at most one message and
/// never retries.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), DispatchError>;

    fn channel_name(&self) -> &str;
}

struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    to: String,
}

/// SMTP dispatcher. Built even without credentials so that the scan keeps
/// running and every send reports a configuration error instead.
pub struct EmailDispatcher {
    mailer: Result<Mailer, String>,
}

impl EmailDispatcher {
    pub fn from_config(config: &MailConfig) -> Self {
        Self { mailer: build_mailer(config) }
    }

    pub fn is_configured(&self) -> bool {
        self.mailer.is_ok()
    }

    fn build_message(mailer: &Mailer, body: &str) -> Result<Message, DispatchError> {
        let from: Mailbox = mailer
            .from
            .parse()
            .map_err(|_| DispatchError::Configuration(format!("invalid sender address: {}", mailer.from)))?;
        let to: Mailbox = mailer
            .to
            .parse()
            .map_err(|_| DispatchError::Configuration(format!("invalid recipient address: {}", mailer.to)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| DispatchError::Delivery(format!("failed to build message: {}", e)))
    }
}

fn build_mailer(config: &MailConfig) -> Result<Mailer, String> {
    let (Some(sender), Some(password), Some(recipient)) =
        (config.sender.clone(), config.password.clone(), config.recipient.clone())
    else {
        return Err("EMAIL and EMAIL_PASS must be set to send reminders".to_string());
    };

    let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        .map_err(|e| format!("invalid SMTP relay {}: {}", config.smtp_host, e))?
        .port(config.smtp_port)
        .credentials(Credentials::new(sender.clone(), password))
        .build();

    Ok(Mailer {
        transport,
        from: sender,
        to: recipient,
    })
}

#[async_trait]
impl Dispatcher for EmailDispatcher {
    async fn send(&self, message: &str) -> Result<(), DispatchError> {
        let mailer = self
            .mailer
            .as_ref()
            .map_err(|reason| DispatchError::Configuration(reason.clone()))?;

        let email = Self::build_message(mailer, message)?;
        mailer
            .transport
            .send(email)
            .await
            .map_err(|e| DispatchError::Delivery(e.to_string()))?;

        log::info!("Email notification sent: {}", message);
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}
