//! Email alert delivery via SMTP.
//!
//! The relay is configured from the environment (a `.env` file is honoured by
//! the binary). Without `SMTP_HOST` there is no relay and email dispatch
//! fails at send time.
//!
//! | Variable        | Required | Default            |
//! |-----------------|----------|--------------------|
//! | `SMTP_HOST`     | yes      |                    |
//! | `SMTP_PORT`     | no       | `587`              |
//! | `SMTP_FROM`     | no       | `vofo@localhost`   |
//! | `SMTP_USER`     | no       |                    |
//! | `SMTP_PASSWORD` | no       |                    |

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use tracing::debug;

use crate::alerts::{AlertChannel, AlertEvent};
use crate::error::DispatchError;
use crate::util::get_smtp_port;

const DEFAULT_FROM_ADDRESS: &str = "vofo@localhost";

#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl SmtpConfig {
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            host,
            port: get_smtp_port(),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            user: std::env::var("SMTP_USER").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

pub struct EmailChannel {
    recipient: String,
    config: SmtpConfig,
    host: String,
}

impl EmailChannel {
    pub fn new(recipient: String, config: SmtpConfig, host: String) -> Self {
        Self {
            recipient,
            config,
            host,
        }
    }

    pub fn build_message(&self, event: &AlertEvent) -> Result<Message, DispatchError> {
        let subject = format!("[vofo] {} alert on {}", event.kind, self.host);
        let body = format!(
            "Host: {}\nTime: {}\n\n{}",
            self.host,
            event.fired_at.to_rfc3339(),
            event.message
        );

        Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e| DispatchError::transport(self.name(), e))?,
            )
            .to(self
                .recipient
                .parse()
                .map_err(|e| DispatchError::transport(self.name(), e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| DispatchError::transport(self.name(), e))
    }
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), DispatchError> {
        let email = self.build_message(event)?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                .map_err(|e| DispatchError::transport(self.name(), e))?
                .port(self.config.port);

        if let (Some(user), Some(password)) = (&self.config.user, &self.config.password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        transport_builder
            .build()
            .send(email)
            .await
            .map_err(|e| DispatchError::transport(self.name(), e))?;

        debug!(to = %self.recipient, "alert email sent");
        Ok(())
    }
}
