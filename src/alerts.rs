use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::{
    ResourceKind,
    config::AlertChannelConfig,
    discord::DiscordChannel,
    email::{EmailChannel, SmtpConfig},
    error::DispatchError,
};

/// A fired alert. Built by a monitor when the gate opens, consumed by one dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    pub kind: ResourceKind,
    pub message: String,
    pub fired_at: DateTime<Utc>,
    pub percent_used: f64,
    pub threshold: f64,
    pub breach_duration: Duration,
}

impl AlertEvent {
    pub fn new(
        kind: ResourceKind,
        percent_used: f64,
        threshold: f64,
        breach_duration: Duration,
    ) -> Self {
        let message = format!(
            "Alert: {kind} usage ({percent_used:.2}%) exceeded threshold ({threshold:.2}%) for {:.2} seconds",
            breach_duration.as_secs_f64()
        );

        Self {
            kind,
            message,
            fired_at: Utc::now(),
            percent_used,
            threshold,
            breach_duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Email,
    Slack,
    Discord,
    Webhook,
}

impl ChannelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::Slack => "slack",
            ChannelKind::Discord => "discord",
            ChannelKind::Webhook => "webhook",
        }
    }
}

impl FromStr for ChannelKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(ChannelKind::Email),
            "slack" => Ok(ChannelKind::Slack),
            "discord" => Ok(ChannelKind::Discord),
            "webhook" => Ok(ChannelKind::Webhook),
            _ => Err(DispatchError::UnsupportedChannel(s.to_string())),
        }
    }
}

/// A concrete delivery target.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, event: &AlertEvent) -> Result<(), DispatchError>;
}

/// Routes alert events to the channel named in the configuration.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        event: &AlertEvent,
        channel: &AlertChannelConfig,
    ) -> Result<(), DispatchError>;
}

#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    client: Client,
    host: String,
    smtp: Option<SmtpConfig>,
}

/// Upper bound for a single HTTP delivery.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

impl AlertDispatcher {
    pub fn new(host: impl Into<String>, smtp: Option<SmtpConfig>) -> reqwest::Result<Self> {
        Self::with_timeout(host, smtp, DEFAULT_SEND_TIMEOUT)
    }

    /// Dispatcher whose HTTP deliveries give up after `timeout`.
    pub fn with_timeout(
        host: impl Into<String>,
        smtp: Option<SmtpConfig>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            host: host.into(),
            smtp,
        })
    }

    /// Dispatcher for the local host, with SMTP settings taken from the environment.
    pub fn from_env() -> reqwest::Result<Self> {
        let host = sysinfo::System::host_name().unwrap_or_else(|| String::from("unknown"));
        Self::new(host, SmtpConfig::from_env())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn resolve(
        &self,
        channel: &AlertChannelConfig,
    ) -> Result<Box<dyn AlertChannel>, DispatchError> {
        let kind: ChannelKind = channel.method.parse()?;

        let target: Box<dyn AlertChannel> = match kind {
            ChannelKind::Email => {
                let recipient = destination(&channel.email_recipient, kind, "email_recipient")?;
                let smtp = self.smtp.clone().ok_or_else(|| {
                    DispatchError::transport(kind.name(), "SMTP relay not configured (SMTP_HOST)")
                })?;
                Box::new(EmailChannel::new(recipient, smtp, self.host.clone()))
            }
            ChannelKind::Slack => {
                let url = destination(&channel.slack_webhook, kind, "slack_webhook")?;
                Box::new(SlackChannel {
                    client: self.client.clone(),
                    url,
                    host: self.host.clone(),
                })
            }
            ChannelKind::Discord => {
                let url = destination(&channel.discord_webhook, kind, "discord_webhook")?;
                Box::new(DiscordChannel::new(
                    self.client.clone(),
                    url,
                    channel.discord_user_id.clone(),
                    self.host.clone(),
                ))
            }
            ChannelKind::Webhook => {
                let url = destination(&channel.webhook_url, kind, "webhook_url")?;
                Box::new(WebhookChannel {
                    client: self.client.clone(),
                    url,
                    host: self.host.clone(),
                })
            }
        };
        Ok(target)
    }
}

#[async_trait]
impl Dispatcher for AlertDispatcher {
    #[instrument(skip_all, fields(resource = %event.kind, method = %channel.method))]
    async fn dispatch(
        &self,
        event: &AlertEvent,
        channel: &AlertChannelConfig,
    ) -> Result<(), DispatchError> {
        let target = self.resolve(channel)?;
        debug!("sending alert via {}", target.name());
        target.send(event).await
    }
}

fn destination(
    value: &Option<String>,
    kind: ChannelKind,
    field: &'static str,
) -> Result<String, DispatchError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .ok_or(DispatchError::MissingDestination {
            channel: kind.name(),
            field,
        })
}

/// POST `payload` as JSON and treat any non-2xx status as a failure.
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    payload: &T,
    channel: &'static str,
) -> Result<(), DispatchError> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|e| DispatchError::transport(channel, e))?;

    if response.status().is_success() {
        return Ok(());
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(DispatchError::transport(
        channel,
        format!("{channel} returned {status}: {body}"),
    ))
}

/// Slack incoming webhook.
pub struct SlackChannel {
    client: Client,
    url: String,
    host: String,
}

#[async_trait]
impl AlertChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), DispatchError> {
        let payload = json!({
            "text": format!(":warning: *{}* {}", self.host, event.message),
        });
        post_json(&self.client, &self.url, &payload, self.name()).await
    }
}

/// Generic JSON webhook.
pub struct WebhookChannel {
    client: Client,
    url: String,
    host: String,
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), DispatchError> {
        let payload = json!({
            "message": event.message,
            "host": self.host,
            "resource": event.kind,
            "percent_used": event.percent_used,
            "threshold": event.threshold,
            "breach_seconds": event.breach_duration.as_secs_f64(),
            "timestamp": event.fired_at.to_rfc3339()
        });
        post_json(&self.client, &self.url, &payload, self.name()).await
    }
}
