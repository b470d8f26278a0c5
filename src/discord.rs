use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::ResourceKind;
use crate::alerts::{AlertChannel, AlertEvent, post_json};
use crate::error::DispatchError;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

/// Discord webhook channel. Mentions `user_id` when configured.
pub struct DiscordChannel {
    client: Client,
    url: String,
    user_id: Option<String>,
    host: String,
}

impl DiscordChannel {
    pub fn new(client: Client, url: String, user_id: Option<String>, host: String) -> Self {
        Self {
            client,
            url,
            user_id,
            host,
        }
    }

    pub fn build_message(&self, event: &AlertEvent) -> Message {
        let mut message_builder = MessageBuilder::new().add_embed(self.build_resource_embed(event));
        if let Some(user_id) = &self.user_id {
            message_builder = message_builder.content(format!(
                "{} ({} ~ {:.1}%) <@{user_id}>",
                emoji(event.kind),
                self.host,
                event.percent_used
            ));
        }
        message_builder.build()
    }

    pub fn build_resource_embed(&self, event: &AlertEvent) -> Embed {
        let kind = event.kind;
        let progress_bar = create_progress_bar(event.percent_used, event.threshold);

        Embed {
            title: Some(format!("{} {kind} Usage Alert", emoji(kind))),
            description: Some(format!(
                "Host **{}** {kind} usage has exceeded the limit for {:.0}s!",
                self.host,
                event.breach_duration.as_secs_f64()
            )),
            color: Some(color(kind)),
            fields: vec![
                EmbedField {
                    name: format!("{} Current {kind} Usage", emoji(kind)),
                    value: format!("{:.1}%", event.percent_used),
                    inline: true,
                },
                EmbedField {
                    name: "⚠️ Limit".to_string(),
                    value: format!("{:.1}%", event.threshold),
                    inline: true,
                },
                EmbedField {
                    name: "📊 Status".to_string(),
                    value: progress_bar,
                    inline: false,
                },
            ],
            footer: Some(EmbedFooter {
                text: format!("Host: {}", self.host),
            }),
            timestamp: Some(event.fired_at.to_rfc3339()),
        }
    }
}

#[async_trait]
impl AlertChannel for DiscordChannel {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), DispatchError> {
        post_json(&self.client, &self.url, &self.build_message(event), self.name()).await
    }
}

fn emoji(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Cpu => "💻",
        ResourceKind::Memory => "🧠",
        ResourceKind::Disk => "💾",
    }
}

fn color(kind: ResourceKind) -> u32 {
    match kind {
        ResourceKind::Cpu => 15105570,    // Orange
        ResourceKind::Memory => 10181046, // Purple
        ResourceKind::Disk => 15158332,   // Red
    }
}

fn create_progress_bar(current: f64, limit: f64) -> String {
    let percentage = (current / limit) * 100.0;
    let filled = ((current / limit) * 10.0) as usize;
    let empty = 10 - filled.min(10);

    let bar = "█".repeat(filled.min(10)) + &"░".repeat(empty);
    let status_emoji = if percentage >= 100.0 {
        "🔴"
    } else if percentage >= 80.0 {
        "🟠"
    } else if percentage >= 60.0 {
        "🟡"
    } else {
        "🟢"
    };

    format!("{} `{}` {:.1}% of limit", status_emoji, bar, percentage)
}
