// Discord webhook notification sink
use crate::application::notification::{Notification, NotificationLevel, NotificationSink};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

const SUMMARY_COLOR: u32 = 0x10A5E1;
const ERROR_COLOR: u32 = 0xFF0000;

// Discord rejects embeds above these sizes
const MAX_TITLE_CHARS: usize = 256;
const MAX_DESCRIPTION_CHARS: usize = 4096;

#[derive(Debug, Serialize, PartialEq)]
struct WebhookPayload {
    username: String,
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize, PartialEq)]
struct Embed {
    title: String,
    description: String,
    color: u32,
}

pub struct DiscordWebhook {
    http: reqwest::Client,
    url: String,
    username: String,
}

impl DiscordWebhook {
    pub fn new(url: String, username: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            url,
            username,
        })
    }

    fn payload(&self, notification: &Notification) -> WebhookPayload {
        let color = match notification.level {
            NotificationLevel::Summary => SUMMARY_COLOR,
            NotificationLevel::Error => ERROR_COLOR,
        };
        WebhookPayload {
            username: self.username.clone(),
            embeds: vec![Embed {
                title: truncate(&notification.title, MAX_TITLE_CHARS),
                description: truncate(&notification.body, MAX_DESCRIPTION_CHARS),
                color,
            }],
        }
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhook {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .json(&self.payload(notification))
            .send()
            .await
            .context("Failed to send message to Discord")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Discord webhook failed with status {}: {}", status, body);
        }

        info!("Sent \"{}\" to Discord", notification.title);
        Ok(())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let webhook = DiscordWebhook::new(
            "https://discord.invalid/api/webhooks/1/abc".to_string(),
            "garmin-connect-bot".to_string(),
        )
        .unwrap();
        let payload = webhook.payload(&Notification {
            title: "⚠ Error in daily-summary".to_string(),
            body: "```boom```".to_string(),
            level: NotificationLevel::Error,
        });

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["username"], "garmin-connect-bot");
        assert_eq!(json["embeds"][0]["color"], 0xFF0000);
        assert_eq!(json["embeds"][0]["description"], "```boom```");
    }

    #[test]
    fn test_truncate_long_text() {
        let long = "x".repeat(5000);
        let out = truncate(&long, MAX_DESCRIPTION_CHARS);
        assert_eq!(out.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(out.ends_with('…'));
        assert_eq!(truncate("short", 10), "short");
    }
}
