use crate::models::{AlertEvent, AlertReason};
use crate::plugins::traits::{NotificationResult, NotifierPlugin};
use crate::utils::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const WEBHOOK_PREFIX: &str = "https://discord.com/api/webhooks/";

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub webhook_url: String,
    pub username: Option<String>,
}

impl DiscordConfig {
    pub fn new(webhook_url: impl Into<String>, username: Option<String>) -> Result<Self, String> {
        let webhook_url = webhook_url.into();
        if !webhook_url.starts_with(WEBHOOK_PREFIX) {
            return Err("Invalid Discord webhook URL format".to_string());
        }

        Ok(DiscordConfig { webhook_url, username })
    }
}

pub struct DiscordNotifier {
    client: Client,
    config: DiscordConfig,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        DiscordNotifier { client, config }
    }

    /// Skip URL validation; lets tests point the notifier at a local server.
    #[cfg(test)]
    fn with_endpoint(webhook_url: String) -> Self {
        Self::new(DiscordConfig {
            webhook_url,
            username: Some("Ticket Watcher".to_string()),
        })
    }

    fn get_embed_color(&self, reason: &AlertReason) -> u32 {
        match reason {
            AlertReason::Changed => 0x0099ff,            // Blue for changes
            AlertReason::InitialMismatch => 0xff9900,    // Orange for first mismatch
            AlertReason::PersistingMismatch => 0xff0000, // Red while it stays wrong
        }
    }

    fn get_emoji(&self, reason: &AlertReason) -> &str {
        match reason {
            AlertReason::Changed => "🔄",
            AlertReason::InitialMismatch => "⚠️",
            AlertReason::PersistingMismatch => "🚨",
        }
    }

    fn create_embed(&self, event: &AlertEvent) -> serde_json::Value {
        let mut fields = vec![json!({
            "name": "Current",
            "value": event.value,
            "inline": true
        })];

        if let Some(previous) = &event.previous {
            fields.push(json!({
                "name": "Previous",
                "value": previous,
                "inline": true
            }));
        }

        if let Some(expected) = &event.expected {
            fields.push(json!({
                "name": "Expected",
                "value": expected,
                "inline": true
            }));
        }

        json!({
            "title": format!("{} {}", self.get_emoji(&event.reason), event.reason.headline()),
            "description": event.summary(),
            "color": self.get_embed_color(&event.reason),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "fields": fields,
            "footer": { "text": "Ticket Watcher" }
        })
    }

    fn create_webhook_payload(&self, event: &AlertEvent) -> serde_json::Value {
        let mut payload = json!({
            "embeds": [self.create_embed(event)]
        });

        if let Some(username) = &self.config.username {
            payload["username"] = json!(username);
        }

        payload
    }
}

#[async_trait]
impl NotifierPlugin for DiscordNotifier {
    fn name(&self) -> &str {
        "Discord Notifier"
    }

    fn plugin_type(&self) -> &str {
        "discord"
    }

    async fn notify(&self, event: &AlertEvent) -> Result<NotificationResult, AppError> {
        let payload = self.create_webhook_payload(event);

        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Notification {
                notifier: self.plugin_type().to_string(),
                message: format!("webhook returned {}", status),
            });
        }

        Ok(NotificationResult::delivered()
            .with_message_id(format!("discord-{}", chrono::Utc::now().timestamp())))
    }
}
