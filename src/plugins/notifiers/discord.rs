use crate::config::DiscordConfig;
use crate::plugins::traits::{DeliveryReceipt, MessageChannel};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Discord rejects message content longer than this.
const MAX_CONTENT_CHARS: usize = 2000;

pub struct DiscordChannel {
    client: Client,
    config: DiscordConfig,
}

impl DiscordChannel {
    pub fn new(client: Client, config: DiscordConfig) -> Self {
        DiscordChannel { client, config }
    }

    fn mentions(&self) -> Option<String> {
        let mut parts = Vec::new();

        if let Some(role) = &self.config.mention_role {
            parts.push(format!("<@&{}>", role));
        }

        if let Some(user) = &self.config.mention_user {
            parts.push(format!("<@{}>", user));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    fn create_webhook_payload(&self, text: &str) -> serde_json::Value {
        let content = match self.mentions() {
            Some(mentions) => format!("{}\n{}", mentions, text),
            None => text.to_string(),
        };
        let content: String = content.chars().take(MAX_CONTENT_CHARS).collect();

        let mut payload = json!({
            "content": content,
            "username": self.config.username,
        });

        if let Some(avatar_url) = &self.config.avatar_url {
            payload["avatar_url"] = json!(avatar_url);
        }

        payload
    }
}

#[async_trait]
impl MessageChannel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, destination: &str, text: &str) -> Result<DeliveryReceipt> {
        let response = self
            .client
            .post(destination)
            .query(&[("wait", "true")])
            .json(&self.create_webhook_payload(text))
            .send()
            .await
            .map_err(|e| AppError::delivery(self.name(), e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::delivery(
                self.name(),
                format!("webhook returned {}: {}", status, body),
            ));
        }

        // `wait=true` makes Discord echo the created message
        let message_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|message| message.get("id").and_then(|id| id.as_str()).map(String::from));

        Ok(DeliveryReceipt { message_id })
    }

    async fn test_connection(&self, destination: &str) -> Result<()> {
        let response = self
            .client
            .get(destination)
            .send()
            .await
            .map_err(|e| AppError::delivery(self.name(), e.without_url()))?;

        if !response.status().is_success() {
            return Err(AppError::delivery(
                self.name(),
                format!("webhook lookup returned {}", response.status()),
            ));
        }
        Ok(())
    }
}
