use crate::config::TelegramConfig;
use crate::plugins::traits::{DeliveryReceipt, MessageChannel, MessageFormat};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Telegram Bot API envelope: `{"ok": bool, "result": ..., "description": ...}`
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramChannel {
    client: Client,
    api_base: String,
    bot_token: String,
    disable_web_page_preview: bool,
}

impl TelegramChannel {
    pub fn new(client: Client, config: &TelegramConfig) -> Result<Self> {
        let bot_token = config
            .bot_token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Validation("TELEGRAM_BOT_TOKEN is not set".into()))?;

        Ok(TelegramChannel {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token,
            disable_web_page_preview: config.disable_web_page_preview,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    fn create_payload(&self, chat_id: &str, text: &str) -> serde_json::Value {
        json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": self.disable_web_page_preview,
        })
    }

    // Request errors carry the url, which contains the bot token
    fn request_error(&self, e: reqwest::Error) -> AppError {
        AppError::delivery(self.name(), e.without_url())
    }

    async fn read_response(&self, response: reqwest::Response) -> Result<ApiResponse> {
        let status = response.status();
        let body: ApiResponse = response.json().await.map_err(|e| self.request_error(e))?;
        if !body.ok {
            let description = body.description.unwrap_or_else(|| status.to_string());
            return Err(AppError::delivery(self.name(), description));
        }
        Ok(body)
    }
}

#[async_trait]
impl MessageChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn format(&self) -> MessageFormat {
        MessageFormat::Html
    }

    async fn send(&self, destination: &str, text: &str) -> Result<DeliveryReceipt> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&self.create_payload(destination, text))
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let body = self.read_response(response).await?;
        let message_id = body
            .result
            .as_ref()
            .and_then(|result| result.get("message_id"))
            .map(|id| id.to_string());

        Ok(DeliveryReceipt { message_id })
    }

    async fn test_connection(&self, _destination: &str) -> Result<()> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let body = self.read_response(response).await?;
        let username = body
            .result
            .as_ref()
            .and_then(|bot| bot.get("username"))
            .and_then(|name| name.as_str())
            .unwrap_or("unknown");
        tracing::info!(bot = username, "Telegram bot reachable");
        Ok(())
    }
}
