use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

/// Markup a channel renders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageFormat {
    Plain,
    Html,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
}

/// Trait for implementing messaging channels (Telegram, Discord, email, ...)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Short identifier used in logs and errors
    fn name(&self) -> &str;

    fn format(&self) -> MessageFormat {
        MessageFormat::Plain
    }

    /// Deliver one message to `destination` (chat id, webhook url, address).
    async fn send(&self, destination: &str, text: &str) -> Result<DeliveryReceipt>;

    /// Check credentials and reachability without sending anything.
    async fn test_connection(&self, destination: &str) -> Result<()>;
}
