// Messaging channel implementations
pub mod discord;
pub mod email;
pub mod stdout;
pub mod telegram;

pub use discord::DiscordChannel;
pub use email::EmailChannel;
pub use stdout::StdoutChannel;
pub use telegram::TelegramChannel;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ChannelKind, NotificationsConfig};
use crate::plugins::traits::MessageChannel;
use crate::utils::error::{AppError, Result};

const CHANNEL_TIMEOUT_SECS: u64 = 30;

/// Builds the channel selected in `notifications.channel` after checking its credentials.
pub fn build_channel(config: &NotificationsConfig) -> Result<Arc<dyn MessageChannel>> {
    config.validate()?;

    let client = || {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(CHANNEL_TIMEOUT_SECS))
            .build()
            .map_err(AppError::Http)
    };

    let channel: Arc<dyn MessageChannel> = match config.channel {
        ChannelKind::Telegram => Arc::new(TelegramChannel::new(client()?, &config.telegram)?),
        ChannelKind::Discord => Arc::new(DiscordChannel::new(client()?, config.discord.clone())),
        ChannelKind::Email => Arc::new(EmailChannel::new(&config.smtp)?),
        ChannelKind::Stdout => Arc::new(StdoutChannel::new()),
    };

    tracing::debug!(channel = channel.name(), "messaging channel ready");
    Ok(channel)
}
