use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub fetcher: FetcherConfig,
    pub notifications: NotificationsConfig,
    pub storage: StorageConfig,
    pub run: RunConfig,
    pub logging: LoggingConfig,
}

/// The listing page to watch and how to read products off it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub wait_for_selector: Option<String>,
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    pub selectors: SiteSelectors,
}

/// CSS selectors evaluated inside each product container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSelectors {
    pub product_container: String,
    pub url: String,
    pub title: String,
    pub price: String,
    #[serde(default)]
    pub price_fallbacks: Vec<String>,
    #[serde(default)]
    pub original_price: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub discount: Option<String>,
    #[serde(default)]
    pub sold_out: Option<String>,
    #[serde(default = "default_id_attribute")]
    pub id_attribute: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetcherBackend {
    Http,
    Browser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub backend: FetcherBackend,
    pub user_agent: String,
    pub request_timeout: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub chrome_path: Option<String>,
    pub headless: bool,
    pub settle_ms: u64,
    pub cookie_button_xpath: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Telegram,
    Discord,
    Email,
    Stdout,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Telegram => "telegram",
            ChannelKind::Discord => "discord",
            ChannelKind::Email => "email",
            ChannelKind::Stdout => "stdout",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub channel: ChannelKind,
    /// Chat id, webhook url or recipient address depending on the channel.
    pub destination: Option<String>,
    pub notify_on_error: bool,
    pub telegram: TelegramConfig,
    pub discord: DiscordConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub api_base: String,
    pub disable_web_page_preview: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub username: String,
    pub avatar_url: Option<String>,
    pub mention_role: Option<String>,
    pub mention_user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub use_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_file: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Send "new product" messages for everything on the very first run.
    pub announce_first_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    pub file: Option<PathBuf>,
}

fn default_wait_timeout_ms() -> u64 {
    30_000
}

fn default_currency() -> String {
    "AUD".to_string()
}

fn default_id_attribute() -> String {
    "data-objectid".to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            backend: FetcherBackend::Http,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36".to_string(),
            request_timeout: 60,
            retry_attempts: 2,
            retry_delay_ms: 2_000,
            chrome_path: None,
            headless: true,
            settle_ms: 3_000,
            cookie_button_xpath: None,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            channel: ChannelKind::Telegram,
            destination: None,
            notify_on_error: false,
            telegram: TelegramConfig::default(),
            discord: DiscordConfig::default(),
            smtp: SmtpConfig::default(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: "https://api.telegram.org".to_string(),
            disable_web_page_preview: false,
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            username: "Catalog Watcher".to_string(),
            avatar_url: None,
            mention_role: None,
            mention_user: None,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            from_address: None,
            from_name: "Catalog Watcher".to_string(),
            use_tls: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("data/products_state.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "catalog_watcher=info".to_string(),
            file: None,
        }
    }
}

/// Everything except the site, which may live in its own file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    site: Option<SiteConfig>,
    #[serde(default)]
    site_config: Option<PathBuf>,
    #[serde(default)]
    fetcher: FetcherConfig,
    #[serde(default)]
    notifications: NotificationsConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    run: RunConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl AppConfig {
    /// Layered load: `config/default` → `config_file` → `CATWATCH__*` env vars,
    /// plus the plain `TELEGRAM_*`, `HEADLESS_BROWSER` and `SITE_CONFIG` variables.
    pub fn load(config_file: Option<&Path>, site_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let s = builder
            // Add environment variables with prefix "CATWATCH"
            .add_source(Environment::with_prefix("CATWATCH").separator("__"))
            .set_override_option("notifications.telegram.bot_token", env::var("TELEGRAM_BOT_TOKEN").ok())?
            .set_override_option(
                "fetcher.headless",
                env::var("HEADLESS_BROWSER").ok().map(|v| v.eq_ignore_ascii_case("true")),
            )?
            .set_override_option("site_config", env::var("SITE_CONFIG").ok())?
            .build()?;

        let raw: RawConfig = s.try_deserialize()?;

        let site = match (site_file.map(Path::to_path_buf).or(raw.site_config), raw.site) {
            (Some(path), _) => SiteConfig::from_file(&path)?,
            (None, Some(site)) => site,
            (None, None) => {
                return Err(ConfigError::Message(
                    "No site configured: set site_config or provide a [site] table".into(),
                ))
            }
        };

        let mut notifications = raw.notifications;
        notifications.apply_telegram_chat_id(env::var("TELEGRAM_CHAT_ID").ok());

        let config = AppConfig {
            site,
            fetcher: raw.fetcher,
            notifications,
            storage: raw.storage,
            run: raw.run,
            logging: raw.logging,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.site.validate()?;

        if self.fetcher.request_timeout == 0 {
            return Err(ConfigError::Message("Fetcher request_timeout must be greater than 0".into()));
        }

        if self.fetcher.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Fetcher user_agent must not be empty".into()));
        }

        if self.storage.state_file.as_os_str().is_empty() {
            return Err(ConfigError::Message("Storage state_file must not be empty".into()));
        }

        Ok(())
    }
}

impl SiteConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Message(format!("Site config not found: {}", path.display())));
        }
        Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Message("Site name must not be empty".into()));
        }

        match Url::parse(&self.url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => return Err(ConfigError::Message("Invalid site URL format".into())),
        }

        if self.default_currency.len() != 3 || !self.default_currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Message("Site default_currency must be a 3 letter ISO code".into()));
        }

        for (name, selector) in self.selectors.all() {
            if scraper::Selector::parse(selector).is_err() {
                return Err(ConfigError::Message(format!("Invalid CSS selector for {}: '{}'", name, selector)));
            }
        }

        Ok(())
    }
}

impl SiteSelectors {
    /// Every configured selector with the field it feeds.
    pub fn all(&self) -> Vec<(&'static str, &str)> {
        let mut selectors = vec![
            ("product_container", self.product_container.as_str()),
            ("url", self.url.as_str()),
            ("title", self.title.as_str()),
            ("price", self.price.as_str()),
        ];
        selectors.extend(self.price_fallbacks.iter().map(|s| ("price_fallbacks", s.as_str())));
        let optional = [
            ("original_price", &self.original_price),
            ("image", &self.image),
            ("discount", &self.discount),
            ("sold_out", &self.sold_out),
        ];
        selectors.extend(optional.into_iter().filter_map(|(name, s)| s.as_deref().map(|s| (name, s))));
        selectors
    }
}

impl NotificationsConfig {
    /// `TELEGRAM_CHAT_ID` is the destination only while the channel is Telegram.
    pub fn apply_telegram_chat_id(&mut self, chat_id: Option<String>) {
        if self.channel == ChannelKind::Telegram {
            if let Some(chat_id) = chat_id.filter(|id| !id.trim().is_empty()) {
                self.destination = Some(chat_id);
            }
        }
    }

    /// Checks the credentials the selected channel needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.channel {
            ChannelKind::Telegram => {
                if self.telegram.bot_token.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::Message("TELEGRAM_BOT_TOKEN is not set".into()));
                }
                if self.destination.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::Message("TELEGRAM_CHAT_ID is not set".into()));
                }
                if Url::parse(&self.telegram.api_base).is_err() {
                    return Err(ConfigError::Message("Invalid Telegram api_base URL".into()));
                }
            }
            ChannelKind::Discord => {
                let webhook = self.destination.as_deref().unwrap_or_default();
                if !webhook.starts_with("https://discord.com/api/webhooks/")
                    && !webhook.starts_with("https://discordapp.com/api/webhooks/")
                {
                    return Err(ConfigError::Message("Invalid Discord webhook URL format".into()));
                }
            }
            ChannelKind::Email => {
                if self.smtp.port == 0 {
                    return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
                }
                if self.smtp.from_address.is_none() {
                    return Err(ConfigError::Message("SMTP from_address is not set".into()));
                }
                if !self.destination.as_deref().unwrap_or_default().contains('@') {
                    return Err(ConfigError::Message("Email destination must be an address".into()));
                }
            }
            ChannelKind::Stdout => {}
        }
        Ok(())
    }
}
