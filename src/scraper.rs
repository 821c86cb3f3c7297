use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use reqwest::Client;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

use crate::config::{FetcherBackend, FetcherConfig, SiteConfig};
use crate::utils::error::{AppError, Result};

/// Retrieves the raw content of a listing page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain GET with a fixed-interval retry.
pub struct HttpFetcher {
    client: Client,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            retry_attempts: config.retry_attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("HTTP status {}", status)));
        }

        response.text().await.map_err(|e| AppError::fetch(url, e))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        let strategy = FixedInterval::new(self.retry_delay).take(self.retry_attempts as usize);

        let mut attempt = 0u32;
        let body = Retry::spawn(strategy, || {
            attempt += 1;
            let current = attempt;
            async move {
                self.fetch_once(url).await.inspect_err(|e| {
                    tracing::warn!(attempt = current, error = %e, "fetch attempt failed");
                })
            }
        })
        .await?;

        tracing::info!(
            url,
            bytes = body.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "page fetched"
        );
        Ok(body)
    }
}

/// Renders the page in headless Chrome so JavaScript-built listings are present.
#[derive(Clone)]
pub struct BrowserFetcher {
    user_agent: String,
    chrome_path: Option<String>,
    headless: bool,
    wait_for_selector: Option<String>,
    wait_timeout: Duration,
    settle: Duration,
    cookie_button_xpath: Option<String>,
}

impl BrowserFetcher {
    pub fn new(config: &FetcherConfig, site: &SiteConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            chrome_path: config.chrome_path.clone(),
            headless: config.headless,
            wait_for_selector: site.wait_for_selector.clone(),
            wait_timeout: Duration::from_millis(site.wait_timeout_ms),
            settle: Duration::from_millis(config.settle_ms),
            cookie_button_xpath: config.cookie_button_xpath.clone(),
        }
    }

    fn launch_options(&self) -> std::result::Result<LaunchOptions<'static>, String> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-notifications"),
            ])
            .build()
            .map_err(|e| format!("Failed to create launch options: {}", e))?;

        if let Some(chrome_path) = &self.chrome_path {
            launch_options.path = Some(PathBuf::from(chrome_path));
        }

        Ok(launch_options)
    }

    /// Blocking: drives one browser session from launch to page source.
    fn render(&self, url: &str) -> std::result::Result<String, String> {
        let browser = Browser::new(self.launch_options()?)
            .map_err(|e| format!("Failed to launch browser: {}", e))?;

        let tab = browser.new_tab().map_err(|e| format!("Failed to create tab: {}", e))?;

        tab.set_user_agent(&self.user_agent, None, None)
            .map_err(|e| format!("Failed to set user agent: {}", e))?;

        tab.navigate_to(url).map_err(|e| format!("Navigation failed: {}", e))?;
        tab.wait_until_navigated()
            .map_err(|e| format!("Page load failed: {}", e))?;

        if let Some(xpath) = &self.cookie_button_xpath {
            // The banner is optional, a page without it is fine
            match tab.wait_for_xpath_with_custom_timeout(xpath, Duration::from_secs(5)) {
                Ok(button) => match button.click() {
                    Ok(_) => tracing::debug!("dismissed cookie banner"),
                    Err(e) => tracing::debug!(error = %e, "cookie banner click failed"),
                },
                Err(_) => tracing::debug!("no cookie banner found"),
            }
        }

        if let Some(selector) = &self.wait_for_selector {
            tab.wait_for_element_with_custom_timeout(selector, self.wait_timeout)
                .map_err(|e| format!("Wait for selector '{}' failed: {}", selector, e))?;
        }

        std::thread::sleep(self.settle);

        let content = tab
            .get_content()
            .map_err(|e| format!("Failed to get page content: {}", e))?;

        let _ = tab.close(true);
        Ok(content)
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        let fetcher = self.clone();
        let target = url.to_string();

        let content = tokio::task::spawn_blocking(move || fetcher.render(&target))
            .await
            .map_err(|e| AppError::fetch(url, format!("browser task failed: {}", e)))?
            .map_err(|message| AppError::fetch(url, message))?;

        tracing::info!(
            url,
            bytes = content.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "page rendered"
        );
        Ok(content)
    }
}

/// Picks the backend named in `fetcher.backend`.
pub fn build_fetcher(config: &FetcherConfig, site: &SiteConfig) -> Result<Box<dyn PageFetcher>> {
    Ok(match config.backend {
        FetcherBackend::Http => Box::new(HttpFetcher::new(config)?),
        FetcherBackend::Browser => Box::new(BrowserFetcher::new(config, site)),
    })
}
