// Shared fixtures for the integration tests

pub mod channel_tests;
pub mod fetcher_tests;
pub mod store_tests;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_watcher::config::{SiteConfig, SiteSelectors};
use catalog_watcher::plugins::{DeliveryReceipt, MessageChannel, MessageFormat};
use catalog_watcher::scraper::PageFetcher;
use catalog_watcher::utils::error::{AppError, Result};
use catalog_watcher::{Notifier, ProductExtractor, SnapshotStore, Watcher};

/// Site layout used by every fixture page.
pub fn test_site(url: &str) -> SiteConfig {
    SiteConfig {
        name: "Camera Shop".to_string(),
        url: url.to_string(),
        wait_for_selector: Some("div.results".to_string()),
        wait_timeout_ms: 5_000,
        default_currency: "AUD".to_string(),
        selectors: SiteSelectors {
            product_container: "div.result".to_string(),
            url: "a.result-link".to_string(),
            title: "h2.title".to_string(),
            price: "span.price".to_string(),
            price_fallbacks: vec!["span.custom_final_price".to_string()],
            original_price: Some("span.was".to_string()),
            image: Some("img".to_string()),
            discount: Some("span.badge".to_string()),
            sold_out: Some(".sold-out".to_string()),
            id_attribute: "data-objectid".to_string(),
        },
    }
}

/// One listing: `(id, name, price text)`.
pub type Listing<'a> = (&'a str, &'a str, &'a str);

pub fn listing_html((id, name, price): Listing<'_>) -> String {
    format!(
        r#"<div class="result">
             <a class="result-link" href="/products/{id}" data-objectid="{id}">
               <img src="/img/{id}.jpg">
               <h2 class="title">{name}</h2>
             </a>
             <span class="price">{price}</span>
           </div>"#
    )
}

pub fn listing_page(listings: &[Listing<'_>]) -> String {
    let body: String = listings.iter().copied().map(listing_html).collect();
    format!(r#"<html><body><div class="results">{}</div></body></html>"#, body)
}

/// Serves queued pages in order; an `Err` entry is a fetch failure.
#[derive(Clone, Default)]
pub struct FakeFetcher {
    pages: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
    calls: Arc<Mutex<usize>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, html: impl Into<String>) -> Self {
        self.pages.lock().unwrap().push_back(Ok(html.into()));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.pages.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        match self.pages.lock().unwrap().pop_front() {
            Some(Ok(html)) => Ok(html),
            Some(Err(message)) => Err(AppError::fetch(url, message)),
            None => Err(AppError::fetch(url, "no page queued")),
        }
    }
}

/// Keeps every message it is asked to send. Sends listed in `fail_on` (1-based) error out.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    sent: Arc<Mutex<Vec<String>>>,
    attempts: Arc<Mutex<usize>>,
    fail_on: Vec<usize>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(fail_on: &[usize]) -> Self {
        Self {
            fail_on: fail_on.to_vec(),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn format(&self) -> MessageFormat {
        MessageFormat::Plain
    }

    async fn send(&self, _destination: &str, text: &str) -> Result<DeliveryReceipt> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        if self.fail_on.contains(&attempt) {
            return Err(AppError::delivery("recording", "simulated outage"));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(DeliveryReceipt {
            message_id: Some(attempt.to_string()),
        })
    }

    async fn test_connection(&self, _destination: &str) -> Result<()> {
        Ok(())
    }
}

pub fn build_watcher(
    fetcher: FakeFetcher,
    store: Arc<dyn SnapshotStore>,
    channel: RecordingChannel,
) -> Watcher {
    let site = test_site("https://shop.example.com/cameras");
    Watcher::new(
        site.url.clone(),
        Box::new(fetcher),
        ProductExtractor::new(&site).expect("fixture selectors are valid"),
        store,
        Notifier::new(Arc::new(channel), "-1001", site.name),
    )
}
