use std::sync::Arc;

use rust_decimal::Decimal;

use crate::models::{ChangeSet, ChangeType, PriceChange, ProductRecord};
use crate::plugins::traits::{MessageChannel, MessageFormat};
use crate::price::format_money;
use crate::utils::error::Result;

/// Outcome of one notification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

/// Turns changes into messages and pushes them through a channel.
pub struct Notifier {
    channel: Arc<dyn MessageChannel>,
    destination: String,
    site_name: String,
}

impl Notifier {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        destination: impl Into<String>,
        site_name: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            destination: destination.into(),
            site_name: site_name.into(),
        }
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    /// One message per added product, removed product and price change, in that order.
    pub fn compose(&self, changes: &ChangeSet) -> Vec<String> {
        let formatter = MessageFormatter::new(self.channel.format(), &self.site_name);

        changes
            .added
            .iter()
            .map(|product| formatter.new_product(product))
            .chain(changes.removed.iter().map(|product| formatter.removed_product(product)))
            .chain(changes.price_changed.iter().map(|change| formatter.price_change(change)))
            .collect()
    }

    /// Best effort: a failed send is logged and the remaining messages still go out.
    pub async fn notify(&self, changes: &ChangeSet) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if changes.is_empty() {
            tracing::info!("no changes, nothing to send");
            return report;
        }

        tracing::info!(channel = self.channel.name(), summary = %changes.summary(), "sending notifications");

        for message in self.compose(changes) {
            match self.channel.send(&self.destination, &message).await {
                Ok(receipt) => {
                    report.sent += 1;
                    metrics::counter!("catalog_watcher_deliveries_total", "outcome" => "sent").increment(1);
                    tracing::debug!(message_id = ?receipt.message_id, "notification sent");
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("catalog_watcher_deliveries_total", "outcome" => "failed").increment(1);
                    tracing::error!(error = %e, "failed to send notification");
                }
            }
        }

        report
    }

    /// Channel self-test: checks credentials, then sends a short greeting.
    pub async fn send_test(&self) -> Result<()> {
        self.channel.test_connection(&self.destination).await?;
        let message = format!("✅ Catalog watcher for {} is running!", self.site_name);
        self.channel.send(&self.destination, &message).await?;
        tracing::info!(channel = self.channel.name(), "test message sent");
        Ok(())
    }

    /// Operator alert for a failed run.
    pub async fn send_error(&self, error: &str) -> Result<()> {
        let formatter = MessageFormatter::new(self.channel.format(), &self.site_name);
        self.channel.send(&self.destination, &formatter.error(error)).await?;
        tracing::info!("error notification sent");
        Ok(())
    }
}

struct MessageFormatter<'a> {
    format: MessageFormat,
    site_name: &'a str,
}

impl<'a> MessageFormatter<'a> {
    fn new(format: MessageFormat, site_name: &'a str) -> Self {
        Self { format, site_name }
    }

    fn text(&self, raw: &str) -> String {
        match self.format {
            MessageFormat::Html => escape_html(raw),
            MessageFormat::Plain => raw.to_string(),
        }
    }

    fn link(&self, url: &str) -> String {
        match self.format {
            MessageFormat::Html => format!("🔗 <a href=\"{}\">View product</a>", escape_html(url)),
            MessageFormat::Plain => format!("🔗 {}", url),
        }
    }

    fn new_product(&self, product: &ProductRecord) -> String {
        let mut price = format_money(product.price, &product.currency);
        if let Some(original) = product.markdown_from() {
            price.push_str(&format!(" (was {})", format_money(original, &product.currency)));
        }

        let mut message = format!(
            "🆕 New {} product!\n\n{}\n💰 {}\n",
            self.text(self.site_name),
            self.text(&product.name),
            price
        );
        if let Some(discount) = &product.discount {
            message.push_str(&format!("🔖 {}\n", self.text(discount)));
        }
        if !product.available {
            message.push_str("🚫 Sold out\n");
        }
        message.push_str(&format!("🏷️ ID: {}\n\n{}", self.text(&product.id), self.link(&product.url)));
        message
    }

    fn removed_product(&self, product: &ProductRecord) -> String {
        format!(
            "❌ No longer listed on {}\n\n{}\n🏷️ ID: {}",
            self.text(self.site_name),
            self.text(&product.name),
            self.text(&product.id)
        )
    }

    fn price_change(&self, change: &PriceChange) -> String {
        let emoji = match change.change_type() {
            ChangeType::Decreased => "📉",
            ChangeType::Increased | ChangeType::Unchanged => "📈",
        };

        let detail = match change.difference() {
            Some(difference) => {
                let mut detail = signed_money(difference, &change.new.currency);
                if let Some(percent) = change.percent_change() {
                    detail.push_str(&format!(", {}%", signed(percent)));
                }
                detail
            }
            None => "currency changed".to_string(),
        };

        format!(
            "💲 Price update on {}\n\n{}\n{} {} → {} ({})\n🏷️ ID: {}\n\n{}",
            self.text(self.site_name),
            self.text(&change.new.name),
            emoji,
            format_money(change.old.price, &change.old.currency),
            format_money(change.new.price, &change.new.currency),
            detail,
            self.text(&change.new.id),
            self.link(&change.new.url)
        )
    }

    fn error(&self, error: &str) -> String {
        format!("⚠️ {} watcher error\n\n{}", self.text(self.site_name), self.text(error))
    }
}

fn signed_money(amount: Decimal, currency: &str) -> String {
    if amount.is_sign_negative() {
        format_money(amount, currency)
    } else {
        format!("+{}", format_money(amount, currency))
    }
}

fn signed(value: Decimal) -> String {
    if value.is_sign_negative() {
        format!("{:.1}", value)
    } else {
        format!("+{:.1}", value)
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
