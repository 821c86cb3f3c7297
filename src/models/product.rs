use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One product listing as observed on the source page.
///
/// Identity is the `id` alone: two records describe the same product when
/// their ids match, whatever the other fields say.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub currency: String,
    pub available: bool,
    pub url: String,

    // Optional enrichment scraped alongside the required fields
    #[serde(default, with = "rust_decimal::serde::str_option", skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
}

impl ProductRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        currency: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            currency: currency.into(),
            available: true,
            url: url.into(),
            original_price: None,
            image: None,
            discount: None,
        }
    }

    /// True when amount or currency differ. Availability is not a price.
    pub fn price_differs(&self, other: &ProductRecord) -> bool {
        self.price != other.price || self.currency != other.currency
    }

    /// The struck-through price, only when it is actually above the current one.
    pub fn markdown_from(&self) -> Option<Decimal> {
        self.original_price.filter(|original| *original > self.price)
    }
}
