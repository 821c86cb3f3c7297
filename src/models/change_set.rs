use rust_decimal::Decimal;
use serde::Serialize;

use super::ProductRecord;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Increased,
    Decreased,
    Unchanged,
}

/// The same product seen at two prices.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PriceChange {
    pub old: ProductRecord,
    pub new: ProductRecord,
}

impl PriceChange {
    pub fn new(old: ProductRecord, new: ProductRecord) -> Self {
        Self { old, new }
    }

    pub fn currency_changed(&self) -> bool {
        self.old.currency != self.new.currency
    }

    /// Signed amount difference. `None` when the two prices are in different currencies.
    pub fn difference(&self) -> Option<Decimal> {
        if self.currency_changed() {
            None
        } else {
            Some(self.new.price - self.old.price)
        }
    }

    /// Relative change in percent, rounded to one decimal.
    /// `None` from a zero old price or when the ratio does not fit a `Decimal`.
    pub fn percent_change(&self) -> Option<Decimal> {
        let difference = self.difference()?;
        difference
            .checked_div(self.old.price)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(|percent| percent.round_dp(1))
    }

    pub fn change_type(&self) -> ChangeType {
        match self.difference() {
            Some(d) if d > Decimal::ZERO => ChangeType::Increased,
            Some(d) if d < Decimal::ZERO => ChangeType::Decreased,
            _ => ChangeType::Unchanged,
        }
    }
}

/// Classified differences between the previous snapshot and the current extraction.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<ProductRecord>,
    pub removed: Vec<ProductRecord>,
    pub price_changed: Vec<PriceChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.price_changed.is_empty()
    }

    /// Number of messages this change set turns into.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.price_changed.len()
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.added.is_empty() {
            parts.push(format!("{} new", self.added.len()));
        }
        if !self.removed.is_empty() {
            parts.push(format!("{} removed", self.removed.len()));
        }
        if !self.price_changed.is_empty() {
            let noun = if self.price_changed.len() == 1 { "price change" } else { "price changes" };
            parts.push(format!("{} {}", self.price_changed.len(), noun));
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}
