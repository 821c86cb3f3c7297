use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ProductRecord;

/// The set of products observed at the end of the last successful run.
///
/// Keyed by product id, so iteration is ordered by id and duplicate ids
/// collapse to the last record inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    captured_at: Option<DateTime<Utc>>,
    products: BTreeMap<String, ProductRecord>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ProductRecord>,
    {
        let mut products = BTreeMap::new();
        for record in records {
            if let Some(previous) = products.insert(record.id.clone(), record) {
                tracing::debug!(id = %previous.id, "duplicate product id, keeping the last listing");
            }
        }
        Self {
            captured_at: None,
            products,
        }
    }

    pub fn captured_now(mut self) -> Self {
        self.captured_at = Some(Utc::now());
        self
    }

    pub fn with_captured_at(mut self, captured_at: Option<DateTime<Utc>>) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }

    pub fn get(&self, id: &str) -> Option<&ProductRecord> {
        self.products.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.products.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ProductRecord> {
        self.products.values()
    }
}

/// On-disk shape of a snapshot: a timestamp and a flat product list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub products: Vec<ProductRecord>,
}

impl From<&Snapshot> for SnapshotDocument {
    fn from(snapshot: &Snapshot) -> Self {
        SnapshotDocument {
            captured_at: snapshot.captured_at,
            products: snapshot.records().cloned().collect(),
        }
    }
}

impl From<SnapshotDocument> for Snapshot {
    fn from(document: SnapshotDocument) -> Self {
        Snapshot::from_records(document.products).with_captured_at(document.captured_at)
    }
}
