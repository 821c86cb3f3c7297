use crate::models::{ChangeSet, PriceChange, ProductRecord, Snapshot};

/// Classifies the current extraction against the previous snapshot.
///
/// Identity is by id only. Duplicate ids in `current` collapse to the last
/// record and every output list is ordered by id.
pub fn diff(current: &[ProductRecord], previous: &Snapshot) -> ChangeSet {
    diff_snapshots(&Snapshot::from_records(current.iter().cloned()), previous)
}

pub fn diff_snapshots(current: &Snapshot, previous: &Snapshot) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for record in current.records() {
        match previous.get(&record.id) {
            None => changes.added.push(record.clone()),
            Some(old) if old.price_differs(record) => {
                changes.price_changed.push(PriceChange::new(old.clone(), record.clone()))
            }
            Some(_) => {}
        }
    }

    changes.removed = previous
        .records()
        .filter(|old| !current.contains(&old.id))
        .cloned()
        .collect();

    tracing::debug!(
        current = current.len(),
        previous = previous.len(),
        added = changes.added.len(),
        removed = changes.removed.len(),
        price_changed = changes.price_changed.len(),
        "diff computed"
    );
    changes
}
