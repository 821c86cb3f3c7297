use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::models::{Snapshot, SnapshotDocument};
use crate::utils::error::{AppError, Result};

/// Persistence for the last successful run's products.
///
/// `load` on a store that has never been written returns an empty snapshot.
/// `save` replaces the stored snapshot wholesale: after it returns, `load`
/// yields either the complete new snapshot (on `Ok`) or the complete old one.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> Result<Snapshot>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Snapshot kept as a pretty-printed JSON document on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Snapshot> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no snapshot yet, starting empty");
                return Ok(Snapshot::empty());
            }
            Err(e) => {
                return Err(AppError::Persistence(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let document: SnapshotDocument = serde_json::from_str(&contents).map_err(|e| {
            AppError::Persistence(format!("corrupt snapshot {}: {}", self.path.display(), e))
        })?;
        let snapshot = Snapshot::from(document);
        tracing::debug!(path = %self.path.display(), products = snapshot.len(), "loaded snapshot");
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let persist_error = |e: &dyn std::fmt::Display| {
            AppError::Persistence(format!("failed to write {}: {}", self.path.display(), e))
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| persist_error(&e))?;

        let json = serde_json::to_vec_pretty(&SnapshotDocument::from(snapshot))?;

        // Write beside the target and rename over it so readers never see half a file
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| persist_error(&e))?;
        tmp.write_all(&json).map_err(|e| persist_error(&e))?;
        tmp.as_file().sync_all().map_err(|e| persist_error(&e))?;
        tmp.persist(&self.path).map_err(|e| persist_error(&e.error))?;

        tracing::debug!(path = %self.path.display(), products = snapshot.len(), "saved snapshot");
        Ok(())
    }
}

/// In-process store. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<Snapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(snapshot))),
        }
    }

    /// The stored snapshot, `None` if nothing was ever saved.
    pub fn current(&self) -> Option<Snapshot> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Snapshot> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| AppError::Persistence("snapshot lock poisoned".into()))?;
        Ok(slot.clone().unwrap_or_default())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| AppError::Persistence("snapshot lock poisoned".into()))?;
        *slot = Some(snapshot.clone());
        Ok(())
    }
}
