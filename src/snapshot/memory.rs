//! In-memory snapshot store for tests and dry runs

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{SnapshotError, SnapshotResult, SnapshotStore, Tier};

/// Snapshot store backed by a map
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    documents: RwLock<BTreeMap<(Tier, String), Vec<u8>>>,
}

impl MemorySnapshotStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Names stored in `tier`, sorted
    pub fn names(&self, tier: Tier) -> Vec<String> {
        self.documents
            .read()
            .map(|docs| {
                docs.keys()
                    .filter(|(t, _)| *t == tier)
                    .map(|(_, name)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Document contents as UTF-8 text, if present
    pub fn text(&self, tier: Tier, name: &str) -> Option<String> {
        self.get(tier, name)
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    fn poisoned(&self, tier: Tier, name: &str) -> SnapshotError {
        SnapshotError::Io {
            path: self.location(tier, name),
            cause: "snapshot map lock poisoned".to_string(),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn put(&self, tier: Tier, name: &str, bytes: &[u8]) -> SnapshotResult<()> {
        let mut docs = self
            .documents
            .write()
            .map_err(|_| self.poisoned(tier, name))?;
        docs.insert((tier, name.to_string()), bytes.to_vec());
        Ok(())
    }

    fn get(&self, tier: Tier, name: &str) -> SnapshotResult<Vec<u8>> {
        let docs = self.documents.read().map_err(|_| self.poisoned(tier, name))?;
        docs.get(&(tier, name.to_string()))
            .cloned()
            .ok_or_else(|| SnapshotError::SnapshotMissing {
                path: self.location(tier, name),
            })
    }

    fn exists(&self, tier: Tier, name: &str) -> bool {
        self.documents
            .read()
            .map(|docs| docs.contains_key(&(tier, name.to_string())))
            .unwrap_or(false)
    }

    fn location(&self, tier: Tier, name: &str) -> String {
        format!("memory://{}/{}", tier.dir_name(), name)
    }
}
