//! Snapshot persistence between pipeline phases
//!
//! Each phase hands its output to the next through named documents in one of
//! three tiers:
//! - [`Tier::Raw`] - listing pages and genre dictionary as fetched
//! - [`Tier::Processed`] - per-movie details/credits and the inputs the normalizer reads
//! - [`Tier::Clean`] - normalized CSV tables
//!
//! [`FsSnapshotStore`] maps tiers to `<root>/<tier>/<name>`; [`MemorySnapshotStore`]
//! keeps everything in a map for tests.

pub mod fs;
pub mod memory;

pub use fs::FsSnapshotStore;
pub use memory::MemorySnapshotStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Storage tier of a snapshot document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Documents exactly as returned by listing endpoints
    Raw,
    /// Per-movie documents consumed by normalization
    Processed,
    /// Normalized tables
    Clean,
}

impl Tier {
    /// Directory name of the tier
    pub fn dir_name(&self) -> &'static str {
        match self {
            Tier::Raw => "raw",
            Tier::Processed => "processed",
            Tier::Clean => "clean",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Snapshot errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// Document does not exist
    #[error("snapshot not found: {path}")]
    SnapshotMissing {
        /// Location of the missing document
        path: String,
    },

    /// Document exists but could not be decoded
    #[error("malformed snapshot {path}: {cause}")]
    SnapshotMalformed {
        /// Location of the document
        path: String,
        /// Decoder message
        cause: String,
    },

    /// Read or write failed
    #[error("I/O error on {path}: {cause}")]
    Io {
        /// Location of the document
        path: String,
        /// Underlying error
        cause: String,
    },
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Path-addressed document store
///
/// Writes replace the whole document; a reader never observes a partial write.
pub trait SnapshotStore: Send + Sync {
    /// Replace the document `name` in `tier`
    fn put(&self, tier: Tier, name: &str, bytes: &[u8]) -> SnapshotResult<()>;

    /// Read the document `name` from `tier`
    ///
    /// # Errors
    /// [`SnapshotError::SnapshotMissing`] if it was never written.
    fn get(&self, tier: Tier, name: &str) -> SnapshotResult<Vec<u8>>;

    /// Whether the document exists
    fn exists(&self, tier: Tier, name: &str) -> bool;

    /// Human-readable location used in logs and errors
    fn location(&self, tier: Tier, name: &str) -> String;
}

/// Serialize `value` as pretty JSON and store it
pub fn write_json<T>(
    store: &dyn SnapshotStore,
    tier: Tier,
    name: &str,
    value: &T,
) -> SnapshotResult<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_vec_pretty(value).map_err(|e| SnapshotError::Io {
        path: store.location(tier, name),
        cause: format!("failed to serialize: {e}"),
    })?;
    store.put(tier, name, &json)?;
    debug!(
        location = %store.location(tier, name),
        bytes = json.len(),
        "Wrote JSON snapshot"
    );
    Ok(())
}

/// Read a JSON document and decode it into `T`
///
/// # Errors
/// [`SnapshotError::SnapshotMalformed`] if the bytes are not valid JSON for `T`,
/// including a missing required field.
pub fn read_json<T>(store: &dyn SnapshotStore, tier: Tier, name: &str) -> SnapshotResult<T>
where
    T: DeserializeOwned,
{
    let bytes = store.get(tier, name)?;
    serde_json::from_slice(&bytes).map_err(|e| SnapshotError::SnapshotMalformed {
        path: store.location(tier, name),
        cause: e.to_string(),
    })
}
