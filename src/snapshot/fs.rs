//! Filesystem snapshot store
//!
//! Documents live at `<root>/<tier>/<name>`. Writes go through a temp file in the
//! target directory followed by an atomic rename.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{SnapshotError, SnapshotResult, SnapshotStore, Tier};

/// Snapshot store rooted at a data directory
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    root: PathBuf,
}

impl FsSnapshotStore {
    /// Store rooted at `root` (directories are created on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root data directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of a document
    pub fn path_for(&self, tier: Tier, name: &str) -> PathBuf {
        self.root.join(tier.dir_name()).join(name)
    }
}

fn io_error(path: &Path, context: &str, e: impl std::fmt::Display) -> SnapshotError {
    SnapshotError::Io {
        path: path.display().to_string(),
        cause: format!("{context}: {e}"),
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn put(&self, tier: Tier, name: &str, bytes: &[u8]) -> SnapshotResult<()> {
        let path = self.path_for(tier, name);
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .map_err(|e| io_error(&path, "Failed to create directory", e))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| io_error(&path, "Failed to create temp file", e))?;
        temp_file
            .write_all(bytes)
            .map_err(|e| io_error(&path, "Failed to write to temp file", e))?;
        temp_file
            .flush()
            .map_err(|e| io_error(&path, "Failed to flush temp file", e))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| io_error(&path, "Failed to sync temp file", e))?;
        temp_file
            .persist(&path)
            .map_err(|e| io_error(&path, "Failed to persist temp file", e))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }

    fn get(&self, tier: Tier, name: &str) -> SnapshotResult<Vec<u8>> {
        let path = self.path_for(tier, name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SnapshotError::SnapshotMissing {
                    path: path.display().to_string(),
                })
            }
            Err(e) => Err(io_error(&path, "Failed to read", e)),
        }
    }

    fn exists(&self, tier: Tier, name: &str) -> bool {
        self.path_for(tier, name).is_file()
    }

    fn location(&self, tier: Tier, name: &str) -> String {
        self.path_for(tier, name).display().to_string()
    }
}
