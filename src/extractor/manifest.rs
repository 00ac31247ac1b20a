//! Run manifest
//!
//! Written to the raw tier at the end of a full extraction so a later phase (or a
//! human) can tell which documents belong to the run and how the detail batch went.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::names;
use super::report::DetailFetchReport;
use crate::snapshot::{self, SnapshotError, SnapshotResult, SnapshotStore, Tier};

/// Current manifest schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// A document written during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDocument {
    /// Tier directory name
    pub tier: String,
    /// Document name
    pub name: String,
}

/// Detail batch counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Ids submitted
    pub requested: usize,
    /// Ids fetched
    pub succeeded: usize,
    /// Ids failed
    pub failed: usize,
}

impl From<&DetailFetchReport> for ReportSummary {
    fn from(report: &DetailFetchReport) -> Self {
        Self {
            requested: report.requested,
            succeeded: report.succeeded,
            failed: report.failed.len(),
        }
    }
}

/// Summary of one extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    schema_version: String,
    started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
    documents: Vec<ManifestDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<ReportSummary>,
}

impl RunManifest {
    /// Start a manifest for a run beginning now
    pub fn start() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            documents: Vec::new(),
            details: None,
        }
    }

    /// Record a written document
    pub fn add_document(&mut self, tier: Tier, name: &str) {
        self.documents.push(ManifestDocument {
            tier: tier.dir_name().to_string(),
            name: name.to_string(),
        });
    }

    /// Mark the run finished with the detail batch outcome
    pub fn finish(&mut self, report: &DetailFetchReport) {
        self.details = Some(ReportSummary::from(report));
        self.finished_at = Some(Utc::now());
    }

    /// Run start time
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Run end time, if finished
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Documents written during the run
    pub fn documents(&self) -> &[ManifestDocument] {
        &self.documents
    }

    /// Detail batch counts, if finished
    pub fn details(&self) -> Option<ReportSummary> {
        self.details
    }

    /// Persist to the raw tier
    pub fn save(&self, store: &dyn SnapshotStore) -> SnapshotResult<()> {
        snapshot::write_json(store, Tier::Raw, names::MANIFEST, self)?;
        info!(
            location = %store.location(Tier::Raw, names::MANIFEST),
            documents = self.documents.len(),
            "Run manifest saved"
        );
        Ok(())
    }

    /// Load from the raw tier, rejecting unknown schema versions
    pub fn load(store: &dyn SnapshotStore) -> SnapshotResult<Self> {
        let manifest: RunManifest = snapshot::read_json(store, Tier::Raw, names::MANIFEST)?;
        if manifest.schema_version != SCHEMA_VERSION {
            warn!(
                found_version = %manifest.schema_version,
                expected_version = SCHEMA_VERSION,
                "Manifest schema version mismatch"
            );
            return Err(SnapshotError::SnapshotMalformed {
                path: store.location(Tier::Raw, names::MANIFEST),
                cause: format!(
                    "schema version mismatch: expected {SCHEMA_VERSION}, found {}",
                    manifest.schema_version
                ),
            });
        }
        Ok(manifest)
    }
}
