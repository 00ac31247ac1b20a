//! Extraction orchestration
//!
//! The extractor drives the catalog client and writes everything it receives to
//! the snapshot store:
//!
//! 1. **Listings**: popular, top rated, upcoming and trending pages ([`Extractor::extract_listing`])
//! 2. **Genres**: the global genre dictionary ([`Extractor::extract_genre_dictionary`])
//! 3. **Details**: detail and credits per movie id, with per-item outcomes
//!    ([`Extractor::extract_item_details_and_credits`])
//! 4. **Manifest**: a run summary written last ([`manifest::RunManifest`])
//!
//! # Error Handling
//!
//! Listing and genre failures abort the run. A failing movie id is recorded in
//! the [`DetailFetchReport`] and the batch carries on.

pub mod executor;
pub mod manifest;
pub mod report;

pub use executor::Extractor;
pub use manifest::RunManifest;
pub use report::{DetailFetchReport, FailedItem, ItemOutcome};

use crate::config::ConfigError;
use crate::fetcher::FetcherError;
use crate::snapshot::SnapshotError;

/// Snapshot names shared by the extractor and the normalizer
pub mod names {
    /// Genre dictionary (raw and processed tiers)
    pub const GENRES: &str = "genres.json";
    /// Movie detail records (processed tier)
    pub const DETAILS: &str = "details.json";
    /// Movie credit records (processed tier)
    pub const CREDITS: &str = "credits.json";
    /// Detail batch report (processed tier)
    pub const DETAILS_REPORT: &str = "details_report.json";
    /// Run manifest (raw tier)
    pub const MANIFEST: &str = "manifest.json";
}

/// Extraction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// Required configuration absent
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog request failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetcherError),

    /// Snapshot could not be written or read back
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Result type for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;
