//! CLI error types and conversions

use crate::analytics::AnalyticsError;
use crate::config::ConfigError;
use crate::extractor::ExtractError;
use crate::loader::LoadError;
use crate::snapshot::SnapshotError;
use crate::transform::TransformError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Extraction error
    #[error("extract error: {0}")]
    ExtractError(#[from] ExtractError),

    /// Transform error
    #[error("transform error: {0}")]
    TransformError(#[from] TransformError),

    /// Load error
    #[error("load error: {0}")]
    LoadError(#[from] LoadError),

    /// Analytics error
    #[error("analytics error: {0}")]
    AnalyticsError(#[from] AnalyticsError),

    /// Snapshot error
    #[error("snapshot error: {0}")]
    SnapshotError(#[from] SnapshotError),
}
