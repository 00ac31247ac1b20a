//! Full-refresh load targets
//!
//! Both targets consume the clean-tier CSV tables written by the transform:
//! - [`postgres::PostgresLoader`] - drop, recreate and bulk-insert into schema `tmdb`
//! - [`bigquery::BigQueryLoader`] - truncate-and-reload load jobs into a dataset
//!
//! Tables are always loaded in [`TABLE_LOAD_ORDER`].

pub mod bigquery;
pub mod postgres;

pub use bigquery::BigQueryLoader;
pub use postgres::PostgresLoader;

use async_trait::async_trait;
use tracing::debug;

use crate::config::ConfigError;
use crate::output::{self, OutputError};
use crate::snapshot::{SnapshotError, SnapshotStore, Tier};
use crate::transform::records::{
    CastRow, Column, CrewRow, GenreRow, MovieGenreRow, MovieRow, TableRecord,
};
use crate::transform::NormalizedTables;

pub use crate::transform::records::TABLE_LOAD_ORDER;

/// Load errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Credentials, connectivity or authentication failure
    #[error("cannot reach {target}: {cause}")]
    LoadTargetUnreachable {
        /// Target name ("postgres" or "bigquery")
        target: String,
        /// Underlying failure
        cause: String,
    },

    /// Target reachable but refused a statement or load job
    #[error("{target} rejected the load: {cause}")]
    Rejected {
        /// Target name
        target: String,
        /// Error reported by the target
        cause: String,
    },

    /// Required configuration absent
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Clean table missing or unreadable
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Clean table could not be decoded
    #[error("table decode failed: {0}")]
    Table(#[from] OutputError),
}

impl LoadError {
    pub(crate) fn unreachable(target: &str, cause: impl std::fmt::Display) -> Self {
        LoadError::LoadTargetUnreachable {
            target: target.to_string(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn rejected(target: &str, cause: impl std::fmt::Display) -> Self {
        LoadError::Rejected {
            target: target.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type for load operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Rows loaded into one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    /// Table name
    pub table: String,
    /// Rows loaded
    pub rows: u64,
}

/// Outcome of loading all five tables into one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Target name
    pub target: String,
    /// Tables in load order
    pub tables: Vec<TableLoad>,
}

impl LoadSummary {
    /// Total rows across all tables
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// A destination for the five clean tables
#[async_trait]
pub trait LoadTarget: Send + Sync {
    /// Target name used in logs and errors
    fn name(&self) -> &'static str;

    /// Replace every table in the target with the clean-tier contents
    async fn load_tables(&self, store: &dyn SnapshotStore) -> LoadResult<LoadSummary>;
}

/// The five clean tables decoded back into typed rows
pub type TableSet = NormalizedTables;

impl TableSet {
    /// Read every clean-tier CSV table
    ///
    /// # Errors
    /// [`SnapshotError::SnapshotMissing`] if any table was never written.
    pub fn read(store: &dyn SnapshotStore) -> LoadResult<Self> {
        Ok(Self {
            movies: read_table(store)?,
            genres: read_table(store)?,
            movie_genres: read_table(store)?,
            cast: read_table(store)?,
            crew: read_table(store)?,
        })
    }
}

/// Read and decode one clean-tier table
pub fn read_table<R: TableRecord>(store: &dyn SnapshotStore) -> LoadResult<Vec<R>> {
    let bytes = store.get(Tier::Clean, &R::file_name())?;
    let rows: Vec<R> = output::decode_table(&bytes)?;
    debug!(table = R::TABLE, rows = rows.len(), "Read clean table");
    Ok(rows)
}

/// Columns of a table by name
pub fn columns_for(table: &str) -> Option<&'static [Column]> {
    [
        (MovieRow::TABLE, MovieRow::COLUMNS),
        (GenreRow::TABLE, GenreRow::COLUMNS),
        (MovieGenreRow::TABLE, MovieGenreRow::COLUMNS),
        (CastRow::TABLE, CastRow::COLUMNS),
        (CrewRow::TABLE, CrewRow::COLUMNS),
    ]
    .into_iter()
    .find(|(name, _)| *name == table)
    .map(|(_, columns)| columns)
}
