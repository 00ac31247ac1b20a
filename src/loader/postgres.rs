//! PostgreSQL full-refresh loader
//!
//! Each table is replaced inside its own transaction: drop, create with typed
//! columns, then multi-row inserts in chunks. Identifiers are always quoted since
//! `cast` and `order` are reserved words.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{debug, info};

use super::{LoadError, LoadResult, LoadSummary, LoadTarget, TableLoad, TableSet};
use crate::snapshot::SnapshotStore;
use crate::transform::records::{CellValue, ColumnKind, TableRecord};

const TARGET: &str = "postgres";

/// Schema holding the five tables
pub const DEFAULT_SCHEMA: &str = "tmdb";

/// Rows per INSERT statement
pub const INSERT_CHUNK_ROWS: usize = 1000;

/// Loader for a PostgreSQL database
pub struct PostgresLoader {
    pool: PgPool,
    schema: String,
}

impl PostgresLoader {
    /// Connect to `database_url`
    ///
    /// # Errors
    /// [`LoadError::LoadTargetUnreachable`] if no connection can be opened.
    pub async fn connect(database_url: &str) -> LoadResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|e| LoadError::unreachable(TARGET, e))?;
        info!("Connected to PostgreSQL");
        Ok(Self::with_pool(pool))
    }

    /// Wrap an existing pool
    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    /// Load into a different schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// `CREATE SCHEMA IF NOT EXISTS`
    pub async fn ensure_schema(&self) -> LoadResult<()> {
        sqlx::query(&create_schema_sql(&self.schema))
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        debug!(schema = %self.schema, "Schema ensured");
        Ok(())
    }

    /// Replace one table with `rows`
    pub async fn load_table<R: TableRecord>(&self, rows: &[R]) -> LoadResult<u64> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        sqlx::query(&drop_table_sql::<R>(&self.schema))
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        sqlx::query(&create_table_sql::<R>(&self.schema))
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        let mut inserted = 0u64;
        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut qb: QueryBuilder<'_, Postgres> =
                QueryBuilder::new(insert_prefix_sql::<R>(&self.schema));
            qb.push_values(chunk, |mut b, row| {
                for cell in row.cells() {
                    match cell {
                        CellValue::Integer(v) => b.push_bind(v),
                        CellValue::Float(v) => b.push_bind(v),
                        CellValue::Text(v) => b.push_bind(v),
                        CellValue::Date(v) => b.push_bind(v),
                    };
                }
            });
            let result = qb.build().execute(&mut *tx).await.map_err(classify)?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(classify)?;
        info!(table = R::TABLE, schema = %self.schema, rows = inserted, "Table loaded");
        Ok(inserted)
    }

    /// Replace all five tables, in load order
    pub async fn load_all(&self, tables: &TableSet) -> LoadResult<LoadSummary> {
        self.ensure_schema().await?;

        let loads = vec![
            self.load_named(&tables.movies).await?,
            self.load_named(&tables.genres).await?,
            self.load_named(&tables.movie_genres).await?,
            self.load_named(&tables.cast).await?,
            self.load_named(&tables.crew).await?,
        ];

        Ok(LoadSummary {
            target: TARGET.to_string(),
            tables: loads,
        })
    }

    async fn load_named<R: TableRecord>(&self, rows: &[R]) -> LoadResult<TableLoad> {
        let rows = self.load_table(rows).await?;
        Ok(TableLoad {
            table: R::TABLE.to_string(),
            rows,
        })
    }
}

#[async_trait]
impl LoadTarget for PostgresLoader {
    fn name(&self) -> &'static str {
        TARGET
    }

    async fn load_tables(&self, store: &dyn SnapshotStore) -> LoadResult<LoadSummary> {
        let tables = TableSet::read(store)?;
        self.load_all(&tables).await
    }
}

fn classify(e: sqlx::Error) -> LoadError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Configuration(_) => LoadError::unreachable(TARGET, e),
        other => LoadError::rejected(TARGET, other),
    }
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified<R: TableRecord>(schema: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(R::TABLE))
}

fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Integer => "BIGINT",
        ColumnKind::Float => "DOUBLE PRECISION",
        ColumnKind::Text => "TEXT",
        ColumnKind::Date => "DATE",
    }
}

/// `CREATE SCHEMA IF NOT EXISTS "<schema>"`
pub fn create_schema_sql(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema))
}

/// `DROP TABLE IF EXISTS ... CASCADE`
pub fn drop_table_sql<R: TableRecord>(schema: &str) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", qualified::<R>(schema))
}

/// `CREATE TABLE` with typed, quoted columns
pub fn create_table_sql<R: TableRecord>(schema: &str) -> String {
    let columns: Vec<String> = R::COLUMNS
        .iter()
        .map(|c| {
            let null = if c.nullable { "" } else { " NOT NULL" };
            format!("{} {}{}", quote_ident(c.name), sql_type(c.kind), null)
        })
        .collect();
    format!("CREATE TABLE {} ({})", qualified::<R>(schema), columns.join(", "))
}

/// `INSERT INTO ... (cols) ` prefix for `push_values`
pub fn insert_prefix_sql<R: TableRecord>(schema: &str) -> String {
    let columns: Vec<String> = R::COLUMNS.iter().map(|c| quote_ident(c.name)).collect();
    format!(
        "INSERT INTO {} ({}) ",
        qualified::<R>(schema),
        columns.join(", ")
    )
}
