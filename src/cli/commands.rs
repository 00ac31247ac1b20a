//! Pipeline commands: extract, transform, load-db, run

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use super::warehouse::WarehouseArgs;
use super::CliError;
use crate::config::EtlConfig;
use crate::extractor::{DetailFetchReport, Extractor};
use crate::loader::{LoadSummary, LoadTarget, PostgresLoader};
use crate::snapshot::{FsSnapshotStore, SnapshotStore};
use crate::transform::{self, NormalizedTables};

/// TMDB batch ETL
#[derive(Parser, Debug)]
#[command(name = "tmdb-etl")]
#[command(
    about = "Extract the TMDB movie catalog, normalize it and load it into PostgreSQL or BigQuery",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Root directory for the raw/processed/clean tiers (overrides TMDB_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Attempts per catalog request, shared by rate-limit and other failures (1-20)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_attempts: Option<u32>,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,
}

impl Cli {
    /// Environment configuration with command-line overrides applied
    pub fn config(&self) -> Result<EtlConfig, CliError> {
        let config = EtlConfig::from_env()?;
        Ok(self.apply_overrides(config))
    }

    /// Apply `--data-dir` and `--max-attempts` to `config`
    pub fn apply_overrides(&self, mut config: EtlConfig) -> EtlConfig {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(attempts) = self.max_attempts {
            config.retry.max_attempts = attempts;
        }
        config
    }

    /// Run the selected command
    pub async fn execute(&self) -> Result<(), CliError> {
        let config = self.config()?;
        info!(command = ?self.command, data_dir = %config.data_dir.display(), "Starting");

        match &self.command {
            Commands::Extract => extract(&config, self.output_format).await,
            Commands::Transform => transform_tables(&config, self.output_format),
            Commands::LoadDb => load_db(&config, self.output_format).await,
            Commands::Run => run_pipeline(&config, self.output_format).await,
            Commands::Warehouse(args) => args.execute(&config, self.output_format).await,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch listings, genres, details and credits into snapshots
    Extract,
    /// Normalize processed snapshots into the five CSV tables
    Transform,
    /// Replace the PostgreSQL tables with the CSV tables
    LoadDb,
    /// extract, transform and load-db in sequence
    Run,
    /// BigQuery warehouse operations
    Warehouse(WarehouseArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

pub(crate) fn open_store(config: &EtlConfig) -> Arc<dyn SnapshotStore> {
    Arc::new(FsSnapshotStore::new(config.data_dir.clone()))
}

async fn extract(config: &EtlConfig, format: OutputFormat) -> Result<(), CliError> {
    let extractor = Extractor::from_config(config, open_store(config))?
        .with_progress(format == OutputFormat::Human);
    let report = extractor.run_full_extraction().await?;
    print_report(&report, format);
    Ok(())
}

fn transform_tables(config: &EtlConfig, format: OutputFormat) -> Result<(), CliError> {
    let store = open_store(config);
    let tables = transform::run_transform(store.as_ref())?;
    print_tables(&tables, format);
    Ok(())
}

async fn load_db(config: &EtlConfig, format: OutputFormat) -> Result<(), CliError> {
    let url = config.require_database_url()?;
    let store = open_store(config);
    let loader = PostgresLoader::connect(url).await?;
    let summary = loader.load_tables(store.as_ref()).await?;
    print_load_summary(&summary, format);
    Ok(())
}

async fn run_pipeline(config: &EtlConfig, format: OutputFormat) -> Result<(), CliError> {
    // Every phase's settings are checked before the first request goes out.
    config.require_api_key()?;
    let url = config.require_database_url()?;

    let store = open_store(config);
    let extractor =
        Extractor::from_config(config, store.clone())?.with_progress(format == OutputFormat::Human);
    let report = extractor.run_full_extraction().await?;
    print_report(&report, format);

    let tables = transform::run_transform(store.as_ref())?;
    print_tables(&tables, format);

    let loader = PostgresLoader::connect(url).await?;
    let summary = loader.load_tables(store.as_ref()).await?;
    print_load_summary(&summary, format);
    Ok(())
}

fn print_report(report: &DetailFetchReport, format: OutputFormat) {
    if !report.is_complete() {
        warn!(
            failed = report.failed.len(),
            ids = ?report.failed_ids(),
            "Some movies could not be fetched"
        );
    }
    match format {
        OutputFormat::Json => {
            let output = json!({
                "phase": "extract",
                "complete": report.is_complete(),
                "requested": report.requested,
                "succeeded": report.succeeded,
                "failed": report.failed,
            });
            println!("{output}");
        }
        OutputFormat::Human => {
            println!("\nExtraction completed");
            println!("Movies requested: {}", report.requested);
            println!("Movies fetched: {}", report.succeeded);
            if !report.failed.is_empty() {
                println!("Movies failed: {}", report.failed.len());
                for item in &report.failed {
                    println!("  {} ({}): {}", item.id, item.stage, item.error);
                }
            }
        }
    }
}

fn print_tables(tables: &NormalizedTables, format: OutputFormat) {
    let counts = tables.row_counts();
    match format {
        OutputFormat::Json => {
            let rows: serde_json::Map<String, serde_json::Value> = counts
                .iter()
                .map(|(table, rows)| (table.to_string(), json!(rows)))
                .collect();
            println!("{}", json!({ "phase": "transform", "rows": rows }));
        }
        OutputFormat::Human => {
            println!("\nTransform completed");
            for (table, rows) in counts {
                println!("{table}: {rows} rows");
            }
        }
    }
}

pub(crate) fn print_load_summary(summary: &LoadSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let rows: serde_json::Map<String, serde_json::Value> = summary
                .tables
                .iter()
                .map(|t| (t.table.clone(), json!(t.rows)))
                .collect();
            let output = json!({
                "phase": "load",
                "target": summary.target,
                "rows": rows,
                "total_rows": summary.total_rows(),
            });
            println!("{output}");
        }
        OutputFormat::Human => {
            println!("\nLoad into {} completed", summary.target);
            for t in &summary.tables {
                println!("{}: {} rows", t.table, t.rows);
            }
            println!("Total: {} rows", summary.total_rows());
        }
    }
}
