//! Warehouse subcommand

use clap::{ArgGroup, Args};
use serde_json::json;
use tracing::info;

use super::commands::{open_store, print_load_summary, OutputFormat};
use super::CliError;
use crate::analytics::{QueryCatalog, QueryRows};
use crate::config::EtlConfig;
use crate::loader::{BigQueryLoader, LoadTarget};

/// Printed when `warehouse` is invoked without an action
pub const WAREHOUSE_USAGE: &str = "No action specified.\n\
Usage: tmdb-etl warehouse [--test | --create-dataset | --load | --query NAME]\n\
  --test            Check credentials and dataset access\n\
  --create-dataset  Create the dataset if it does not exist\n\
  --load            Replace the warehouse tables with the CSV tables\n\
  --query NAME      Run a named analytical query";

/// Warehouse actions (at most one per invocation)
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
#[command(group(
    ArgGroup::new("action")
        .args(["test", "create_dataset", "load", "query"])
        .multiple(false)
))]
pub struct WarehouseArgs {
    /// Check credentials, token exchange and dataset access
    #[arg(long)]
    pub test: bool,

    /// Create the dataset (location EU) unless it exists
    #[arg(long)]
    pub create_dataset: bool,

    /// Replace every warehouse table with the clean-tier CSV tables
    #[arg(long)]
    pub load: bool,

    /// Run a named analytical query (TOP_GENRES_BY_COUNT, POPULARITY_BY_GENRE,
    /// POPULARITY_TREND, ENGAGEMENT_SCORE, CATALOG_MATURITY, GENRE_STABILITY)
    #[arg(long, value_name = "NAME")]
    pub query: Option<String>,
}

/// The selected warehouse action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarehouseAction {
    /// `--test`
    Test,
    /// `--create-dataset`
    CreateDataset,
    /// `--load`
    Load,
    /// `--query NAME`
    Query(String),
}

impl WarehouseArgs {
    /// Selected action, `None` when no flag was given
    pub fn action(&self) -> Option<WarehouseAction> {
        if self.test {
            Some(WarehouseAction::Test)
        } else if self.create_dataset {
            Some(WarehouseAction::CreateDataset)
        } else if self.load {
            Some(WarehouseAction::Load)
        } else {
            self.query.clone().map(WarehouseAction::Query)
        }
    }

    /// Run the selected action
    ///
    /// Without an action the usage text is printed and nothing else happens.
    pub async fn execute(&self, config: &EtlConfig, format: OutputFormat) -> Result<(), CliError> {
        let Some(action) = self.action() else {
            println!("{WAREHOUSE_USAGE}");
            return Ok(());
        };

        // Unknown query names fail before any credentials are read.
        let catalog = QueryCatalog::embedded()?;
        if let WarehouseAction::Query(name) = &action {
            catalog.template(name)?;
        }

        let warehouse = config.require_warehouse()?;
        info!(
            ?action,
            project = %warehouse.project_id,
            dataset = %warehouse.dataset,
            "Warehouse command"
        );
        let project = warehouse.project_id.clone();
        let dataset = warehouse.dataset.clone();
        let loader = BigQueryLoader::new(warehouse)?;

        match action {
            WarehouseAction::Test => {
                loader.test_connection().await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", json!({ "action": "test", "dataset": dataset, "ok": true }))
                    }
                    OutputFormat::Human => println!("Connection OK: dataset {dataset} accessible"),
                }
            }
            WarehouseAction::CreateDataset => {
                let created = loader.create_dataset_if_absent().await?;
                match format {
                    OutputFormat::Json => println!(
                        "{}",
                        json!({ "action": "create-dataset", "dataset": dataset, "created": created })
                    ),
                    OutputFormat::Human if created => println!("Dataset {dataset} created"),
                    OutputFormat::Human => println!("Dataset {dataset} already exists"),
                }
            }
            WarehouseAction::Load => {
                let store = open_store(config);
                let summary = loader.load_tables(store.as_ref()).await?;
                print_load_summary(&summary, format);
            }
            WarehouseAction::Query(name) => {
                let sql = catalog.render(&name, &project, &dataset)?;
                let mut rows = loader.run_query(&sql).await?;
                rows.derive_columns(&name);
                print_query_rows(&name, &rows, format);
            }
        }
        Ok(())
    }
}

fn cell_text(cell: &serde_json::Value) -> String {
    match cell {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_query_rows(name: &str, rows: &QueryRows, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "action": "query", "query": name, "columns": rows.columns, "rows": rows.records() })
        ),
        OutputFormat::Human => {
            println!("{name} ({} rows)", rows.rows.len());
            println!("{}", rows.columns.join("\t"));
            for row in &rows.rows {
                let cells: Vec<String> = row.iter().map(cell_text).collect();
                println!("{}", cells.join("\t"));
            }
        }
    }
}
