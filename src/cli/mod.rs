//! CLI command implementations

pub mod commands;
pub mod error;
pub mod warehouse;

pub use commands::{Cli, Commands, OutputFormat};
pub use error::CliError;
pub use warehouse::{WarehouseAction, WarehouseArgs};
