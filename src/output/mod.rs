//! Table encoders

pub mod csv;

pub use self::csv::{decode_table, encode_table, CsvTableWriter};

/// Output encoder errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV encode or decode error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Header row does not match the table's columns
    #[error("header mismatch for {table}: expected [{expected}], found [{found}]")]
    HeaderMismatch {
        /// Table name
        table: String,
        /// Expected columns, comma separated
        expected: String,
        /// Columns found, comma separated
        found: String,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
