//! CSV table encoding
//!
//! Every table starts with its header row, including tables with no rows. Null
//! cells are written as empty fields and read back as `None`.

use csv::{ReaderBuilder, Writer, WriterBuilder};
use serde::Serialize;
use std::io::Write;
use tracing::debug;

use super::{OutputError, OutputResult};
use crate::transform::records::{Column, TableRecord};

/// Streaming CSV writer for one table
pub struct CsvTableWriter<W: Write> {
    writer: Writer<W>,
    rows_written: u64,
}

impl<W: Write> CsvTableWriter<W> {
    /// Create a writer and emit the header row
    pub fn new(inner: W, columns: &[Column]) -> OutputResult<Self> {
        // Header is written by hand so empty tables still carry it.
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(inner);
        writer
            .write_record(columns.iter().map(|c| c.name))
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write one row
    pub fn write_row<R: Serialize>(&mut self, row: &R) -> OutputResult<()> {
        self.writer
            .serialize(row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {e}")))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Write several rows
    pub fn write_rows<R: Serialize>(&mut self, rows: &[R]) -> OutputResult<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Number of data rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to flush: {e}")))
    }
}

/// Encode a table as CSV bytes
pub fn encode_table<R: TableRecord>(rows: &[R]) -> OutputResult<Vec<u8>> {
    let mut writer = CsvTableWriter::new(Vec::new(), R::COLUMNS)?;
    writer.write_rows(rows)?;
    debug!(table = R::TABLE, rows = writer.rows_written(), "Encoded table");
    writer.into_inner()
}

/// Decode a CSV table, checking its header against the table's columns
pub fn decode_table<R: TableRecord>(bytes: &[u8]) -> OutputResult<Vec<R>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);

    let found: Vec<String> = reader
        .headers()
        .map_err(|e| OutputError::CsvError(format!("Failed to read header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();
    let expected = R::column_names();
    if found != expected {
        return Err(OutputError::HeaderMismatch {
            table: R::TABLE.to_string(),
            expected: expected.join(","),
            found: found.join(","),
        });
    }

    reader
        .deserialize::<R>()
        .enumerate()
        .map(|(i, row)| {
            row.map_err(|e| OutputError::CsvError(format!("{} row {}: {e}", R::TABLE, i + 1)))
        })
        .collect()
}
