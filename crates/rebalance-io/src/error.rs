//! I/O error types for rebalance-io.

use std::path::PathBuf;

/// Errors from dataset loading and report writing.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the file holds no data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a row does not have one column per predictor plus the response.
    #[error("row {row_index} of {path} has {got} columns, expected {expected}")]
    WrongColumnCount {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based data row index (excluding header).
        row_index: usize,
        /// Columns the schema requires.
        expected: usize,
        /// Columns found in the row.
        got: usize,
    },

    /// Returned when a predictor cell is NaN, Inf, or not a number.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// Zero-based column index.
        col_index: usize,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when the response cell is not a known diagnosis symbol.
    #[error("unknown diagnosis \"{raw}\" in {path}, row {row_index}: expected N, O, normal, or abnormal")]
    UnknownLabel {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when the loaded rows cannot form a table.
    #[error("invalid dataset in {path}")]
    InvalidTable {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying table error.
        source: rebalance_data::DataError,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a report cannot be serialized.
    #[error("cannot serialize report for {path}")]
    Serialize {
        /// Destination of the report.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
