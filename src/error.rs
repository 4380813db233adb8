//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while loading or exporting trade statistics
#[derive(Debug, Error)]
pub enum PipelineError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited text
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to open or read a spreadsheet
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// Workbook without any sheet
    #[error("Workbook has no sheets: {0}")]
    NoSheets(String),

    /// None of the candidate encodings decoded the file
    #[error("Could not decode {path} as any of: {tried}")]
    Encoding { path: String, tried: String },

    /// Table does not fit the positional column layout
    #[error("Layout mismatch in {path}: expected at least {expected} columns, found {found}")]
    Layout {
        path: String,
        expected: usize,
        found: usize,
    },

    /// Data row whose width differs from the other data rows
    #[error("Ragged row in {path}: line {line} has {found} columns, other rows have {expected}")]
    RaggedRow {
        path: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<calamine::Error> for PipelineError {
    fn from(err: calamine::Error) -> Self {
        PipelineError::Workbook(err.to_string())
    }
}
