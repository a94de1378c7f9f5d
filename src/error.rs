use thiserror::Error;

use crate::query::Intent;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Failed to download workbook from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to parse workbook: {0}")]
    Parse(String),

    #[error("Sheet '{0}' not found in the Excel file.")]
    SheetNotFound(String),

    #[error("{}", .0.not_found_message())]
    NotFound(Intent),

    #[error(
        "Please enter a valid query like STATUS ..., CLIENT ..., ACCOUNT ..., CLIENT/ACCOUNT ... or TRADELIST"
    )]
    InvalidQuery,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViewerError {
    /// True for the failures that come from the workbook source rather than the query.
    pub fn is_upstream(&self) -> bool {
        matches!(self, ViewerError::Fetch { .. } | ViewerError::Parse(_))
    }
}

impl From<calamine::Error> for ViewerError {
    fn from(err: calamine::Error) -> Self {
        ViewerError::Parse(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ViewerError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ViewerError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
