//! Error type shared by the library.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Classification workbook not found at {}", .0.display())]
    WorkbookNotFound(PathBuf),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Drive error: {0}")]
    Drive(String),

    #[error("Invalid year range '{query}': {reason}")]
    InvalidYearRange { query: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Workbook(e.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Workbook(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
