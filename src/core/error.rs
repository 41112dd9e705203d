use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Classification resolver is closed")]
    ResolverClosed,
}

impl RegistryError {
    /// Row-level errors are counted and skipped; everything else aborts the run.
    pub fn is_row_level(&self) -> bool {
        matches!(self, RegistryError::InvalidInput(_))
    }
}
