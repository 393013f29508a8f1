use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FarmaciaError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Input format error: {0}")]
    InputFormat(String),

    #[error("Input is missing expected columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("No store found at {}", .0.display())]
    StoreNotFound(PathBuf),

    #[error("Cannot open store at {}: {source}", .path.display())]
    StoreConnection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Identifier recovery mismatch: inserted {inserted} movements, recovered {recovered} ids")]
    IdentifierRecoveryMismatch { inserted: usize, recovered: usize },

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, FarmaciaError>;

impl FarmaciaError {
    /// Reclassify a SQLite constraint failure, keeping other storage errors as-is.
    pub fn from_insert(err: rusqlite::Error, context: impl FnOnce() -> String) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => {
                FarmaciaError::ConstraintViolation(format!("{}: {err}", context()))
            }
            _ => FarmaciaError::Db(err),
        }
    }
}
