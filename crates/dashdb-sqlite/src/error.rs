//! Error types for the SQLite storage engine

use dashdb_core::DbError;
use thiserror::Error;

/// Result type for SQLite engine internals
pub type Result<T> = std::result::Result<T, SqliteError>;

/// Errors that can occur inside the SQLite engine
#[derive(Debug, Error)]
pub enum SqliteError {
    /// Database connection or query error
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error (database files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database file is at a newer schema version than requested
    #[error("database '{name}' is at version {existing}, requested {requested}")]
    VersionMismatch {
        name: String,
        existing: u32,
        requested: u32,
    },

    /// Stored key is neither an integer nor text
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Error raised by the engine contract itself (schema install)
    #[error(transparent)]
    Core(#[from] DbError),
}

/// Convert SqliteError to DbError for the engine contract
impl From<SqliteError> for DbError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Database(e) => DbError::Backend(format!("SQLite: {}", e)),
            SqliteError::Io(e) => DbError::Backend(format!("IO: {}", e)),
            SqliteError::VersionMismatch {
                name,
                existing,
                requested,
            } => DbError::VersionMismatch {
                name,
                existing,
                requested,
            },
            SqliteError::InvalidKey(msg) => DbError::InvalidRecord(msg),
            SqliteError::Core(e) => e,
        }
    }
}
