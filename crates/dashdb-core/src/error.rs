//! Error types shared by every engine and the database facade

use thiserror::Error;

/// Errors raised by a storage engine or by the database facade.
///
/// Payloads are plain strings so an error can be handed to the event sink
/// and still be returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// The embedded object store is not available in this environment
    #[error("object store not available: {0}")]
    NotAvailable(String),

    /// Opening the database failed
    #[error("open error: {0}")]
    Open(String),

    /// The database on disk is newer than the requested schema version
    #[error("database '{name}' is at version {existing}, requested {requested}")]
    VersionMismatch {
        name: String,
        existing: u32,
        requested: u32,
    },

    /// Creating the store or index during upgrade failed
    #[error("upgrade error: {0}")]
    Upgrade(String),

    /// Transaction could not be started, committed, or was already finished
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A write was attempted inside a read-only transaction
    #[error("store '{0}' is read-only in this transaction")]
    ReadOnly(String),

    /// A single request against the store failed
    #[error("request error: {0}")]
    Request(String),

    /// A stored or supplied record does not have the expected shape
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Engine-specific failure (filesystem, SQLite, JS exception)
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for database operations
pub type Result<T> = std::result::Result<T, DbError>;

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::InvalidRecord(err.to_string())
    }
}
