//! Error types for the IndexedDB storage engine

use dashdb_core::DbError;
use thiserror::Error;

/// Result type for IndexedDB engine internals
pub type Result<T> = std::result::Result<T, IndexedDbError>;

/// Errors that can occur inside the IndexedDB engine
#[derive(Debug, Error)]
pub enum IndexedDbError {
    /// IndexedDB is not available in this environment
    #[error("IndexedDB not available: {0}")]
    NotAvailable(String),

    /// Database open/upgrade error
    #[error("IndexedDB open error: {0}")]
    Open(String),

    /// Database exists at a newer version than requested
    #[error("database '{name}' is at version {existing}, requested {requested}")]
    VersionMismatch {
        name: String,
        existing: u32,
        requested: u32,
    },

    /// Transaction error
    #[error("IndexedDB transaction error: {0}")]
    Transaction(String),

    /// Request error from IDB operation
    #[error("IndexedDB request error: {0}")]
    Request(String),

    /// Stored object does not have the record shape
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// JavaScript value conversion error
    #[error("JS conversion error: {0}")]
    JsValue(String),

    /// Error raised by the engine contract itself (schema install)
    #[error(transparent)]
    Core(#[from] DbError),
}

impl From<wasm_bindgen::JsValue> for IndexedDbError {
    fn from(val: wasm_bindgen::JsValue) -> Self {
        IndexedDbError::Request(describe(&val))
    }
}

/// Render a thrown JS value (usually a DOMException) as text.
pub fn describe(val: &wasm_bindgen::JsValue) -> String {
    if let Some(s) = val.as_string() {
        return s;
    }
    js_sys::JSON::stringify(val)
        .map(String::from)
        .unwrap_or_else(|_| format!("{:?}", val))
}

/// Convert IndexedDbError to DbError for the engine contract
impl From<IndexedDbError> for DbError {
    fn from(err: IndexedDbError) -> Self {
        match err {
            IndexedDbError::NotAvailable(msg) => DbError::NotAvailable(msg),
            IndexedDbError::Open(msg) => DbError::Open(msg),
            IndexedDbError::VersionMismatch {
                name,
                existing,
                requested,
            } => DbError::VersionMismatch {
                name,
                existing,
                requested,
            },
            IndexedDbError::Transaction(msg) => DbError::Transaction(msg),
            IndexedDbError::Request(msg) => DbError::Request(msg),
            IndexedDbError::InvalidRecord(msg) => DbError::InvalidRecord(msg),
            IndexedDbError::JsValue(msg) => DbError::Backend(format!("IndexedDB JS: {}", msg)),
            IndexedDbError::Core(e) => e,
        }
    }
}
