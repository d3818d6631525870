//! Conversions between dashdb keys and SQLite values
//!
//! Key columns carry no declared type, so integers and text keep their
//! storage class and SQLite's own cross-type ordering (INTEGER before TEXT)
//! matches [`Key`]'s ordering.

use dashdb_core::Key;
use rusqlite::types::Value;

use crate::error::{Result, SqliteError};

/// Convert a key to the SQLite value bound as a parameter
pub fn key_to_sql(key: &Key) -> Value {
    match key {
        Key::Int(n) => Value::Integer(*n),
        Key::Text(s) => Value::Text(s.clone()),
    }
}

/// Convert a stored SQLite value back to a key
pub fn key_from_sql(value: Value) -> Result<Key> {
    match value {
        Value::Integer(n) => Ok(Key::Int(n)),
        Value::Text(s) => Ok(Key::Text(s)),
        other => Err(SqliteError::InvalidKey(format!(
            "unsupported key storage class {:?}",
            other.data_type()
        ))),
    }
}

/// Quote an identifier for use in SQL text
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
