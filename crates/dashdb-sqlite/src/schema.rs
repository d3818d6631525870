//! Schema versioning and store creation
//!
//! The database file's `PRAGMA user_version` is the schema version. An open
//! at a newer version than the file runs [`Schema::install`] inside one
//! transaction and bumps `user_version`; an open at the same version touches
//! nothing.

use dashdb_core::schema::VALUE_FIELD;
use dashdb_core::{DbError, Schema, SchemaBuilder};
use rusqlite::Connection;
use tracing::debug;

use crate::convert::quote_ident;
use crate::error::{Result, SqliteError};

/// Read the schema version recorded in the database file
pub fn user_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Bring the database to `version`, creating the store on first open.
///
/// Returns `true` when the store was created.
///
/// # Errors
///
/// Returns [`SqliteError::VersionMismatch`] if the file is newer than
/// `version`, or the install error if store creation fails. A failed install
/// leaves the file unchanged.
pub fn upgrade(conn: &Connection, name: &str, version: u32, schema: &Schema) -> Result<bool> {
    let existing = user_version(conn)?;

    if existing > version {
        return Err(SqliteError::VersionMismatch {
            name: name.to_string(),
            existing,
            requested: version,
        });
    }
    if existing == version {
        return Ok(false);
    }

    // Apply the upgrade in a transaction
    let tx = conn.unchecked_transaction()?;
    let created = schema.install(&mut SqliteSchemaBuilder { conn: &tx })?;
    tx.pragma_update(None, "user_version", version)?;
    tx.commit()?;

    debug!("sqlite upgrade '{}' {} -> {}", name, existing, version);
    Ok(created)
}

/// Check whether a table exists
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?
        .exists([name])?)
}

/// Name of the SQLite index backing a store's secondary index
pub fn index_table_name(store: &str, index: &str) -> String {
    format!("{}__{}", store, index)
}

struct SqliteSchemaBuilder<'c> {
    conn: &'c Connection,
}

fn upgrade_error(err: impl std::fmt::Display) -> DbError {
    DbError::Upgrade(err.to_string())
}

impl SchemaBuilder for SqliteSchemaBuilder<'_> {
    fn has_store(&self, name: &str) -> dashdb_core::Result<bool> {
        table_exists(self.conn, name).map_err(upgrade_error)
    }

    fn create_store(&mut self, name: &str, key_path: &str) -> dashdb_core::Result<()> {
        // Untyped key column keeps integers and text in their own storage class
        let sql = format!(
            "CREATE TABLE {} ({} PRIMARY KEY NOT NULL, {} TEXT NOT NULL) WITHOUT ROWID",
            quote_ident(name),
            quote_ident(key_path),
            quote_ident(VALUE_FIELD),
        );
        self.conn.execute_batch(&sql).map_err(upgrade_error)
    }

    fn create_index(
        &mut self,
        store: &str,
        name: &str,
        key_path: &str,
        unique: bool,
    ) -> dashdb_core::Result<()> {
        if key_path != VALUE_FIELD {
            return Err(DbError::Upgrade(format!(
                "records have no field '{}' to index",
                key_path
            )));
        }
        let sql = format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            quote_ident(&index_table_name(store, name)),
            quote_ident(store),
            quote_ident(key_path),
        );
        self.conn.execute_batch(&sql).map_err(upgrade_error)
    }
}
