//! SQLite storage engine for dashdb
//!
//! This crate implements the dashdb-core engine traits over SQLite, so native
//! hosts (CLI tools, desktop apps, servers) keep their records on disk.
//!
//! # Features
//!
//! - One database file per database name, `<dir>/<name>.sqlite3`
//! - Schema version tracked in `PRAGMA user_version`
//! - Read-only transactions as `BEGIN DEFERRED`, read-write as `BEGIN IMMEDIATE`
//! - Keyset cursors, ascending by key
//!
//! # Example
//!
//! ```rust
//! use dashdb_core::{Database, DatabaseConfig, Message, Record};
//! use dashdb_sqlite::SqliteEngine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let db = Database::new(SqliteEngine::new(dir.path()), DatabaseConfig::default());
//!
//! futures::executor::block_on(async {
//!     db.put(Record::new(1, "alpha")).await?;
//!
//!     let total = db.count().await?;
//!     assert_eq!(total.message, Message::Total);
//!     assert_eq!(total.value.as_count(), Some(1));
//!     Ok::<(), dashdb_core::DbError>(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod convert;
pub mod engine;
pub mod error;
pub mod schema;

// Re-export main types
pub use engine::{SqliteConnection, SqliteCursor, SqliteEngine, SqliteTransaction};
pub use error::{Result, SqliteError};
