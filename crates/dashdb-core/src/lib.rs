//! dashdb core
//!
//! A small persistence façade over an embedded, asynchronous, transactional
//! object store with one secondary index. Applications store, fetch, count,
//! enumerate and delete keyed records without managing the store's
//! open/upgrade lifecycle, transaction scoping, or completion events.
//!
//! The storage engine sits behind the [`engine`] traits. This crate ships an
//! in-memory engine; `dashdb-sqlite` and `dashdb-indexeddb` provide durable
//! native and browser engines.
//!
//! # Example
//!
//! ```rust
//! use dashdb_core::{Database, DatabaseConfig, MemoryEngine, Message, Record};
//!
//! # futures::executor::block_on(async {
//! let db = Database::new(MemoryEngine::new(), DatabaseConfig::default());
//!
//! db.put(Record::new(1, "alpha")).await?;
//!
//! let found = db.get(1).await?;
//! assert_eq!(found.message, Message::Found);
//! assert_eq!(found.value.as_text(), Some("alpha"));
//!
//! let missing = db.get(2).await?;
//! assert!(missing.is_not_found());
//! # Ok::<(), dashdb_core::DbError>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod logging;
pub mod outcome;
pub mod record;
pub mod schema;
pub mod sink;

// Re-export main types at crate root
pub use config::{DatabaseConfig, DEFAULT_DB_NAME, SCHEMA_VERSION};
pub use database::{report_line, Database, DELETE_ALL_DONE};
pub use engine::{Connection, Cursor, Engine, MemoryEngine, Opened, Transaction, TxMode};
pub use error::{DbError, Result};
pub use outcome::{Context, Message, Outcome, Value, NOT_SUPPORTED_MESSAGE};
pub use record::{Key, Record};
pub use schema::{IndexSpec, Schema, SchemaBuilder};
pub use sink::{ChannelSink, EventSink, SinkEvent, TracingSink};
