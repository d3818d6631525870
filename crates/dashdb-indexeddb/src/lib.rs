//! IndexedDB storage engine for dashdb (browser WASM)
//!
//! This crate implements the dashdb-core engine traits over the browser's
//! IndexedDB, so a WASM build of the database facade persists records in the
//! page's origin storage.
//!
//! # Schema
//!
//! Records are plain objects `{ dashId: key, value: "..." }` in the configured
//! object store, with the store's keyPath set to the configured key field and a
//! non-unique index over `value`. The store and index are created in the
//! `upgradeneeded` phase of the first open.
//!
//! # Example
//!
//! ```rust,ignore
//! use dashdb_core::{Database, DatabaseConfig, Record};
//! use dashdb_indexeddb::IndexedDbEngine;
//!
//! let db = Database::new(IndexedDbEngine::new(), DatabaseConfig::default());
//!
//! db.put(Record::new(1, "alpha")).await?;
//! let found = db.get(1).await?;
//! assert_eq!(found.value.as_text(), Some("alpha"));
//! ```

pub mod convert;
pub mod engine;
pub mod error;
pub mod idb;

pub use engine::{IndexedDbConnection, IndexedDbCursor, IndexedDbEngine, IndexedDbTransaction};
pub use error::{IndexedDbError, Result};
