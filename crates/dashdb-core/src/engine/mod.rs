//! Storage engine contract
//!
//! The database facade drives an embedded, transactional object store through
//! these traits. They mirror the shape of the browser's IndexedDB API: a
//! versioned open with an upgrade phase, mode-scoped transactions, per-request
//! reads and writes, and cursors that step one record at a time.
//!
//! Implementations exist for:
//!
//! - **Memory**: [`MemoryEngine`], shared in-process state for tests
//! - **SQLite**: native, file-backed (`dashdb-sqlite` crate)
//! - **IndexedDB**: browser WASM (`dashdb-indexeddb` crate)
//!
//! All futures are `?Send`. Engines are driven from a single thread, either
//! the browser event loop or a current-thread runtime.

use std::rc::Rc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::record::{Key, Record};
use crate::schema::Schema;
use crate::sink::EventSink;

mod memory;

pub use memory::{MemoryConnection, MemoryCursor, MemoryEngine, MemoryTransaction};

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TxMode {
    #[serde(rename = "readonly")]
    ReadOnly,
    #[serde(rename = "readwrite")]
    ReadWrite,
}

impl TxMode {
    pub fn is_writable(self) -> bool {
        matches!(self, TxMode::ReadWrite)
    }
}

/// Result of a successful open.
pub struct Opened<C> {
    pub connection: C,
    /// The upgrade phase ran and created the store
    pub created: bool,
}

/// Entry point of an embedded object store.
#[async_trait(?Send)]
pub trait Engine {
    type Conn: Connection;

    /// Capability check. `false` means no open will be attempted.
    fn is_available(&self) -> bool;

    /// Open `name` at `version`, running [`Schema::install`] when the
    /// database does not exist yet or is older than `version`.
    async fn open(&self, name: &str, version: u32, schema: &Schema) -> Result<Opened<Self::Conn>>;

    /// Remove a database and everything in it. Absent databases are not an error.
    async fn delete_database(&self, name: &str) -> Result<()>;
}

/// An open database connection.
pub trait Connection {
    type Tx: Transaction;

    /// Start a transaction scoped to one store.
    fn transaction(&self, store: &str, mode: TxMode) -> Result<Self::Tx>;

    /// Route mid-session database errors to `sink`.
    ///
    /// Engines without asynchronous error events have nothing to bind.
    fn bind_error_sink(&self, _sink: Rc<dyn EventSink>) {}

    /// Close the connection once its transactions have finished.
    fn close(self);
}

/// A transaction over one store. Handles are cheap clones of the same
/// transaction.
#[async_trait(?Send)]
pub trait Transaction: Clone {
    type Cursor: Cursor;

    fn mode(&self) -> TxMode;

    /// Insert or overwrite the record with the same key.
    async fn put(&self, record: &Record) -> Result<()>;

    async fn get(&self, key: &Key) -> Result<Option<Record>>;

    /// First record whose indexed field equals `value`. Which of several
    /// matches is returned is engine-defined.
    async fn get_by_index(&self, index: &str, value: &str) -> Result<Option<Record>>;

    /// Remove the record if present.
    async fn delete(&self, key: &Key) -> Result<()>;

    /// Forward cursor over the whole store, ascending by key.
    async fn open_cursor(&self) -> Result<Self::Cursor>;

    /// Wait for the transaction's completion event.
    async fn complete(&self) -> Result<()>;

    /// Abandon the transaction, discarding its writes where the engine allows.
    fn abort(&self);
}

/// Sequential, resumable iterator over a store.
#[async_trait(?Send)]
pub trait Cursor {
    /// Advance and return the next record, or `None` once exhausted.
    async fn next(&mut self) -> Result<Option<Record>>;
}
