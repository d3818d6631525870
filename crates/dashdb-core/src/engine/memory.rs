//! In-memory storage engine
//!
//! A BTreeMap-backed engine for testing and development. Clones share the
//! same state, so a database written through one handle is visible through
//! every other, the way a browser profile's IndexedDB outlives individual
//! connections. Nothing survives the process.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::rc::Rc;

use async_trait::async_trait;
use tracing::debug;

use crate::engine::{Connection, Cursor, Engine, Opened, Transaction, TxMode};
use crate::error::{DbError, Result};
use crate::logging::prefix::DB;
use crate::record::{Key, Record};
use crate::schema::{Schema, SchemaBuilder, VALUE_FIELD};

/// In-memory object store engine.
///
/// Useful for:
/// - Unit testing the database facade
/// - Simulating an unavailable engine, a failing open or failing requests
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    state: Rc<RefCell<EngineState>>,
}

#[derive(Debug, Default)]
struct EngineState {
    unavailable: bool,
    fail_next_open: Option<String>,
    fail_next_request: Option<String>,
    /// key -> message for put, get and delete requests that always fail
    failing_keys: BTreeMap<Key, String>,
    open_connections: usize,
    databases: HashMap<String, MemoryDatabase>,
}

#[derive(Debug, Clone, Default)]
struct MemoryDatabase {
    version: u32,
    stores: BTreeMap<String, ObjectStore>,
}

#[derive(Debug, Clone, Default)]
struct ObjectStore {
    key_path: String,
    /// index name -> indexed field
    indexes: BTreeMap<String, String>,
    records: BTreeMap<Key, String>,
}

impl MemoryEngine {
    /// Create an engine with no databases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine whose capability check fails.
    pub fn unavailable() -> Self {
        let engine = Self::new();
        engine.state.borrow_mut().unavailable = true;
        engine
    }

    /// Make the next `open` fail with `message`.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.state.borrow_mut().fail_next_open = Some(message.into());
    }

    /// Make the next request inside any transaction fail with `message`.
    ///
    /// Requests are puts, gets, index lookups, deletes and cursor steps.
    pub fn fail_next_request(&self, message: impl Into<String>) {
        self.state.borrow_mut().fail_next_request = Some(message.into());
    }

    /// Make every put, get or delete of `key` fail with `message`.
    pub fn fail_requests_for(&self, key: impl Into<Key>, message: impl Into<String>) {
        self.state
            .borrow_mut()
            .failing_keys
            .insert(key.into(), message.into());
    }

    /// Drop all injected request failures.
    pub fn clear_request_failures(&self) {
        let mut state = self.state.borrow_mut();
        state.fail_next_request = None;
        state.failing_keys.clear();
    }

    /// Number of connections opened and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.state.borrow().open_connections
    }

    /// Schema version of `name`, if the database exists.
    pub fn version_of(&self, name: &str) -> Option<u32> {
        self.state.borrow().databases.get(name).map(|db| db.version)
    }

    /// Key path the store was created with.
    pub fn key_path_of(&self, name: &str, store: &str) -> Option<String> {
        self.state
            .borrow()
            .databases
            .get(name)
            .and_then(|db| db.stores.get(store))
            .map(|s| s.key_path.clone())
    }
}

impl SchemaBuilder for MemoryDatabase {
    fn has_store(&self, name: &str) -> Result<bool> {
        Ok(self.stores.contains_key(name))
    }

    fn create_store(&mut self, name: &str, key_path: &str) -> Result<()> {
        if self.stores.contains_key(name) {
            return Err(DbError::Upgrade(format!("object store '{}' already exists", name)));
        }
        self.stores.insert(
            name.to_string(),
            ObjectStore {
                key_path: key_path.to_string(),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn create_index(
        &mut self,
        store: &str,
        name: &str,
        key_path: &str,
        _unique: bool,
    ) -> Result<()> {
        let object_store = self
            .stores
            .get_mut(store)
            .ok_or_else(|| DbError::Upgrade(format!("no object store named '{}'", store)))?;
        if key_path != VALUE_FIELD {
            return Err(DbError::Upgrade(format!(
                "records have no field '{}' to index",
                key_path
            )));
        }
        object_store
            .indexes
            .insert(name.to_string(), key_path.to_string());
        Ok(())
    }
}

#[async_trait(?Send)]
impl Engine for MemoryEngine {
    type Conn = MemoryConnection;

    fn is_available(&self) -> bool {
        !self.state.borrow().unavailable
    }

    async fn open(&self, name: &str, version: u32, schema: &Schema) -> Result<Opened<Self::Conn>> {
        let mut state = self.state.borrow_mut();

        if let Some(message) = state.fail_next_open.take() {
            return Err(DbError::Open(message));
        }
        if version == 0 {
            return Err(DbError::Open("version must be at least 1".into()));
        }

        let existing = state.databases.get(name).map(|db| db.version).unwrap_or(0);
        if existing > version {
            return Err(DbError::VersionMismatch {
                name: name.to_string(),
                existing,
                requested: version,
            });
        }

        let mut created = false;
        if existing < version {
            // Upgrade against a copy so a failed install leaves nothing behind
            let mut db = state.databases.get(name).cloned().unwrap_or_default();
            created = schema.install(&mut db)?;
            db.version = version;
            state.databases.insert(name.to_string(), db);
            debug!("{} memory upgrade '{}' {} -> {}", DB, name, existing, version);
        }

        state.open_connections += 1;
        Ok(Opened {
            connection: MemoryConnection {
                state: self.state.clone(),
                database: name.to_string(),
            },
            created,
        })
    }

    async fn delete_database(&self, name: &str) -> Result<()> {
        self.state.borrow_mut().databases.remove(name);
        Ok(())
    }
}

/// Connection to one in-memory database.
#[derive(Debug)]
pub struct MemoryConnection {
    state: Rc<RefCell<EngineState>>,
    database: String,
}

impl Connection for MemoryConnection {
    type Tx = MemoryTransaction;

    fn transaction(&self, store: &str, mode: TxMode) -> Result<Self::Tx> {
        let snapshot = {
            let state = self.state.borrow();
            let object_store = state
                .databases
                .get(&self.database)
                .and_then(|db| db.stores.get(store))
                .ok_or_else(|| DbError::Transaction(format!("no object store named '{}'", store)))?;
            mode.is_writable().then(|| object_store.clone())
        };

        Ok(MemoryTransaction {
            inner: Rc::new(TxInner {
                state: self.state.clone(),
                database: self.database.clone(),
                store: store.to_string(),
                mode,
                finished: Cell::new(false),
                snapshot: RefCell::new(snapshot),
            }),
        })
    }

    fn close(self) {
        let mut state = self.state.borrow_mut();
        state.open_connections = state.open_connections.saturating_sub(1);
    }
}

/// Transaction handle over one in-memory store.
///
/// Writes apply immediately; read-write transactions keep a snapshot taken at
/// start so [`Transaction::abort`] can roll them back.
#[derive(Debug, Clone)]
pub struct MemoryTransaction {
    inner: Rc<TxInner>,
}

#[derive(Debug)]
struct TxInner {
    state: Rc<RefCell<EngineState>>,
    database: String,
    store: String,
    mode: TxMode,
    finished: Cell<bool>,
    snapshot: RefCell<Option<ObjectStore>>,
}

impl MemoryTransaction {
    fn with_store<T>(&self, f: impl FnOnce(&mut ObjectStore) -> Result<T>) -> Result<T> {
        if self.inner.finished.get() {
            return Err(DbError::Transaction(format!(
                "transaction on '{}' has already finished",
                self.inner.store
            )));
        }

        let mut state = self.inner.state.borrow_mut();
        let object_store = state
            .databases
            .get_mut(&self.inner.database)
            .and_then(|db| db.stores.get_mut(&self.inner.store))
            .ok_or_else(|| {
                DbError::Request(format!("object store '{}' no longer exists", self.inner.store))
            })?;
        f(object_store)
    }

    /// Fail with an injected request error, if one is armed.
    fn injected(&self, key: Option<&Key>) -> Result<()> {
        let mut state = self.inner.state.borrow_mut();
        let message = match state.fail_next_request.take() {
            Some(message) => Some(message),
            None => key.and_then(|k| state.failing_keys.get(k).cloned()),
        };
        match message {
            Some(message) => {
                debug!("{} injected failure on '{}': {}", DB, self.inner.store, message);
                Err(DbError::Request(message))
            }
            None => Ok(()),
        }
    }

    fn writable(&self) -> Result<()> {
        if self.inner.mode.is_writable() {
            Ok(())
        } else {
            Err(DbError::ReadOnly(self.inner.store.clone()))
        }
    }
}

#[async_trait(?Send)]
impl Transaction for MemoryTransaction {
    type Cursor = MemoryCursor;

    fn mode(&self) -> TxMode {
        self.inner.mode
    }

    async fn put(&self, record: &Record) -> Result<()> {
        self.writable()?;
        self.injected(Some(&record.key))?;
        self.with_store(|store| {
            store.records.insert(record.key.clone(), record.value.clone());
            Ok(())
        })
    }

    async fn get(&self, key: &Key) -> Result<Option<Record>> {
        self.injected(Some(key))?;
        self.with_store(|store| {
            Ok(store.records.get(key).map(|value| Record {
                key: key.clone(),
                value: value.clone(),
            }))
        })
    }

    async fn get_by_index(&self, index: &str, value: &str) -> Result<Option<Record>> {
        self.injected(None)?;
        self.with_store(|store| {
            if !store.indexes.contains_key(index) {
                return Err(DbError::Request(format!("no index named '{}'", index)));
            }
            Ok(store
                .records
                .iter()
                .find(|(_, v)| v.as_str() == value)
                .map(|(k, v)| Record {
                    key: k.clone(),
                    value: v.clone(),
                }))
        })
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        self.writable()?;
        self.injected(Some(key))?;
        self.with_store(|store| {
            store.records.remove(key);
            Ok(())
        })
    }

    async fn open_cursor(&self) -> Result<Self::Cursor> {
        self.with_store(|_| Ok(()))?;
        Ok(MemoryCursor {
            tx: self.clone(),
            last: None,
        })
    }

    async fn complete(&self) -> Result<()> {
        if self.inner.finished.replace(true) {
            return Err(DbError::Transaction(format!(
                "transaction on '{}' has already finished",
                self.inner.store
            )));
        }
        self.inner.snapshot.borrow_mut().take();
        Ok(())
    }

    fn abort(&self) {
        if self.inner.finished.replace(true) {
            return;
        }
        let Some(snapshot) = self.inner.snapshot.borrow_mut().take() else {
            return;
        };
        let mut state = self.inner.state.borrow_mut();
        if let Some(store) = state
            .databases
            .get_mut(&self.inner.database)
            .and_then(|db| db.stores.get_mut(&self.inner.store))
        {
            *store = snapshot;
        }
    }
}

/// Forward cursor resuming after the last key it returned.
#[derive(Debug)]
pub struct MemoryCursor {
    tx: MemoryTransaction,
    last: Option<Key>,
}

#[async_trait(?Send)]
impl Cursor for MemoryCursor {
    async fn next(&mut self) -> Result<Option<Record>> {
        let lower = match &self.last {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };
        self.tx.injected(None)?;
        let next = self.tx.with_store(|store| {
            Ok(store
                .records
                .range((lower, Bound::Unbounded))
                .next()
                .map(|(k, v)| Record {
                    key: k.clone(),
                    value: v.clone(),
                }))
        })?;

        if let Some(record) = &next {
            self.last = Some(record.key.clone());
        }
        Ok(next)
    }
}
