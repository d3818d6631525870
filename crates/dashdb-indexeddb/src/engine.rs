//! IndexedDB storage engine implementing the dashdb engine contract.
//!
//! Each facade operation opens its own connection, runs one transaction and
//! closes the connection, so versionchange and delete requests from other
//! tabs are never blocked for long.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use dashdb_core::{
    Connection, Cursor, DbError, Engine, EventSink, Key, Opened, Record, Schema, Transaction,
    TxMode,
};
use js_sys::Promise;
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    IdbCursor, IdbCursorWithValue, IdbDatabase, IdbObjectStore, IdbRequest, IdbTransaction,
    IdbTransactionMode,
};

use crate::convert::{key_to_js, record_from_js, record_to_js};
use crate::error::describe;
use crate::idb;

type CoreResult<T> = dashdb_core::Result<T>;

fn request_error(err: JsValue) -> DbError {
    DbError::Request(describe(&err))
}

/// Browser IndexedDB engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedDbEngine;

impl IndexedDbEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl Engine for IndexedDbEngine {
    type Conn = IndexedDbConnection;

    fn is_available(&self) -> bool {
        idb::idb_factory().is_ok()
    }

    async fn open(&self, name: &str, version: u32, schema: &Schema) -> CoreResult<Opened<Self::Conn>> {
        if version == 0 {
            return Err(DbError::Open("version must be at least 1".into()));
        }
        let (db, created) = idb::open_database(name, version, schema).await?;
        debug!("opened '{}' at version {}", name, version);

        Ok(Opened {
            connection: IndexedDbConnection {
                db,
                key_path: Rc::from(schema.key_path.as_str()),
                on_error: RefCell::new(None),
            },
            created,
        })
    }

    async fn delete_database(&self, name: &str) -> CoreResult<()> {
        Ok(idb::delete_database(name).await?)
    }
}

/// An open `IDBDatabase`.
pub struct IndexedDbConnection {
    db: IdbDatabase,
    key_path: Rc<str>,
    on_error: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>>,
}

impl Connection for IndexedDbConnection {
    type Tx = IndexedDbTransaction;

    fn transaction(&self, store: &str, mode: TxMode) -> CoreResult<Self::Tx> {
        let idb_mode = match mode {
            TxMode::ReadOnly => IdbTransactionMode::Readonly,
            TxMode::ReadWrite => IdbTransactionMode::Readwrite,
        };
        let tx = self
            .db
            .transaction_with_str_and_mode(store, idb_mode)
            .map_err(|e| DbError::Transaction(describe(&e)))?;
        let object_store = tx
            .object_store(store)
            .map_err(|e| DbError::Transaction(describe(&e)))?;

        // Listen for completion before any request is issued
        let done = idb::transaction_to_promise(&tx);

        Ok(IndexedDbTransaction {
            inner: Rc::new(TxInner {
                tx,
                store: object_store,
                store_name: store.to_string(),
                key_path: self.key_path.clone(),
                mode,
                done,
            }),
        })
    }

    fn bind_error_sink(&self, sink: Rc<dyn EventSink>) {
        let db_name = self.db.name();
        let on_error = Closure::wrap(Box::new(move |event: web_sys::Event| {
            let message = event
                .target()
                .and_then(|target| target.dyn_into::<IdbRequest>().ok())
                .and_then(|req| req.error().ok().flatten())
                .map(|e| format!("{}: {}", e.name(), e.message()))
                .unwrap_or_else(|| format!("unknown error on database '{}'", db_name));
            sink.error(&DbError::Request(message));
        }) as Box<dyn FnMut(web_sys::Event)>);

        self.db.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        *self.on_error.borrow_mut() = Some(on_error);
    }

    fn close(self) {
        self.db.set_onerror(None);
        // Closing waits for pending transactions
        self.db.close();
    }
}

/// An `IDBTransaction` scoped to one object store.
#[derive(Clone)]
pub struct IndexedDbTransaction {
    inner: Rc<TxInner>,
}

struct TxInner {
    tx: IdbTransaction,
    store: IdbObjectStore,
    store_name: String,
    key_path: Rc<str>,
    mode: TxMode,
    done: Promise,
}

impl IndexedDbTransaction {
    fn writable(&self) -> CoreResult<&IdbObjectStore> {
        if !self.inner.mode.is_writable() {
            return Err(DbError::ReadOnly(self.inner.store_name.clone()));
        }
        Ok(&self.inner.store)
    }

    async fn lookup(&self, req: IdbRequest) -> CoreResult<Option<Record>> {
        let result = idb::await_request(&req).await?;
        if result.is_undefined() || result.is_null() {
            return Ok(None);
        }
        Ok(Some(record_from_js(&result, &self.inner.key_path)?))
    }
}

#[async_trait(?Send)]
impl Transaction for IndexedDbTransaction {
    type Cursor = IndexedDbCursor;

    fn mode(&self) -> TxMode {
        self.inner.mode
    }

    async fn put(&self, record: &Record) -> CoreResult<()> {
        let obj = record_to_js(record, &self.inner.key_path)?;
        let req = self.writable()?.put(&obj).map_err(request_error)?;
        idb::await_request(&req).await?;
        Ok(())
    }

    async fn get(&self, key: &Key) -> CoreResult<Option<Record>> {
        let req = self
            .inner
            .store
            .get(&key_to_js(key)?)
            .map_err(request_error)?;
        self.lookup(req).await
    }

    async fn get_by_index(&self, index: &str, value: &str) -> CoreResult<Option<Record>> {
        let index = self.inner.store.index(index).map_err(request_error)?;
        let req = index
            .get(&JsValue::from_str(value))
            .map_err(request_error)?;
        self.lookup(req).await
    }

    async fn delete(&self, key: &Key) -> CoreResult<()> {
        let req = self
            .writable()?
            .delete(&key_to_js(key)?)
            .map_err(request_error)?;
        idb::await_request(&req).await?;
        Ok(())
    }

    async fn open_cursor(&self) -> CoreResult<Self::Cursor> {
        let request = self.inner.store.open_cursor().map_err(request_error)?;
        let pending = idb::request_to_promise(&request);
        Ok(IndexedDbCursor {
            tx: self.clone(),
            request,
            pending: Some(pending),
            exhausted: false,
        })
    }

    async fn complete(&self) -> CoreResult<()> {
        JsFuture::from(self.inner.done.clone())
            .await
            .map_err(|e| DbError::Transaction(describe(&e)))?;
        Ok(())
    }

    fn abort(&self) {
        if let Err(e) = self.inner.tx.abort() {
            // Already committed or aborted
            debug!("abort on '{}' ignored: {}", self.inner.store_name, describe(&e));
        }
    }
}

/// Cursor request stepped with `continue()`.
pub struct IndexedDbCursor {
    tx: IndexedDbTransaction,
    request: IdbRequest,
    pending: Option<Promise>,
    exhausted: bool,
}

#[async_trait(?Send)]
impl Cursor for IndexedDbCursor {
    async fn next(&mut self) -> CoreResult<Option<Record>> {
        if self.exhausted {
            return Ok(None);
        }

        let step = match self.pending.take() {
            Some(first) => first,
            None => {
                let cursor: IdbCursor = self.request.result().map_err(request_error)?.unchecked_into();
                cursor.continue_().map_err(request_error)?;
                idb::request_to_promise(&self.request)
            }
        };

        let result = JsFuture::from(step).await.map_err(request_error)?;
        if result.is_null() || result.is_undefined() {
            self.exhausted = true;
            return Ok(None);
        }

        let cursor: IdbCursorWithValue = result.unchecked_into();
        let value = cursor.value().map_err(request_error)?;
        Ok(Some(record_from_js(&value, &self.tx.inner.key_path)?))
    }
}
