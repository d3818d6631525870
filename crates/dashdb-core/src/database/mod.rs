//! The record database facade
//!
//! A [`Database`] owns an engine handle and a [`DatabaseConfig`]. Each public
//! operation opens its own connection, makes sure the store exists at the
//! configured schema version, runs inside a single transaction of the right
//! mode, and closes the connection when that transaction completes. No
//! connection is kept between operations.
//!
//! Results travel on three separate channels:
//!
//! - capability absence is an ordinary [`Outcome`] with
//!   [`Message::NotSupported`], produced before any open is attempted
//! - engine failures go to the [`EventSink`] and the operation resolves to
//!   `Err`
//! - "not found" is an ordinary [`Outcome`] with [`Message::NotFound`]

use std::future::Future;
use std::rc::Rc;

use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::engine::{Connection, Engine, Transaction, TxMode};
use crate::error::{DbError, Result};
use crate::logging::prefix::DB;
use crate::outcome::{Context, Message, Outcome, Value};
use crate::sink::{EventSink, TracingSink};

mod ops;

pub use ops::{report_line, DELETE_ALL_DONE};

type TxOf<E> = <<E as Engine>::Conn as Connection>::Tx;

/// Record database over an embedded object store engine.
pub struct Database<E: Engine> {
    engine: E,
    config: DatabaseConfig,
    sink: Rc<dyn EventSink>,
}

impl<E: Engine> Database<E> {
    /// Create a database handle. Nothing is opened until the first operation.
    pub fn new(engine: E, config: DatabaseConfig) -> Self {
        Self {
            engine,
            config,
            sink: Rc::new(TracingSink),
        }
    }

    /// Replace the default tracing sink.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Rc::new(sink);
        self
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// `Some(not supported)` when the engine fails its capability check.
    fn check_available(&self) -> Option<Outcome> {
        if self.engine.is_available() {
            return None;
        }
        warn!("{} object store unavailable for '{}'", DB, self.config.name);
        Some(self.outcome(Value::Empty, Message::NotSupported, None, None))
    }

    fn context(&self, mode: Option<TxMode>, index: Option<&str>) -> Context {
        Context {
            database: self.config.name.clone(),
            store: self.config.schema.store.clone(),
            version: self.config.version,
            index: index.map(str::to_string),
            mode,
        }
    }

    fn outcome(
        &self,
        value: Value,
        message: Message,
        mode: Option<TxMode>,
        index: Option<&str>,
    ) -> Outcome {
        Outcome {
            value,
            message,
            context: self.context(mode, index),
        }
    }

    /// Hand an engine error to the sink and give it back for propagation.
    fn report(&self, err: DbError) -> DbError {
        self.sink.error(&err);
        err
    }

    /// Open a connection, creating the store on first open.
    async fn open(&self) -> Result<E::Conn> {
        let opened = self
            .engine
            .open(&self.config.name, self.config.version, &self.config.schema)
            .await
            .map_err(|e| self.report(e))?;

        if opened.created {
            info!(
                "{} created store '{}' in '{}' at version {}",
                DB, self.config.schema.store, self.config.name, self.config.version
            );
            self.sink.notice(&self.outcome(
                Value::Text(self.config.name.clone()),
                Message::DatabaseCreated,
                None,
                None,
            ));
            self.sink.notice(&self.outcome(
                Value::Text(self.config.schema.store.clone()),
                Message::StoreCreated,
                None,
                None,
            ));
        }

        opened.connection.bind_error_sink(self.sink.clone());
        Ok(opened.connection)
    }

    /// Run `body` inside one transaction on a fresh connection.
    ///
    /// On success the transaction's completion is awaited and the connection
    /// closed before the body's value is returned. On failure the transaction
    /// is aborted, the connection closed, and the error reported.
    async fn run<T, F, Fut>(&self, mode: TxMode, body: F) -> Result<T>
    where
        F: FnOnce(TxOf<E>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let conn = self.open().await?;
        let store = &self.config.schema.store;

        let tx = match conn.transaction(store, mode) {
            Ok(tx) => tx,
            Err(err) => {
                conn.close();
                return Err(self.report(err));
            }
        };

        match body(tx.clone()).await {
            Ok(value) => {
                let completed = tx.complete().await;
                conn.close();
                completed.map_err(|e| self.report(e))?;
                Ok(value)
            }
            Err(err) => {
                warn!("{} aborting {:?} transaction on '{}': {}", DB, mode, store, err);
                tx.abort();
                conn.close();
                Err(self.report(err))
            }
        }
    }
}
