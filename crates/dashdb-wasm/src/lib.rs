//! dashdb WASM bridge
//!
//! Exposes the record database to JavaScript as a `DashDb` class backed by
//! IndexedDB. Every method takes a completion callback as its last argument
//! and returns immediately; the callback later receives `{ val, message }`.
//!
//! ```js
//! const db = new DashDb();
//! db.add(1, "alpha", ({ val, message }) => console.log(message, val));
//! db.removeAll(({ val, message }) => console.log(message, val)); // N+1 calls
//! ```
//!
//! Engine errors do not reach the callback. They are shown with
//! `window.alert`, or written to `console.error` where there is no window
//! (workers).

use std::future::Future;
use std::rc::Rc;

use dashdb_core::{Database, DatabaseConfig, DbError, EventSink, Key, Outcome, Record, Value};
use dashdb_indexeddb::{convert::key_from_js, IndexedDbEngine};
use futures::StreamExt;
use js_sys::Function;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

type BrowserDb = Database<IndexedDbEngine>;

/// Text JavaScript callers receive when IndexedDB is missing
pub const BROWSER_NOT_SUPPORTED_MESSAGE: &str =
    "Your browser doesn't support a stable version of IndexedDB.";

/// Sink that surfaces engine errors to the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertSink;

impl EventSink for AlertSink {
    fn error(&self, err: &DbError) {
        let message = err.to_string();
        match web_sys::window() {
            Some(window) => {
                let _ = window.alert_with_message(&message);
            }
            None => web_sys::console::error_1(&JsValue::from_str(&message)),
        }
    }

    fn notice(&self, outcome: &Outcome) {
        web_sys::console::log_1(&JsValue::from_str(&outcome.to_string()));
    }
}

/// Argument handed to every callback.
#[derive(Serialize)]
struct CallbackPayload<'a> {
    val: &'a Value,
    message: String,
}

fn payload(outcome: &Outcome) -> CallbackPayload<'_> {
    let message = if outcome.is_not_supported() {
        BROWSER_NOT_SUPPORTED_MESSAGE.to_string()
    } else {
        outcome.message.to_string()
    };
    CallbackPayload {
        val: &outcome.value,
        message,
    }
}

fn outcome_to_js(outcome: &Outcome) -> Result<JsValue, JsValue> {
    let payload = payload(outcome);
    let json = serde_json::to_string(&payload)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))?;
    js_sys::JSON::parse(&json)
}

fn deliver(callback: &Function, outcome: &Outcome) {
    let result = outcome_to_js(outcome).and_then(|payload| callback.call1(&JsValue::NULL, &payload));
    if let Err(e) = result {
        web_sys::console::error_1(&e);
    }
}

fn parse_key(key: &JsValue) -> Result<Key, JsValue> {
    key_from_js(key).map_err(|e| JsValue::from_str(&format!("Invalid key: {}", e)))
}

/// Record database handle for JavaScript.
#[wasm_bindgen]
pub struct DashDb {
    db: Rc<BrowserDb>,
}

impl DashDb {
    fn with_config(config: DatabaseConfig) -> DashDb {
        // Route Rust panics to console.error instead of "RuntimeError: unreachable"
        console_error_panic_hook::set_once();

        let db = Database::new(IndexedDbEngine::new(), config).with_sink(AlertSink);
        DashDb { db: Rc::new(db) }
    }

    /// Run `op` in the background and hand its outcome to `callback`.
    fn spawn<F, Fut>(&self, callback: Function, op: F)
    where
        F: FnOnce(Rc<BrowserDb>) -> Fut + 'static,
        Fut: Future<Output = dashdb_core::Result<Outcome>> + 'static,
    {
        let db = self.db.clone();
        spawn_local(async move {
            // Errors were already shown by the sink
            if let Ok(outcome) = op(db).await {
                deliver(&callback, &outcome);
            }
        });
    }
}

#[wasm_bindgen]
impl DashDb {
    /// Handle on database `name` (default `dashDb`) with the default schema.
    #[wasm_bindgen(constructor)]
    pub fn new(name: Option<String>) -> DashDb {
        let config = name.map(DatabaseConfig::named).unwrap_or_default();
        Self::with_config(config)
    }

    /// Handle built from a JSON `DatabaseConfig`.
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(json: &str) -> Result<DashDb, JsValue> {
        let config = DatabaseConfig::from_json(json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
        Ok(Self::with_config(config))
    }

    /// Name of the database this handle opens
    #[wasm_bindgen(getter)]
    pub fn name(&self) -> String {
        self.db.config().name.clone()
    }

    /// Insert or overwrite `{ key, value }`.
    pub fn add(&self, key: JsValue, value: String, callback: Function) -> Result<(), JsValue> {
        let key = parse_key(&key)?;
        self.spawn(callback, move |db| async move {
            db.put(Record::new(key, value)).await
        });
        Ok(())
    }

    /// Insert `count` random records keyed `0..count`.
    #[wasm_bindgen(js_name = addTestData)]
    pub fn add_test_data(&self, count: u32, callback: Function) {
        self.spawn(callback, move |db| async move { db.put_many(count).await });
    }

    pub fn get(&self, key: JsValue, callback: Function) -> Result<(), JsValue> {
        let key = parse_key(&key)?;
        self.spawn(callback, move |db| async move { db.get(key).await });
        Ok(())
    }

    #[wasm_bindgen(js_name = getIndex)]
    pub fn get_index(&self, value: String, callback: Function) {
        self.spawn(callback, move |db| async move { db.get_by_index(value).await });
    }

    #[wasm_bindgen(js_name = getCount)]
    pub fn get_count(&self, callback: Function) {
        self.spawn(callback, |db| async move { db.count().await });
    }

    #[wasm_bindgen(js_name = getSize)]
    pub fn get_size(&self, callback: Function) {
        self.spawn(callback, |db| async move { db.size_report().await });
    }

    #[wasm_bindgen(js_name = readAll)]
    pub fn read_all(&self, callback: Function) {
        self.spawn(callback, |db| async move { db.read_all().await });
    }

    pub fn remove(&self, key: JsValue, callback: Function) -> Result<(), JsValue> {
        let key = parse_key(&key)?;
        self.spawn(callback, move |db| async move { db.delete(key).await });
        Ok(())
    }

    /// Delete every record. The callback runs once per deleted record and
    /// once more with "All Data Removed".
    #[wasm_bindgen(js_name = removeAll)]
    pub fn remove_all(&self, callback: Function) {
        let db = self.db.clone();
        spawn_local(async move {
            let mut outcomes = db.delete_all();
            while let Some(outcome) = outcomes.next().await {
                if let Ok(outcome) = outcome {
                    deliver(&callback, &outcome);
                }
            }
        });
    }

    /// Delete database `name`, or this handle's database when omitted.
    #[wasm_bindgen(js_name = deleteDatabase)]
    pub fn delete_database(&self, name: Option<String>, callback: Function) {
        self.spawn(callback, move |db| async move {
            let name = name.unwrap_or_else(|| db.config().name.clone());
            db.delete_database(&name).await
        });
    }
}

/// Get the dashdb version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
