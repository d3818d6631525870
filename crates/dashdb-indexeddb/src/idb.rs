//! Low-level IndexedDB helpers using web-sys
//!
//! Wraps the callback-based IndexedDB API into Rust futures using
//! `wasm_bindgen_futures::JsFuture` and `js_sys::Promise`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use dashdb_core::{DbError, Schema, SchemaBuilder};
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    IdbDatabase, IdbFactory, IdbOpenDbRequest, IdbRequest, IdbTransaction,
    IdbVersionChangeEvent,
};

use crate::error::{describe, IndexedDbError, Result};

type EventClosure = Closure<dyn FnMut(web_sys::Event)>;

/// Get the global IndexedDB factory.
pub fn idb_factory() -> Result<IdbFactory> {
    let global = js_sys::global();

    let idb: JsValue = js_sys::Reflect::get(&global, &"indexedDB".into())
        .map_err(|_| IndexedDbError::NotAvailable("no indexedDB on global".into()))?;

    if idb.is_undefined() || idb.is_null() {
        return Err(IndexedDbError::NotAvailable(
            "indexedDB is null/undefined".into(),
        ));
    }

    idb.dyn_into::<IdbFactory>()
        .map_err(|_| IndexedDbError::NotAvailable("indexedDB is not IdbFactory".into()))
}

fn dom_error(err: Option<web_sys::DomException>, fallback: &str) -> JsValue {
    err.map(|e| JsValue::from(format!("{}: {}", e.name(), e.message())))
        .unwrap_or_else(|| JsValue::from_str(fallback))
}

/// Convert an IdbRequest into a JS Promise that resolves with the request's result.
///
/// The error event is stopped here so it does not also reach the database's
/// `onerror` handler. Calling this again after `continue()` re-arms the
/// handlers for the next success event of the same request.
pub fn request_to_promise(req: &IdbRequest) -> Promise {
    let req = req.clone();

    Promise::new(&mut move |resolve, reject| {
        // Store closures in Rc<RefCell> to manage their lifetime without leaking
        let closures: Rc<RefCell<Option<(EventClosure, EventClosure)>>> =
            Rc::new(RefCell::new(None));

        let req_s = req.clone();
        let closures_for_success = closures.clone();
        let on_success = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let result = req_s.result().unwrap_or(JsValue::UNDEFINED);
            let _ = resolve.call1(&JsValue::UNDEFINED, &result);
            *closures_for_success.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        let req_e = req.clone();
        let closures_for_error = closures.clone();
        let on_error = Closure::wrap(Box::new(move |event: web_sys::Event| {
            event.stop_propagation();
            let msg = dom_error(req_e.error().ok().flatten(), "unknown IDB error");
            let _ = reject.call1(&JsValue::UNDEFINED, &msg);
            *closures_for_error.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        req.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
        req.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        // Keep both closures alive until one fires
        *closures.borrow_mut() = Some((on_success, on_error));
    })
}

/// Convert an IdbTransaction's completion into a JS Promise.
///
/// Resolves on `complete`, rejects on `error` or `abort`. Create it when the
/// transaction starts so the completion event cannot be missed.
pub fn transaction_to_promise(tx: &IdbTransaction) -> Promise {
    let tx = tx.clone();

    Promise::new(&mut move |resolve, reject| {
        type ClosureSet = (EventClosure, EventClosure, EventClosure);
        let closures: Rc<RefCell<Option<ClosureSet>>> = Rc::new(RefCell::new(None));

        let closures_for_complete = closures.clone();
        let on_complete = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let _ = resolve.call0(&JsValue::UNDEFINED);
            *closures_for_complete.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        let tx_e = tx.clone();
        let reject_e = reject.clone();
        let closures_for_error = closures.clone();
        let on_error = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let msg = dom_error(tx_e.error(), "transaction error");
            let _ = reject_e.call1(&JsValue::UNDEFINED, &msg);
            *closures_for_error.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        let tx_a = tx.clone();
        let closures_for_abort = closures.clone();
        let on_abort = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let msg = dom_error(tx_a.error(), "transaction aborted");
            let _ = reject.call1(&JsValue::UNDEFINED, &msg);
            *closures_for_abort.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        tx.set_oncomplete(Some(on_complete.as_ref().unchecked_ref()));
        tx.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        tx.set_onabort(Some(on_abort.as_ref().unchecked_ref()));

        *closures.borrow_mut() = Some((on_complete, on_error, on_abort));
    })
}

/// Await an IdbRequest, resolving to its result JsValue.
pub async fn await_request(req: &IdbRequest) -> Result<JsValue> {
    JsFuture::from(request_to_promise(req))
        .await
        .map_err(|e| IndexedDbError::Request(describe(&e)))
}

/// Open `name` at `version`, installing `schema` in the upgrade phase.
///
/// Returns the database and whether the upgrade created the store. An install
/// failure aborts the upgrade transaction, so the database is left as it was.
pub async fn open_database(
    name: &str,
    version: u32,
    schema: &Schema,
) -> Result<(IdbDatabase, bool)> {
    let factory = idb_factory()?;

    let open_req: IdbOpenDbRequest = factory
        .open_with_u32(name, version)
        .map_err(|e| IndexedDbError::Open(describe(&e)))?;

    let created = Rc::new(Cell::new(false));
    let install_error: Rc<RefCell<Option<DbError>>> = Rc::new(RefCell::new(None));

    let schema = schema.clone();
    let req_for_upgrade = open_req.clone();
    let created_flag = created.clone();
    let install_slot = install_error.clone();
    let on_upgrade = Closure::wrap(Box::new(move |_event: IdbVersionChangeEvent| {
        match install(&req_for_upgrade, &schema) {
            Ok(was_created) => created_flag.set(was_created),
            Err(err) => {
                if let Some(tx) = req_for_upgrade.transaction() {
                    let _ = tx.abort();
                }
                *install_slot.borrow_mut() = Some(err);
            }
        }
    }) as Box<dyn FnMut(IdbVersionChangeEvent)>);

    open_req.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));

    let result = JsFuture::from(request_to_promise(open_req.unchecked_ref())).await;

    // Open is settled, release the upgrade handler
    open_req.set_onupgradeneeded(None);
    drop(on_upgrade);

    let install_failure = install_error.borrow_mut().take();
    if let Some(err) = install_failure {
        return Err(err.into());
    }

    let result = match result {
        Ok(value) => value,
        Err(e) => return Err(open_failure(&factory, name, version, &open_req, &e).await),
    };

    let db = result
        .dyn_into::<IdbDatabase>()
        .map_err(|_| IndexedDbError::Open("result is not IdbDatabase".into()))?;
    Ok((db, created.get()))
}

fn install(req: &IdbOpenDbRequest, schema: &Schema) -> dashdb_core::Result<bool> {
    let db: IdbDatabase = req
        .result()
        .map_err(|e| DbError::Upgrade(describe(&e)))?
        .unchecked_into();
    let tx = req
        .transaction()
        .ok_or_else(|| DbError::Upgrade("no upgrade transaction".into()))?;

    schema.install(&mut IdbSchemaBuilder { db: &db, tx: &tx })
}

async fn open_failure(
    factory: &IdbFactory,
    name: &str,
    version: u32,
    req: &IdbOpenDbRequest,
    err: &JsValue,
) -> IndexedDbError {
    let is_version_error = req
        .error()
        .ok()
        .flatten()
        .map(|e| e.name() == "VersionError")
        .unwrap_or(false);

    if is_version_error {
        if let Ok(existing) = current_version(factory, name).await {
            return IndexedDbError::VersionMismatch {
                name: name.to_string(),
                existing,
                requested: version,
            };
        }
    }
    IndexedDbError::Open(describe(err))
}

/// Version of an existing database, read by opening it without a version.
async fn current_version(factory: &IdbFactory, name: &str) -> Result<u32> {
    let req = factory
        .open(name)
        .map_err(|e| IndexedDbError::Open(describe(&e)))?;
    let db: IdbDatabase = await_request(req.unchecked_ref()).await?.unchecked_into();
    let version = db.version() as u32;
    db.close();
    Ok(version)
}

/// Delete an IndexedDB database by name, resolving once it is gone.
pub async fn delete_database(name: &str) -> Result<()> {
    let factory = idb_factory()?;
    let req = factory
        .delete_database(name)
        .map_err(|e| IndexedDbError::Open(format!("delete db: {}", describe(&e))))?;
    JsFuture::from(request_to_promise(req.unchecked_ref()))
        .await
        .map_err(|e| IndexedDbError::Open(format!("delete db: {}", describe(&e))))?;
    Ok(())
}

/// Applies schema creation inside the `upgradeneeded` handler.
struct IdbSchemaBuilder<'a> {
    db: &'a IdbDatabase,
    tx: &'a IdbTransaction,
}

fn upgrade_error(err: JsValue) -> DbError {
    DbError::Upgrade(describe(&err))
}

impl SchemaBuilder for IdbSchemaBuilder<'_> {
    fn has_store(&self, name: &str) -> dashdb_core::Result<bool> {
        Ok(self.db.object_store_names().contains(name))
    }

    fn create_store(&mut self, name: &str, key_path: &str) -> dashdb_core::Result<()> {
        let params = web_sys::IdbObjectStoreParameters::new();
        js_sys::Reflect::set(&params, &"keyPath".into(), &key_path.into())
            .map_err(upgrade_error)?;
        self.db
            .create_object_store_with_optional_parameters(name, &params)
            .map_err(upgrade_error)?;
        Ok(())
    }

    fn create_index(
        &mut self,
        store: &str,
        name: &str,
        key_path: &str,
        unique: bool,
    ) -> dashdb_core::Result<()> {
        let store = self.tx.object_store(store).map_err(upgrade_error)?;
        let params = web_sys::IdbIndexParameters::new();
        js_sys::Reflect::set(&params, &"unique".into(), &JsValue::from_bool(unique))
            .map_err(upgrade_error)?;
        store
            .create_index_with_str_and_optional_parameters(name, key_path, &params)
            .map_err(upgrade_error)?;
        Ok(())
    }
}
