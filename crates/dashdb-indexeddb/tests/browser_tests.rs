//! Database tests over a real IndexedDB (run with `wasm-pack test --headless --chrome`)

#![cfg(target_arch = "wasm32")]

use dashdb_core::{Database, DatabaseConfig, DbError, Message, Record, Value};
use dashdb_indexeddb::IndexedDbEngine;
use futures::StreamExt;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

/// Helper to create a database under a test-specific name, starting empty
async fn create_test_db(name: &str) -> Database<IndexedDbEngine> {
    let db = Database::new(IndexedDbEngine::new(), DatabaseConfig::named(name));
    db.delete_database(name).await.unwrap();
    db
}

#[wasm_bindgen_test]
async fn test_put_and_get() {
    let db = create_test_db("idb-put-get").await;

    db.put(Record::new(1, "alpha")).await.unwrap();

    let found = db.get(1).await.unwrap();
    assert_eq!(found.message, Message::Found);
    assert_eq!(found.value.as_text(), Some("alpha"));

    assert!(db.get(2).await.unwrap().is_not_found());
}

#[wasm_bindgen_test]
async fn test_get_by_index() {
    let db = create_test_db("idb-index").await;

    db.put(Record::new(1, "shared")).await.unwrap();
    db.put(Record::new("b", "other")).await.unwrap();

    let found = db.get_by_index("other").await.unwrap();
    assert_eq!(found.message, Message::FoundByIndex);

    let missing = db.get_by_index("none").await.unwrap();
    assert_eq!(missing.value, Value::Text("none".into()));
}

#[wasm_bindgen_test]
async fn test_read_all_in_key_order() {
    let db = create_test_db("idb-read-all").await;

    db.put(Record::new("b", "text")).await.unwrap();
    db.put(Record::new(2, "two")).await.unwrap();
    db.put(Record::new(1, "one")).await.unwrap();

    let all = db.read_all().await.unwrap();
    assert_eq!(
        all.value.as_text(),
        Some("Name for id 1 is one\nName for id 2 is two\nName for id b is text\n")
    );
    assert_eq!(db.count().await.unwrap().value.as_count(), Some(3));
}

#[wasm_bindgen_test]
async fn test_put_many_and_delete_all() {
    let db = create_test_db("idb-delete-all").await;

    db.put_many(4).await.unwrap();
    let outcomes: Vec<_> = db.delete_all().collect().await;

    assert_eq!(outcomes.len(), 5);
    assert_eq!(
        outcomes.last().unwrap().as_ref().unwrap().message,
        Message::AllRemoved
    );
    assert_eq!(db.count().await.unwrap().value.as_count(), Some(0));
}

#[wasm_bindgen_test]
async fn test_delete_database() {
    let db = create_test_db("idb-drop").await;
    db.put(Record::new(1, "a")).await.unwrap();

    let outcome = db.delete_database("idb-drop").await.unwrap();
    assert_eq!(outcome.message, Message::DatabaseDeleted);

    // Reopening recreates an empty store
    assert_eq!(db.count().await.unwrap().value.as_count(), Some(0));
}

#[wasm_bindgen_test]
async fn test_unsafe_integer_key_rejected() {
    let db = create_test_db("idb-unsafe-key").await;
    let edge: i64 = 9_007_199_254_740_991;

    db.put(Record::new(edge, "edge")).await.unwrap();
    let err = db.put(Record::new(edge + 1, "past")).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidRecord(_)));
    assert!(matches!(db.get(edge + 1).await, Err(DbError::InvalidRecord(_))));
    assert!(matches!(db.delete(edge + 1).await, Err(DbError::InvalidRecord(_))));

    // The neighbouring key was not overwritten
    assert_eq!(db.get(edge).await.unwrap().value.as_text(), Some("edge"));
    assert_eq!(db.count().await.unwrap().value.as_count(), Some(1));
}
