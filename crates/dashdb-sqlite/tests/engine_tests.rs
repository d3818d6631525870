//! Database tests over the SQLite engine

use dashdb_core::{
    Connection, Database, DatabaseConfig, DbError, Engine, Message, Record, Schema, Transaction,
    TxMode, Value, DELETE_ALL_DONE,
};
use dashdb_sqlite::{schema::user_version, SqliteEngine};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Helper to create a database in a fresh temp directory
fn create_test_db() -> (TempDir, Database<SqliteEngine>) {
    let _ = dashdb_core::logging::try_init("debug");
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(SqliteEngine::new(dir.path()), DatabaseConfig::named("sqlite-test"));
    (dir, db)
}

#[tokio::test]
async fn test_put_get_delete() {
    let (_dir, db) = create_test_db();

    db.put(Record::new(1, "alpha")).await.unwrap();
    db.put(Record::new("b", "beta")).await.unwrap();

    let found = db.get(1).await.unwrap();
    assert_eq!(found.message, Message::Found);
    assert_eq!(found.value.as_text(), Some("alpha"));

    let found = db.get("b").await.unwrap();
    assert_eq!(found.value.as_text(), Some("beta"));

    let deleted = db.delete(1).await.unwrap();
    assert_eq!(deleted.message, Message::Deleted);
    assert!(db.get(1).await.unwrap().is_not_found());
}

#[tokio::test]
async fn test_integer_and_text_keys_stay_distinct() {
    let (_dir, db) = create_test_db();

    db.put(Record::new(1, "number")).await.unwrap();
    db.put(Record::new("1", "text")).await.unwrap();

    assert_eq!(db.get(1).await.unwrap().value.as_text(), Some("number"));
    assert_eq!(db.get("1").await.unwrap().value.as_text(), Some("text"));

    // Integers sort before text
    let report = db.read_all().await.unwrap();
    assert_eq!(
        report.value.as_text(),
        Some("Name for id 1 is number\nName for id 1 is text\n")
    );
}

#[tokio::test]
async fn test_get_by_index() {
    let (_dir, db) = create_test_db();

    db.put(Record::new(2, "shared")).await.unwrap();
    db.put(Record::new(1, "shared")).await.unwrap();

    let found = db.get_by_index("shared").await.unwrap();
    assert_eq!(found.message, Message::FoundByIndex);
    assert_eq!(found.value.as_text(), Some("shared"));

    let missing = db.get_by_index("nothing").await.unwrap();
    assert!(missing.is_not_found());
    assert_eq!(missing.value, Value::Text("nothing".into()));
}

#[tokio::test]
async fn test_count_size_and_read_all() {
    let (_dir, db) = create_test_db();

    db.put(Record::new(2, "b")).await.unwrap();
    db.put(Record::new(1, "a")).await.unwrap();

    assert_eq!(db.count().await.unwrap().value.as_count(), Some(2));

    let all = db.read_all().await.unwrap();
    let expected = "Name for id 1 is a\nName for id 2 is b\n";
    assert_eq!(all.value.as_text(), Some(expected));

    let size = db.size_report().await.unwrap();
    assert_eq!(size.value.as_count(), Some(expected.chars().count()));
}

#[tokio::test]
async fn test_put_many_then_delete_all() {
    let (_dir, db) = create_test_db();

    let added = db.put_many(5).await.unwrap();
    assert_eq!(added.message, Message::AddedTestData(5));
    assert_eq!(db.count().await.unwrap().value.as_count(), Some(5));

    let outcomes: Vec<_> = db.delete_all().collect().await;
    assert_eq!(outcomes.len(), 6);

    let (last, deletes) = outcomes.split_last().unwrap();
    for outcome in deletes {
        assert_eq!(outcome.as_ref().unwrap().message, Message::Deleted);
    }
    let last = last.as_ref().unwrap();
    assert_eq!(last.message, Message::AllRemoved);
    assert_eq!(last.value.as_text(), Some(DELETE_ALL_DONE));

    assert_eq!(db.count().await.unwrap().value.as_count(), Some(0));
}

#[tokio::test]
async fn test_records_persist_across_engines() {
    let (dir, db) = create_test_db();
    db.put(Record::new(7, "kept")).await.unwrap();
    drop(db);

    let reopened = Database::new(SqliteEngine::new(dir.path()), DatabaseConfig::named("sqlite-test"));
    let found = reopened.get(7).await.unwrap();
    assert_eq!(found.value.as_text(), Some("kept"));
}

#[tokio::test]
async fn test_open_records_user_version() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SqliteEngine::new(dir.path());

    let opened = engine.open("versioned", 3, &Schema::default()).await.unwrap();
    assert!(opened.created);
    opened.connection.close();

    let conn = rusqlite::Connection::open(engine.path_for("versioned").unwrap()).unwrap();
    assert_eq!(user_version(&conn).unwrap(), 3);

    // Same version again runs no upgrade
    let opened = engine.open("versioned", 3, &Schema::default()).await.unwrap();
    assert!(!opened.created);
}

#[tokio::test]
async fn test_open_older_version_fails() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SqliteEngine::new(dir.path());
    engine.open("versioned", 2, &Schema::default()).await.unwrap();

    let result = engine.open("versioned", 1, &Schema::default()).await;
    assert!(matches!(
        result,
        Err(DbError::VersionMismatch {
            existing: 2,
            requested: 1,
            ..
        })
    ));
}

#[tokio::test]
async fn test_read_only_transaction_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SqliteEngine::new(dir.path());
    let opened = engine.open("ro", 1, &Schema::default()).await.unwrap();

    let tx = opened
        .connection
        .transaction("dashStore", TxMode::ReadOnly)
        .unwrap();
    let result = tx.put(&Record::new(1, "x")).await;
    assert!(matches!(result, Err(DbError::ReadOnly(_))));
    tx.abort();
}

#[tokio::test]
async fn test_abort_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SqliteEngine::new(dir.path());
    let opened = engine.open("rollback", 1, &Schema::default()).await.unwrap();

    let tx = opened
        .connection
        .transaction("dashStore", TxMode::ReadWrite)
        .unwrap();
    tx.put(&Record::new(1, "gone")).await.unwrap();
    tx.abort();

    let tx = opened
        .connection
        .transaction("dashStore", TxMode::ReadOnly)
        .unwrap();
    assert!(tx.get(&1.into()).await.unwrap().is_none());
    tx.complete().await.unwrap();

    // A finished transaction refuses further requests
    assert!(matches!(
        tx.get(&1.into()).await,
        Err(DbError::Transaction(_))
    ));
}

#[tokio::test]
async fn test_unknown_store_fails_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SqliteEngine::new(dir.path());
    let opened = engine.open("stores", 1, &Schema::default()).await.unwrap();

    let result = opened.connection.transaction("elsewhere", TxMode::ReadOnly);
    assert!(matches!(result, Err(DbError::Transaction(_))));
}

#[tokio::test]
async fn test_delete_database_removes_file() {
    let (dir, db) = create_test_db();
    db.put(Record::new(1, "a")).await.unwrap();

    let path = db.engine().path_for("sqlite-test").unwrap();
    assert!(path.exists());

    let outcome = db.delete_database("sqlite-test").await.unwrap();
    assert_eq!(outcome.message, Message::DatabaseDeleted);
    assert!(!path.exists());

    // Deleting again is not an error
    db.delete_database("sqlite-test").await.unwrap();
    drop(dir);
}

#[tokio::test]
async fn test_missing_directory_is_not_supported() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SqliteEngine::new(dir.path().join("absent"));
    let db = Database::new(engine, DatabaseConfig::default());

    let outcome = db.put(Record::new(1, "a")).await.unwrap();
    assert!(outcome.is_not_supported());

    let outcomes: Vec<_> = db.delete_all().collect().await;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].as_ref().unwrap().is_not_supported());
}

#[test]
fn test_create_makes_directory() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SqliteEngine::create(dir.path().join("nested/dbs")).unwrap();
    assert!(engine.is_available());
}

#[test]
fn test_path_for_rejects_separators() {
    let engine = SqliteEngine::new("/tmp");
    assert!(engine.path_for("a/b").is_err());
    assert!(engine.path_for("").is_err());
    assert!(engine
        .path_for("dashDb")
        .unwrap()
        .ends_with("dashDb.sqlite3"));
}
