//! Operation tests for Database over the in-memory engine

use dashdb_core::{
    report_line, Database, DatabaseConfig, Key, MemoryEngine, Message, Record, TxMode, Value,
    DELETE_ALL_DONE,
};
use futures::StreamExt;
use pretty_assertions::assert_eq;

/// Helper to create a database over a fresh engine
fn create_test_db() -> Database<MemoryEngine> {
    let _ = dashdb_core::logging::try_init("debug");
    Database::new(MemoryEngine::new(), DatabaseConfig::named("ops-test"))
}

async fn count_of(db: &Database<MemoryEngine>) -> usize {
    db.count().await.unwrap().value.as_count().unwrap()
}

#[tokio::test]
async fn test_put_and_get() {
    let db = create_test_db();

    let added = db.put(Record::new(1, "alpha")).await.unwrap();
    assert_eq!(added.message, Message::Added);
    assert_eq!(added.value, Value::Text("alpha".into()));
    assert_eq!(added.context.mode, Some(TxMode::ReadWrite));

    let found = db.get(1).await.unwrap();
    assert_eq!(found.message, Message::Found);
    assert_eq!(found.value, Value::Text("alpha".into()));
    assert_eq!(found.context.mode, Some(TxMode::ReadOnly));
}

#[tokio::test]
async fn test_put_overwrites_existing_key() {
    let db = create_test_db();

    db.put(Record::new(1, "old")).await.unwrap();
    db.put(Record::new(1, "new")).await.unwrap();

    let found = db.get(1).await.unwrap();
    assert_eq!(found.value.as_text(), Some("new"));
    assert_eq!(count_of(&db).await, 1);
}

#[tokio::test]
async fn test_get_nonexistent_echoes_key() {
    let db = create_test_db();

    let missing = db.get("ghost").await.unwrap();
    assert!(missing.is_not_found());
    assert_eq!(missing.message.to_string(), "Data not found.");
    assert_eq!(missing.value, Value::Key(Key::from("ghost")));
}

#[tokio::test]
async fn test_get_by_index_with_duplicates() {
    let db = create_test_db();

    db.put(Record::new(1, "shared")).await.unwrap();
    db.put(Record::new(2, "shared")).await.unwrap();
    db.put(Record::new(3, "other")).await.unwrap();

    let found = db.get_by_index("shared").await.unwrap();
    assert_eq!(found.message, Message::FoundByIndex);
    assert_eq!(found.value.as_text(), Some("shared"));
    assert_eq!(found.context.index.as_deref(), Some("value"));
}

#[tokio::test]
async fn test_get_by_index_not_found_echoes_input() {
    let db = create_test_db();
    db.put(Record::new(1, "a")).await.unwrap();

    let missing = db.get_by_index("zzz").await.unwrap();
    assert!(missing.is_not_found());
    assert_eq!(missing.value, Value::Text("zzz".into()));
}

#[tokio::test]
async fn test_count_empty_and_after_inserts() {
    let db = create_test_db();
    assert_eq!(count_of(&db).await, 0);

    for i in 0..7 {
        db.put(Record::new(i, format!("v{}", i))).await.unwrap();
    }

    let counted = db.count().await.unwrap();
    assert_eq!(counted.message, Message::Total);
    assert_eq!(counted.value, Value::Count(7));
}

#[tokio::test]
async fn test_read_all_one_line_per_record() {
    let db = create_test_db();
    db.put(Record::new(2, "two")).await.unwrap();
    db.put(Record::new(1, "one")).await.unwrap();
    db.put(Record::new("k", "kay")).await.unwrap();

    let all = db.read_all().await.unwrap();
    assert_eq!(all.message, Message::AllFound);

    let report = all.value.as_text().unwrap().to_string();
    assert_eq!(
        report,
        "Name for id 1 is one\nName for id 2 is two\nName for id k is kay\n"
    );
    assert_eq!(report.lines().count(), 3);
}

#[tokio::test]
async fn test_read_all_empty_store() {
    let db = create_test_db();
    let all = db.read_all().await.unwrap();
    assert_eq!(all.value, Value::Text(String::new()));
}

#[tokio::test]
async fn test_size_report_matches_read_all_length() {
    let db = create_test_db();
    db.put(Record::new(1, "alpha")).await.unwrap();
    db.put(Record::new(2, "beta")).await.unwrap();

    let size = db.size_report().await.unwrap();
    let all = db.read_all().await.unwrap();

    assert_eq!(size.message, Message::Size);
    let report = all.value.as_text().unwrap();
    assert_eq!(size.value, Value::Count(report.chars().count()));
    assert_eq!(
        size.value,
        Value::Count(
            report_line(&Record::new(1, "alpha")).len() + report_line(&Record::new(2, "beta")).len()
        )
    );
}

#[tokio::test]
async fn test_delete_existing_and_absent() {
    let db = create_test_db();
    db.put(Record::new(1, "a")).await.unwrap();

    let deleted = db.delete(1).await.unwrap();
    assert_eq!(deleted.message, Message::Deleted);
    assert_eq!(deleted.value, Value::Key(Key::Int(1)));
    assert!(db.get(1).await.unwrap().is_not_found());

    // Deleting again is still a success
    let again = db.delete(1).await.unwrap();
    assert_eq!(again.message, Message::Deleted);
    assert_eq!(again.value, Value::Key(Key::Int(1)));
}

#[tokio::test]
async fn test_delete_all_yields_n_plus_one() {
    let db = create_test_db();
    for i in 0..4 {
        db.put(Record::new(i, "x")).await.unwrap();
    }

    let outcomes: Vec<_> = db
        .delete_all()
        .map(|outcome| outcome.unwrap())
        .collect()
        .await;

    assert_eq!(outcomes.len(), 5);
    for (i, outcome) in outcomes[..4].iter().enumerate() {
        assert_eq!(outcome.message, Message::Deleted);
        assert_eq!(outcome.value, Value::Key(Key::Int(i as i64)));
    }
    let last = &outcomes[4];
    assert_eq!(last.message, Message::AllRemoved);
    assert_eq!(last.value, Value::Text(DELETE_ALL_DONE.into()));

    assert_eq!(count_of(&db).await, 0);
}

#[tokio::test]
async fn test_delete_all_on_empty_store() {
    let db = create_test_db();
    let outcomes: Vec<_> = db.delete_all().collect().await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        outcomes[0].as_ref().unwrap().message,
        Message::AllRemoved
    );
}

#[tokio::test]
async fn test_put_many_sequential_keys() {
    let db = create_test_db();

    let added = db.put_many(5).await.unwrap();
    assert_eq!(added.message, Message::AddedTestData(5));
    assert_eq!(added.message.to_string(), "Added 5 Test Data objects.");
    let last_value = added.value.as_text().unwrap().to_string();

    assert_eq!(count_of(&db).await, 5);
    for i in 0..5 {
        assert_eq!(db.get(i).await.unwrap().message, Message::Found);
    }
    assert!(db.get(5).await.unwrap().is_not_found());
    assert_eq!(db.get(4).await.unwrap().value.as_text(), Some(last_value.as_str()));
}

#[tokio::test]
async fn test_put_many_zero() {
    let db = create_test_db();
    let added = db.put_many(0).await.unwrap();
    assert_eq!(added.value, Value::Empty);
    assert_eq!(count_of(&db).await, 0);
}

#[tokio::test]
async fn test_connections_closed_after_each_operation() {
    let db = create_test_db();

    db.put(Record::new(1, "a")).await.unwrap();
    assert_eq!(db.engine().open_connections(), 0);
    db.get(1).await.unwrap();
    assert_eq!(db.engine().open_connections(), 0);
    db.read_all().await.unwrap();
    assert_eq!(db.engine().open_connections(), 0);
    let _: Vec<_> = db.delete_all().collect().await;
    assert_eq!(db.engine().open_connections(), 0);
}

#[tokio::test]
async fn test_records_shared_across_handles() {
    let engine = MemoryEngine::new();
    let writer = Database::new(engine.clone(), DatabaseConfig::named("shared"));
    let reader = Database::new(engine, DatabaseConfig::named("shared"));

    writer.put(Record::new(9, "nine")).await.unwrap();
    assert_eq!(reader.get(9).await.unwrap().value.as_text(), Some("nine"));
}

#[tokio::test]
async fn test_delete_database() {
    let engine = MemoryEngine::new();
    let db = Database::new(engine.clone(), DatabaseConfig::named("doomed"));
    db.put(Record::new(1, "a")).await.unwrap();
    assert_eq!(engine.version_of("doomed"), Some(1));

    let deleted = db.delete_database("doomed").await.unwrap();
    assert_eq!(deleted.message, Message::DatabaseDeleted);
    assert_eq!(deleted.value, Value::Text("doomed".into()));
    assert_eq!(engine.version_of("doomed"), None);

    // Next operation recreates an empty store
    assert_eq!(count_of(&db).await, 0);
}

#[tokio::test]
async fn test_scenario_shared_index_values() {
    let db = create_test_db();
    db.put(Record::new(1, "a")).await.unwrap();
    db.put(Record::new(2, "a")).await.unwrap();
    db.put(Record::new(3, "b")).await.unwrap();

    assert_eq!(count_of(&db).await, 3);
    assert_eq!(
        db.get_by_index("a").await.unwrap().value.as_text(),
        Some("a")
    );

    let missing = db.get_by_index("c").await.unwrap();
    assert!(missing.is_not_found());
    assert_eq!(missing.value.as_text(), Some("c"));

    let outcomes: Vec<_> = db.delete_all().collect().await;
    let messages: Vec<Message> = outcomes.iter().map(|o| o.as_ref().unwrap().message).collect();
    assert_eq!(
        messages,
        vec![
            Message::Deleted,
            Message::Deleted,
            Message::Deleted,
            Message::AllRemoved
        ]
    );
    assert_eq!(count_of(&db).await, 0);
}
