//! Multiplexer sharing invariants
//!
//! Independently constructed handles for the same physical table observe the
//! same mutations, each shaped through its own row adapter, without
//! re-querying the backend.

use std::sync::Arc;

use tabledb::database::Database;
use tabledb::driver::MemoryDriver;
use tabledb::events::{ChangeEvent, EventRegistry};
use tabledb::query::{Operator, Query};
use tabledb::schema::{ColumnDef, ColumnType, Row, StorageRow, TableSchema, Value};
use tabledb::table::FnAdapter;

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Person {
    id: Option<i64>,
    name: String,
    gender: Option<String>,
}

fn people_schema() -> TableSchema {
    TableSchema::new()
        .column(
            "id",
            ColumnDef::new(ColumnType::Integer)
                .primary_key()
                .auto_increment(),
        )
        .column("name", ColumnDef::new(ColumnType::Text).not_null())
        .column(
            "gender",
            ColumnDef::new(ColumnType::Text).options(["F", "M", "O"]),
        )
}

fn person_adapter() -> FnAdapter<
    Person,
    impl Fn(Row) -> tabledb::DbResult<Person> + Send + Sync,
    impl Fn(&Person) -> tabledb::DbResult<Row> + Send + Sync,
> {
    FnAdapter::new(
        |row: Row| {
            Ok(Person {
                id: row.get("id").and_then(Value::as_integer),
                name: row
                    .get("name")
                    .and_then(Value::as_text)
                    .unwrap_or_default()
                    .to_string(),
                gender: row
                    .get("gender")
                    .and_then(Value::as_text)
                    .map(str::to_string),
            })
        },
        |p: &Person| {
            let mut row = Row::new();
            row.insert("name".into(), Value::Text(p.name.clone()));
            if let Some(gender) = &p.gender {
                row.insert("gender".into(), Value::Text(gender.clone()));
            }
            Ok(row)
        },
    )
}

fn ana() -> Row {
    let mut row = Row::new();
    row.insert("name".into(), Value::Text("Ana".into()));
    row.insert("gender".into(), Value::Text("F".into()));
    row
}

// =============================================================================
// Multiplexer Sharing
// =============================================================================

/// Two independently constructed handles each observe exactly one insert.
#[tokio::test]
async fn test_independent_handles_share_one_hub() {
    let events = Arc::new(EventRegistry::new());
    let driver = Arc::new(MemoryDriver::new());

    let db1 = Database::open("app", driver.clone(), events.clone())
        .await
        .unwrap();
    let db2 = Database::open("app", driver, events.clone()).await.unwrap();

    let table1 = db1.table("people", people_schema()).unwrap();
    let table2 = db2.table("people", people_schema()).unwrap();

    let mut rx1 = table1.changes();
    let mut rx2 = table2.changes();

    table1.insert(&ana()).await.unwrap();

    // Both handles observe the mutation
    let e1 = rx1.recv().await.unwrap();
    let e2 = rx2.recv().await.unwrap();
    for event in [&e1, &e2] {
        match event {
            ChangeEvent::Insert { rows } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0]["name"], Value::Text("Ana".into()));
            }
            other => panic!("expected insert event, got {:?}", other.kind()),
        }
    }

    // Exactly one event each
    assert!(rx1.try_recv().is_err());
    assert!(rx2.try_recv().is_err());

    // One hub for the physical table, not one per handle
    assert_eq!(events.len(), 1);
}

/// A rebound handle observes the same changes in its own row shape.
#[tokio::test]
async fn test_rebound_handle_shapes_events() {
    let events = Arc::new(EventRegistry::new());
    let db = Database::open("app", Arc::new(MemoryDriver::new()), events)
        .await
        .unwrap();

    let plain = db.table("people", people_schema()).unwrap();
    let typed = plain.with_adapter(person_adapter());

    let mut plain_rx = plain.changes();
    let mut typed_rx = typed.changes();

    let stored = typed
        .insert(&Person {
            id: None,
            name: "Ana".into(),
            gender: Some("F".into()),
        })
        .await
        .unwrap();
    assert!(stored.id.is_some());

    match plain_rx.recv().await.unwrap() {
        ChangeEvent::Insert { rows } => {
            assert_eq!(rows[0]["gender"], Value::Text("F".into()));
        }
        other => panic!("expected insert event, got {:?}", other.kind()),
    }
    match typed_rx.recv().await.unwrap() {
        ChangeEvent::Insert { rows } => {
            assert_eq!(rows[0].name, "Ana");
            assert_eq!(rows[0].gender.as_deref(), Some("F"));
        }
        other => panic!("expected insert event, got {:?}", other.kind()),
    }
}

/// Update events carry an accurate pre-image and post-image.
#[tokio::test]
async fn test_update_event_images() {
    let events = Arc::new(EventRegistry::new());
    let db = Database::open("app", Arc::new(MemoryDriver::new()), events)
        .await
        .unwrap();
    let people = db.table("people", people_schema()).unwrap();

    let mut rx = people.changes();

    let stored = people.insert(&ana()).await.unwrap();
    let id = stored["id"].as_integer().unwrap();
    assert_eq!(rx.recv().await.unwrap().kind(), tabledb::EventKind::Insert);

    let mut patch = Row::new();
    patch.insert("gender".into(), Value::Text("O".into()));
    let by_id = Query::new()
        .filter("id", Operator::Eq, Value::Integer(id))
        .descriptor();
    people.update(&patch, &by_id).await.unwrap();

    match rx.recv().await.unwrap() {
        ChangeEvent::Update { previous, current } => {
            assert_eq!(previous.len(), 1);
            assert_eq!(previous[0]["gender"], Value::Text("F".into()));
            assert_eq!(current.len(), 1);
            assert_eq!(current[0]["gender"], Value::Text("O".into()));
        }
        other => panic!("expected update event, got {:?}", other.kind()),
    }
}

/// A pump that falls behind the hub buffer skips the overflow and resumes
/// with the oldest retained event.
#[tokio::test]
async fn test_lagged_handle_resumes_with_retained_events() {
    let events = Arc::new(EventRegistry::with_capacity(2));
    let db = Database::open("app", Arc::new(MemoryDriver::new()), events)
        .await
        .unwrap();
    let people = db.table("people", people_schema()).unwrap();
    let mut rx = people.changes();

    // Flood the hub before the pump gets a chance to run
    for i in 0..5 {
        let mut row = StorageRow::new();
        row.insert("name".into(), Value::Text(format!("n{}", i)));
        people
            .engine()
            .hub()
            .publish(ChangeEvent::Insert { rows: vec![row] });
    }

    // Only the retained tail is delivered
    for expected in ["n3", "n4"] {
        match rx.recv().await.unwrap() {
            ChangeEvent::Insert { rows } => {
                assert_eq!(rows[0]["name"], Value::Text(expected.into()));
            }
            other => panic!("expected insert event, got {:?}", other.kind()),
        }
    }
    assert!(rx.try_recv().is_err());
}

/// A multi-row update's affected count matches its published images.
#[tokio::test]
async fn test_update_images_cover_every_affected_row() {
    let events = Arc::new(EventRegistry::new());
    let db = Database::open("app", Arc::new(MemoryDriver::new()), events)
        .await
        .unwrap();
    let people = db.table("people", people_schema()).unwrap();

    let mut rx = people.changes();
    for (name, gender) in [("Ana", "F"), ("Bruno", "M"), ("Carla", "F")] {
        let mut row = Row::new();
        row.insert("name".into(), Value::Text(name.into()));
        row.insert("gender".into(), Value::Text(gender.into()));
        people.insert(&row).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().kind(), tabledb::EventKind::Insert);
    }

    let mut patch = Row::new();
    patch.insert("gender".into(), Value::Text("O".into()));
    let everyone = Query::new()
        .filter("id", Operator::Gt, Value::Integer(0))
        .descriptor();
    let affected = people.update(&patch, &everyone).await.unwrap();
    assert_eq!(affected, 3);

    match rx.recv().await.unwrap() {
        ChangeEvent::Update { previous, current } => {
            assert_eq!(previous.len() as u64, affected);
            assert_eq!(current.len() as u64, affected);
            assert!(current
                .iter()
                .all(|row| row["gender"] == Value::Text("O".into())));
        }
        other => panic!("expected update event, got {:?}", other.kind()),
    }
}

/// Delete events publish the rows as they were before the mutation.
#[tokio::test]
async fn test_delete_event_preimage() {
    let events = Arc::new(EventRegistry::new());
    let db = Database::open("app", Arc::new(MemoryDriver::new()), events)
        .await
        .unwrap();
    let people = db.table("people", people_schema()).unwrap();

    let mut rx = people.changes();
    people.insert(&ana()).await.unwrap();
    assert_eq!(rx.recv().await.unwrap().kind(), tabledb::EventKind::Insert);

    let by_name = Query::new()
        .filter("name", Operator::Eq, "Ana")
        .descriptor();
    people.delete(&by_name).await.unwrap();

    match rx.recv().await.unwrap() {
        ChangeEvent::Delete { rows } => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0]["name"], Value::Text("Ana".into()));
        }
        other => panic!("expected delete event, got {:?}", other.kind()),
    }
}
