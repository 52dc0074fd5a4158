//! End-to-end table engine scenario
//!
//! Declares a column set, then drives insert/update/select/delete/length
//! through a database registry backed by the in-memory driver.

use std::sync::Arc;

use tabledb::database::Database;
use tabledb::driver::MemoryDriver;
use tabledb::events::EventRegistry;
use tabledb::query::{Operator, Query};
use tabledb::schema::{ColumnDef, ColumnType, Row, TableSchema, Value};

// =============================================================================
// Helper Functions
// =============================================================================

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

async fn open_db() -> Database {
    let events = Arc::new(EventRegistry::new());
    Database::open("app", Arc::new(MemoryDriver::new()), events)
        .await
        .unwrap()
}

fn person(name: &str, gender: &str) -> Row {
    let mut row = Row::new();
    row.insert("name".into(), Value::Text(name.into()));
    row.insert("gender".into(), Value::Text(gender.into()));
    row
}

// =============================================================================
// Scenario
// =============================================================================

/// Insert generates a key; update, select, and delete address it.
#[tokio::test]
async fn test_full_crud_scenario() {
    let db = open_db().await;
    let people = db.table("people", people_schema()).unwrap();
    people.ready().await.unwrap();

    // Insert: result carries the generated id
    let stored = people.insert(&person("Ana", "F")).await.unwrap();
    let id = stored["id"].as_integer().expect("generated id");
    assert_eq!(stored["name"], Value::Text("Ana".into()));
    assert_eq!(stored["gender"], Value::Text("F".into()));

    // Update by the generated id
    let mut patch = Row::new();
    patch.insert("gender".into(), Value::Text("O".into()));
    let by_id = Query::new().filter("id", Operator::Eq, Value::Integer(id));
    let affected = people.update(&patch, &by_id.descriptor()).await.unwrap();
    assert_eq!(affected, 1);

    let found = people
        .select_one(Some(&by_id.descriptor()))
        .await
        .unwrap()
        .expect("row still present");
    assert_eq!(found["gender"], Value::Text("O".into()));
    assert_eq!(found["name"], Value::Text("Ana".into()));

    // Delete decreases length by exactly one and exists turns false
    let before = people.length(None).await.unwrap();
    assert_eq!(people.delete(&by_id.descriptor()).await.unwrap(), 1);
    assert_eq!(people.length(None).await.unwrap(), before - 1);
    assert!(!people.exists(&by_id.descriptor()).await.unwrap());
}

/// Terminal operations on the bound builder delegate to the handle.
#[tokio::test]
async fn test_bound_query_terminals() {
    let db = open_db().await;
    let people = db.table("people", people_schema()).unwrap();

    for (name, gender) in [("Ana", "F"), ("Bruno", "M"), ("Carla", "F")] {
        people.insert(&person(name, gender)).await.unwrap();
    }

    let women = people
        .query()
        .filter("gender", Operator::Eq, "F")
        .sort("name", true)
        .get()
        .await
        .unwrap();
    assert_eq!(women.len(), 2);
    assert_eq!(women[0]["name"], Value::Text("Ana".into()));

    let last = people
        .query()
        .filter("gender", Operator::Eq, "F")
        .sort("name", true)
        .last()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last["name"], Value::Text("Carla".into()));

    assert_eq!(people.query().count().await.unwrap(), 3);
    assert!(people
        .query()
        .filter("name", Operator::Like, "^B")
        .exists()
        .await
        .unwrap());

    let mut patch = Row::new();
    patch.insert("gender".into(), Value::Text("O".into()));
    let affected = people
        .query()
        .filter("name", Operator::Eq, "Bruno")
        .update(&patch)
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let deleted = people
        .query()
        .filter("gender", Operator::Eq, "O")
        .delete()
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(people.query().count().await.unwrap(), 2);
}

/// A batch insert fails per row, not as a whole.
#[tokio::test]
async fn test_insert_many_partial_failure() {
    let db = open_db().await;
    let people = db.table("people", people_schema()).unwrap();

    let mut nameless = Row::new();
    nameless.insert("gender".into(), Value::Text("M".into()));

    let results = people
        .insert_many(&[person("Ana", "F"), nameless, person("Carla", "F")])
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert_eq!(
        results[1].as_ref().unwrap_err().code(),
        "DB_VALIDATION_FAILED"
    );
    assert!(results[2].is_ok());
    assert_eq!(people.length(None).await.unwrap(), 2);
}

/// Validation failures carry the offending column.
#[tokio::test]
async fn test_write_validation_errors() {
    let db = open_db().await;
    let people = db.table("people", people_schema()).unwrap();

    let err = people.insert(&person("Ana", "X")).await.unwrap_err();
    assert!(matches!(
        err,
        tabledb::DbError::Validation { ref column, .. } if column == "gender"
    ));

    let err = people.insert(&Row::new()).await.unwrap_err();
    assert!(matches!(
        err,
        tabledb::DbError::Validation { ref column, .. } if column == "name"
    ));
}

/// Mutations address the full filter match; a paged descriptor is rejected
/// instead of mutating more rows than the page it describes.
#[tokio::test]
async fn test_paged_mutation_rejected() {
    let db = open_db().await;
    let people = db.table("people", people_schema()).unwrap();
    for (name, gender) in [("Ana", "F"), ("Bruno", "M"), ("Carla", "F")] {
        people.insert(&person(name, gender)).await.unwrap();
    }

    let mut patch = Row::new();
    patch.insert("gender".into(), Value::Text("O".into()));

    let err = people
        .query()
        .filter("id", Operator::Gt, 0)
        .take(1)
        .update(&patch)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DB_INVALID_ARGUMENT");

    let err = people
        .query()
        .filter("id", Operator::Gt, 0)
        .skip(1)
        .delete()
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DB_INVALID_ARGUMENT");

    // Nothing was mutated
    let touched = Query::new()
        .filter("gender", Operator::Eq, "O")
        .descriptor();
    assert!(!people.exists(&touched).await.unwrap());
    assert_eq!(people.length(None).await.unwrap(), 3);
}

/// Unconstrained mutations are rejected before reaching the driver.
#[tokio::test]
async fn test_unconstrained_mutation_rejected() {
    let db = open_db().await;
    let people = db.table("people", people_schema()).unwrap();
    people.insert(&person("Ana", "F")).await.unwrap();

    let empty = Query::new().descriptor();
    let mut patch = Row::new();
    patch.insert("gender".into(), Value::Text("O".into()));

    assert_eq!(
        people.update(&patch, &empty).await.unwrap_err().code(),
        "DB_INVALID_ARGUMENT"
    );
    assert_eq!(
        people.delete(&empty).await.unwrap_err().code(),
        "DB_INVALID_ARGUMENT"
    );
    assert_eq!(people.length(None).await.unwrap(), 1);
}
