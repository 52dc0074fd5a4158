//! # tabledb
//!
//! A storage-agnostic, schema-driven table/row data-access layer.
//!
//! Callers declare a table's columns once and receive write-path validation,
//! read-path reconstruction, and a shared stream of insert/update/delete
//! notifications, independent of which backend executes the actual reads and
//! writes. Backends plug in through [`driver::StorageDriver`]; the crate
//! ships an in-memory reference driver.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tabledb::database::Database;
//! use tabledb::driver::MemoryDriver;
//! use tabledb::events::EventRegistry;
//! use tabledb::query::Operator;
//! use tabledb::schema::{ColumnDef, ColumnType, Row, TableSchema, Value};
//!
//! # async fn demo() -> tabledb::errors::DbResult<()> {
//! let events = Arc::new(EventRegistry::new());
//! let db = Database::open("app", Arc::new(MemoryDriver::new()), events).await?;
//!
//! let people = db.table(
//!     "people",
//!     TableSchema::new()
//!         .column("id", ColumnDef::new(ColumnType::Integer).primary_key().auto_increment())
//!         .column("name", ColumnDef::new(ColumnType::Text).not_null()),
//! )?;
//!
//! let mut row = Row::new();
//! row.insert("name".into(), Value::Text("Ana".into()));
//! let stored = people.insert(&row).await?;
//!
//! let found = people
//!     .query()
//!     .filter("name", Operator::Eq, "Ana")
//!     .first()
//!     .await?;
//! # let _ = (stored, found);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod database;
pub mod driver;
pub mod errors;
pub mod events;
pub mod observability;
pub mod query;
pub mod schema;
pub mod table;

pub use codec::ReadPolicy;
pub use config::DatabaseConfig;
pub use database::Database;
pub use driver::{MemoryDriver, StorageDriver};
pub use errors::{DbError, DbResult};
pub use events::{ChangeEvent, EventKind, EventRegistry};
pub use query::{Operator, Query, QueryDescriptor};
pub use schema::{ColumnDef, ColumnType, Row, StorageRow, TableSchema, Value};
pub use table::{FnAdapter, IdentityAdapter, RowAdapter, TableHandle};
