//! Schema subsystem
//!
//! The column type system and per-table column metadata. Everything here is
//! passive data consumed by the serialization pipeline and the drivers.

mod column;
mod types;

pub use column::{CheckFn, ColumnDef, DefaultValue, GeneratorFn, TableSchema};
pub use types::{ColumnType, Value};

use std::collections::HashMap;

/// One record in application-level value types, keyed by column name
pub type Row = HashMap<String, Value>;

/// The wire-safe encoding of a [`Row`] exchanged with storage drivers.
///
/// Identical shape, with DATETIME values encoded as integer
/// epoch-milliseconds. This is the only representation a driver ever sees.
pub type StorageRow = HashMap<String, Value>;
