//! Storage driver contract
//!
//! The capability set any backend must provide. Drivers operate only on
//! already-wire-coerced rows and read-only query descriptors; type coercion,
//! validation, and event fan-out all happen above this boundary.

mod memory;

pub use memory::{MemoryDriver, ROW_ID};

use async_trait::async_trait;

use crate::errors::DbResult;
use crate::query::QueryDescriptor;
use crate::schema::{StorageRow, TableSchema};

/// A pluggable storage backend.
///
/// Contract obligations:
/// - `create_table` is idempotent and additive: repeated calls converge to a
///   table containing the union of all previously and newly declared
///   columns, never dropping data.
/// - `insert` returns the row as actually persisted, including generated
///   keys and the implicit row-identity column.
/// - `update` and `delete` must reject an unconstrained descriptor (no where
///   clauses) rather than silently mutating every row, and must reject a
///   descriptor carrying `take`/`skip`: mutations address the full filter
///   match, never a page of it.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Bind this driver to a logical database
    async fn connect(&self, database: &str) -> DbResult<()>;

    /// Release the binding; subsequent operations fail with `Disconnected`
    async fn disconnect(&self) -> DbResult<()>;

    /// Create or additively reconcile a table
    async fn create_table(&self, table: &str, schema: &TableSchema) -> DbResult<()>;

    /// Drop a table
    async fn delete_table(&self, table: &str) -> DbResult<()>;

    /// Destroy every table in the bound database
    async fn delete_database(&self) -> DbResult<()>;

    /// Select every row matching the descriptor
    async fn select_all(
        &self,
        table: &str,
        descriptor: Option<&QueryDescriptor>,
    ) -> DbResult<Vec<StorageRow>>;

    /// Select a single matching row, or `None`
    async fn select_one(
        &self,
        table: &str,
        descriptor: Option<&QueryDescriptor>,
    ) -> DbResult<Option<StorageRow>>;

    /// Select the first matching row under the descriptor's ordering
    async fn select_first(
        &self,
        table: &str,
        descriptor: Option<&QueryDescriptor>,
    ) -> DbResult<Option<StorageRow>>;

    /// Select the last matching row under the descriptor's ordering
    async fn select_last(
        &self,
        table: &str,
        descriptor: Option<&QueryDescriptor>,
    ) -> DbResult<Option<StorageRow>>;

    /// Persist one row, returning it as stored (with generated keys)
    async fn insert(&self, table: &str, row: StorageRow) -> DbResult<StorageRow>;

    /// Apply a partial row to every matching row; returns the affected count
    async fn update(
        &self,
        table: &str,
        row: StorageRow,
        descriptor: &QueryDescriptor,
    ) -> DbResult<u64>;

    /// Delete every matching row; returns the affected count
    async fn delete(&self, table: &str, descriptor: &QueryDescriptor) -> DbResult<u64>;

    /// Count matching rows
    async fn length(&self, table: &str, descriptor: Option<&QueryDescriptor>) -> DbResult<u64>;
}
