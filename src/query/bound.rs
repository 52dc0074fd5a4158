//! Bound queries
//!
//! A query builder closed over a table handle. Accumulator methods mirror
//! [`Query`]; terminal operations capture the descriptor and delegate to the
//! handle.

use crate::errors::DbResult;
use crate::schema::Row;
use crate::table::TableHandle;

use super::builder::Query;
use super::descriptor::{Compare, Operator, QueryDescriptor};

/// A query builder bound to one table handle
#[derive(Debug)]
pub struct TableQuery<'a, T>
where
    T: Clone + Send + 'static,
{
    handle: &'a TableHandle<T>,
    query: Query,
}

impl<'a, T> TableQuery<'a, T>
where
    T: Clone + Send + 'static,
{
    /// Start an empty bound query
    pub(crate) fn new(handle: &'a TableHandle<T>) -> Self {
        Self {
            handle,
            query: Query::new(),
        }
    }

    /// Add a filter condition
    pub fn filter(
        mut self,
        column: impl Into<String>,
        operator: Operator,
        compare: impl Into<Compare>,
    ) -> Self {
        self.query = self.query.filter(column, operator, compare);
        self
    }

    /// Add a sort key
    pub fn sort(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.query = self.query.sort(column, ascending);
        self
    }

    /// Limit the number of returned rows
    pub fn take(mut self, n: usize) -> Self {
        self.query = self.query.take(n);
        self
    }

    /// Skip the first `n` rows
    pub fn skip(mut self, n: usize) -> Self {
        self.query = self.query.skip(n);
        self
    }

    /// Project a set of columns
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query = self.query.select(columns);
        self
    }

    /// Inherit another builder's wheres, order, and columns
    pub fn merge(mut self, other: &Query) -> Self {
        self.query = self.query.merge(other);
        self
    }

    /// Capture the current descriptor snapshot
    pub fn descriptor(&self) -> QueryDescriptor {
        self.query.descriptor()
    }

    /// Fetch every matching row
    pub async fn get(self) -> DbResult<Vec<T>> {
        let descriptor = self.query.descriptor();
        self.handle.select_all(Some(&descriptor)).await
    }

    /// Fetch the first matching row
    pub async fn first(self) -> DbResult<Option<T>> {
        let descriptor = self.query.descriptor();
        self.handle.select_first(Some(&descriptor)).await
    }

    /// Fetch the last matching row
    pub async fn last(self) -> DbResult<Option<T>> {
        let descriptor = self.query.descriptor();
        self.handle.select_last(Some(&descriptor)).await
    }

    /// Fetch a single matching row
    pub async fn one(self) -> DbResult<Option<T>> {
        let descriptor = self.query.descriptor();
        self.handle.select_one(Some(&descriptor)).await
    }

    /// Count matching rows
    pub async fn count(self) -> DbResult<u64> {
        let descriptor = self.query.descriptor();
        self.handle.length(Some(&descriptor)).await
    }

    /// Whether any row matches
    pub async fn exists(self) -> DbResult<bool> {
        let descriptor = self.query.descriptor();
        self.handle.exists(&descriptor).await
    }

    /// Apply a partial row to every matching row
    pub async fn update(self, row: &Row) -> DbResult<u64> {
        let descriptor = self.query.descriptor();
        self.handle.update(row, &descriptor).await
    }

    /// Delete every matching row
    pub async fn delete(self) -> DbResult<u64> {
        let descriptor = self.query.descriptor();
        self.handle.delete(&descriptor).await
    }
}
