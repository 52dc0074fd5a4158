//! Query builder
//!
//! A mutable accumulator of filter/sort/paging/projection state. Calling
//! [`Query::descriptor`] captures a structurally independent snapshot;
//! mutating the builder afterwards never retroactively affects a descriptor
//! already handed to a driver.

use super::descriptor::{Compare, Operator, OrderBy, QueryDescriptor, WhereClause};

/// Accumulates query state for a table operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    state: QueryDescriptor,
}

impl Query {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition (conditions are combined with AND)
    pub fn filter(
        mut self,
        column: impl Into<String>,
        operator: Operator,
        compare: impl Into<Compare>,
    ) -> Self {
        self.state.wheres.push(WhereClause {
            column: column.into(),
            operator,
            compare: compare.into(),
        });
        self
    }

    /// Add a sort key
    pub fn sort(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.state.order.push(OrderBy {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Limit the number of returned rows
    pub fn take(mut self, n: usize) -> Self {
        self.state.take = Some(n);
        self
    }

    /// Skip the first `n` rows
    pub fn skip(mut self, n: usize) -> Self {
        self.state.skip = Some(n);
        self
    }

    /// Project a set of columns
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Concatenate another builder's wheres, order, and columns into this one.
    ///
    /// Used when a derived handle must inherit an in-flight query; paging is
    /// deliberately not merged.
    pub fn merge(mut self, other: &Query) -> Self {
        self.state.wheres.extend(other.state.wheres.iter().cloned());
        self.state.order.extend(other.state.order.iter().cloned());
        self.state
            .columns
            .extend(other.state.columns.iter().cloned());
        self
    }

    /// Capture a deep, independent snapshot of the accumulated state
    pub fn descriptor(&self) -> QueryDescriptor {
        self.state.clone()
    }
}

impl From<Query> for QueryDescriptor {
    fn from(query: Query) -> Self {
        query.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Value;

    #[test]
    fn test_builder_accumulates() {
        let query = Query::new()
            .filter("id", Operator::Gt, 5)
            .sort("name", true)
            .take(10)
            .skip(2)
            .select(["id", "name"]);

        let d = query.descriptor();
        assert_eq!(d.wheres.len(), 1);
        assert_eq!(d.wheres[0].operator, Operator::Gt);
        assert_eq!(d.order.len(), 1);
        assert_eq!(d.take, Some(10));
        assert_eq!(d.skip, Some(2));
        assert_eq!(d.columns, vec!["id".to_string(), "name".to_string()]);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let query = Query::new().filter("id", Operator::Eq, 1);
        let snapshot = query.descriptor();

        let query = query.filter("name", Operator::Eq, "Ana");
        assert_eq!(snapshot.wheres.len(), 1);
        assert_eq!(query.descriptor().wheres.len(), 2);
    }

    #[test]
    fn test_merge_concatenates() {
        let base = Query::new()
            .filter("id", Operator::Gt, 0)
            .sort("id", true)
            .take(3);
        let other = Query::new()
            .filter("name", Operator::Like, "^A")
            .sort("name", false)
            .select(["name"])
            .take(99);

        let merged = base.merge(&other).descriptor();
        assert_eq!(merged.wheres.len(), 2);
        assert_eq!(merged.order.len(), 2);
        assert_eq!(merged.columns, vec!["name".to_string()]);
        // paging is not merged
        assert_eq!(merged.take, Some(3));
    }

    #[test]
    fn test_between_and_in_compare() {
        let query = Query::new()
            .filter(
                "age",
                Operator::Between,
                (Value::Integer(18), Value::Integer(65)),
            )
            .filter(
                "gender",
                Operator::In,
                vec![Value::Text("F".into()), Value::Text("O".into())],
            );

        let d = query.descriptor();
        assert!(matches!(d.wheres[0].compare, Compare::Range(_, _)));
        assert!(matches!(d.wheres[1].compare, Compare::List(_)));
    }
}
