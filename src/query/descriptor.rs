//! Query descriptor types
//!
//! The immutable snapshot of filter/sort/paging/projection intent that
//! drivers consume read-only. Produced by [`super::Query`]; every capture is
//! a deep, independent copy.

use serde::{Deserialize, Serialize};

use crate::schema::Value;

/// Comparison operators supported by where clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `BETWEEN`
    Between,
    /// `NOT BETWEEN`
    NotBetween,
    /// `LIKE` (regular-expression-shaped comparator)
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
}

impl Operator {
    /// The SQL fragment for this operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Right-hand side of a where clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Compare {
    /// One value (`=`, `!=`, `>`, `<`, `>=`, `<=`, `LIKE`, `NOT LIKE`)
    Single(Value),
    /// Inclusive bounds (`BETWEEN`, `NOT BETWEEN`)
    Range(Value, Value),
    /// Membership list (`IN`, `NOT IN`)
    List(Vec<Value>),
}

impl From<Value> for Compare {
    fn from(v: Value) -> Self {
        Compare::Single(v)
    }
}

impl From<Vec<Value>> for Compare {
    fn from(values: Vec<Value>) -> Self {
        Compare::List(values)
    }
}

impl From<(Value, Value)> for Compare {
    fn from((low, high): (Value, Value)) -> Self {
        Compare::Range(low, high)
    }
}

macro_rules! compare_from_scalar {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Compare {
            fn from(v: $ty) -> Self {
                Compare::Single(v.into())
            }
        })*
    };
}

compare_from_scalar!(&str, String, i64, i32, f64, bool, chrono::DateTime<chrono::Utc>);

/// One filter condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    /// Column to filter on
    pub column: String,
    /// Comparison operator
    pub operator: Operator,
    /// Right-hand side
    pub compare: Compare,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Column to sort on
    pub column: String,
    /// Ascending when true
    pub ascending: bool,
}

/// The immutable query snapshot consumed by storage drivers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// Filter conditions, combined with AND
    pub wheres: Vec<WhereClause>,
    /// Sort keys, applied in order
    pub order: Vec<OrderBy>,
    /// Projected column names; empty means all columns
    pub columns: Vec<String>,
    /// Maximum number of rows to return
    pub take: Option<usize>,
    /// Number of rows to skip
    pub skip: Option<usize>,
}

impl QueryDescriptor {
    /// Whether this descriptor constrains the affected row set
    pub fn is_constrained(&self) -> bool {
        !self.wheres.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_sql_fragments() {
        assert_eq!(Operator::Eq.as_sql(), "=");
        assert_eq!(Operator::Ne.as_sql(), "!=");
        assert_eq!(Operator::NotBetween.as_sql(), "NOT BETWEEN");
        assert_eq!(Operator::NotIn.as_sql(), "NOT IN");
    }

    #[test]
    fn test_compare_conversions() {
        assert_eq!(Compare::from(5), Compare::Single(Value::Integer(5)));
        assert_eq!(
            Compare::from(vec![Value::Integer(1), Value::Integer(2)]),
            Compare::List(vec![Value::Integer(1), Value::Integer(2)])
        );
    }

    #[test]
    fn test_empty_descriptor_is_unconstrained() {
        let descriptor = QueryDescriptor::default();
        assert!(!descriptor.is_constrained());
    }
}
