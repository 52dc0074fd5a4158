//! Row-shape adapters
//!
//! An adapter marshals rows into and out of an application-defined type.
//! Rebinding a handle to a different adapter replaces the source system's
//! prototype-cloning approach with an explicit interface.

use crate::errors::DbResult;
use crate::schema::Row;

/// Marshals between plain rows and an application row type
pub trait RowAdapter<T>: Send + Sync {
    /// Reconstruct an application value from a plain row
    fn from_row(&self, row: Row) -> DbResult<T>;

    /// Flatten an application value back to a plain row
    fn to_row(&self, value: &T) -> DbResult<Row>;
}

/// The default adapter: rows pass through unchanged
pub struct IdentityAdapter;

impl RowAdapter<Row> for IdentityAdapter {
    fn from_row(&self, row: Row) -> DbResult<Row> {
        Ok(row)
    }

    fn to_row(&self, value: &Row) -> DbResult<Row> {
        Ok(value.clone())
    }
}

/// Adapter built from a pair of closures, for callers that do not want a
/// dedicated adapter type
pub struct FnAdapter<T, F, G>
where
    F: Fn(Row) -> DbResult<T> + Send + Sync,
    G: Fn(&T) -> DbResult<Row> + Send + Sync,
{
    from: F,
    to: G,
}

impl<T, F, G> FnAdapter<T, F, G>
where
    F: Fn(Row) -> DbResult<T> + Send + Sync,
    G: Fn(&T) -> DbResult<Row> + Send + Sync,
{
    /// Create an adapter from `from_row` and `to_row` closures
    pub fn new(from: F, to: G) -> Self {
        Self { from, to }
    }
}

impl<T, F, G> RowAdapter<T> for FnAdapter<T, F, G>
where
    F: Fn(Row) -> DbResult<T> + Send + Sync,
    G: Fn(&T) -> DbResult<Row> + Send + Sync,
{
    fn from_row(&self, row: Row) -> DbResult<T> {
        (self.from)(row)
    }

    fn to_row(&self, value: &T) -> DbResult<Row> {
        (self.to)(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Value;

    #[test]
    fn test_identity_round_trip() {
        let mut row = Row::new();
        row.insert("id".into(), Value::Integer(1));

        let adapter = IdentityAdapter;
        let out = adapter.from_row(row.clone()).unwrap();
        assert_eq!(adapter.to_row(&out).unwrap(), row);
    }

    #[test]
    fn test_fn_adapter() {
        let adapter = FnAdapter::new(
            |row: Row| {
                Ok(row
                    .get("name")
                    .and_then(Value::as_text)
                    .unwrap_or_default()
                    .to_string())
            },
            |name: &String| {
                let mut row = Row::new();
                row.insert("name".into(), Value::Text(name.clone()));
                Ok(row)
            },
        );

        let mut row = Row::new();
        row.insert("name".into(), Value::Text("Ana".into()));
        let name = adapter.from_row(row).unwrap();
        assert_eq!(name, "Ana");
        assert_eq!(
            adapter.to_row(&name).unwrap()["name"],
            Value::Text("Ana".into())
        );
    }
}
