//! Column type system
//!
//! A closed set of storage-representable types and the value union that
//! inhabits them. Two operations:
//! - `classify`: infer a type from a literal (used to derive a schema from
//!   sample data)
//! - `matches`: strict validation of a value already claiming a type
//!
//! The asymmetry is intentional: `classify` is permissive, `matches` is not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    /// UTF-8 string
    Text,
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Float,
    /// Boolean
    Boolean,
    /// Timezone-aware instant, millisecond precision on the wire
    DateTime,
    /// 128-bit signed integer
    BigInt,
    /// The null type
    Null,
}

impl ColumnType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "FLOAT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::DateTime => "DATETIME",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Null => "NULL",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// A storable application value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent / null
    Null,
    /// UTF-8 string
    Text(String),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Float(f64),
    /// Boolean
    Boolean(bool),
    /// Timezone-aware instant
    DateTime(DateTime<Utc>),
    /// 128-bit signed integer
    BigInt(i128),
}

impl Value {
    /// Infer the column type of this literal.
    ///
    /// A float whose value round-trips exactly through `i64` classifies as
    /// `Integer`, otherwise `Float`. Every variant maps to a type; there is
    /// no error path.
    pub fn classify(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Text(_) => ColumnType::Text,
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(f) => {
                if is_integral(*f) {
                    ColumnType::Integer
                } else {
                    ColumnType::Float
                }
            }
            Value::Boolean(_) => ColumnType::Boolean,
            Value::DateTime(_) => ColumnType::DateTime,
            Value::BigInt(_) => ColumnType::BigInt,
        }
    }

    /// Strict validation of this value against a declared type.
    ///
    /// `DateTime` columns require an actual date value, never an epoch
    /// number. `Integer` accepts integral floats and `Float` accepts
    /// integers (one numeric family), everything else is exact.
    pub fn matches(&self, column_type: ColumnType) -> bool {
        match (self, column_type) {
            (Value::Null, ColumnType::Null) => true,
            (Value::Text(_), ColumnType::Text) => true,
            (Value::Integer(_), ColumnType::Integer) => true,
            (Value::Float(f), ColumnType::Integer) => is_integral(*f),
            (Value::Float(_), ColumnType::Float) => true,
            (Value::Integer(_), ColumnType::Float) => true,
            (Value::Boolean(_), ColumnType::Boolean) => true,
            (Value::DateTime(_), ColumnType::DateTime) => true,
            (Value::BigInt(_), ColumnType::BigInt) => true,
            _ => false,
        }
    }

    /// Whether this value is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text contents, if this is a `Text` value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer contents, if this is an `Integer` value
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// Whether a float round-trips exactly through `i64`
fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 && {
        let i = f as i64;
        i as f64 == f
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<i128> for Value {
    fn from(i: i128) -> Self {
        Value::BigInt(i)
    }
}
