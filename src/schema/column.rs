//! Column definitions and table schemas
//!
//! Per-column metadata supplied once at table construction: type,
//! constraints, defaults, and the optional check validator. Immutable after
//! a table engine initializes, except through explicit re-initialization
//! with a new column set.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::types::{ColumnType, Value};

/// A zero-argument default-value generator
pub type GeneratorFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// A per-column check validator; returns an error message on rejection
pub type CheckFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Default value for a column, materialized at write time
#[derive(Clone)]
pub enum DefaultValue {
    /// A literal value
    Literal(Value),
    /// Sentinel: resolve to the current timestamp
    CurrentTimestamp,
    /// Sentinel: resolve to a freshly generated UUID string
    GeneratedUuid,
    /// A caller-supplied generator function
    Generator(GeneratorFn),
}

impl DefaultValue {
    /// Materialize this default into a concrete value
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Literal(v) => v.clone(),
            DefaultValue::CurrentTimestamp => Value::DateTime(Utc::now()),
            DefaultValue::GeneratedUuid => Value::Text(Uuid::new_v4().to_string()),
            DefaultValue::Generator(f) => f(),
        }
    }
}

impl std::fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefaultValue::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            DefaultValue::CurrentTimestamp => write!(f, "CurrentTimestamp"),
            DefaultValue::GeneratedUuid => write!(f, "GeneratedUuid"),
            DefaultValue::Generator(_) => write!(f, "Generator(..)"),
        }
    }
}

/// Static metadata describing one table column
#[derive(Clone)]
pub struct ColumnDef {
    /// Declared column type
    pub column_type: ColumnType,
    /// Part of the primary key
    pub primary_key: bool,
    /// Key is generated by the driver; stripped from every write payload
    pub auto_increment: bool,
    /// Value must be present after default resolution
    pub not_null: bool,
    /// Default, materialized when the column is absent from a full write
    pub default: Option<DefaultValue>,
    /// Unique constraint
    pub unique: bool,
    /// Check validator run against every written value
    pub check: Option<CheckFn>,
    /// Closed enumeration of allowed literals for TEXT columns
    pub options: Option<Vec<String>>,
}

impl ColumnDef {
    /// Create a column of the given type with no constraints
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            primary_key: false,
            auto_increment: false,
            not_null: false,
            default: None,
            unique: false,
            check: None,
            options: None,
        }
    }

    /// Mark as primary key
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as driver-generated auto-increment key
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Require a value after default resolution
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Set a literal default
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Set a sentinel or generator default
    pub fn default_with(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark as unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Install a check validator
    pub fn check<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.check = Some(Arc::new(f));
        self
    }

    /// Restrict a TEXT column to a closed set of literals
    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }
}

impl std::fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnDef")
            .field("column_type", &self.column_type)
            .field("primary_key", &self.primary_key)
            .field("auto_increment", &self.auto_increment)
            .field("not_null", &self.not_null)
            .field("default", &self.default)
            .field("unique", &self.unique)
            .field("check", &self.check.as_ref().map(|_| "Fn(..)"))
            .field("options", &self.options)
            .finish()
    }
}

/// The resolved column set for one table
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    columns: BTreeMap<String, ColumnDef>,
}

impl TableSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column definition
    pub fn column(mut self, name: impl Into<String>, def: ColumnDef) -> Self {
        self.columns.insert(name.into(), def);
        self
    }

    /// Look up a column definition
    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.get(name)
    }

    /// Whether a column is declared
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Iterate over `(name, definition)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnDef)> {
        self.columns.iter()
    }

    /// Declared column names
    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// Number of declared columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether no columns are declared
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
