//! Serialization pipeline
//!
//! Bidirectional coercion between application rows and wire rows, driven by
//! a resolved [`TableSchema`]. Both directions are pure functions: no state,
//! no I/O.
//!
//! Write direction (`to_storage`) fails loudly: a missing required column,
//! a domain mismatch, an enum violation, or a failed check validator rejects
//! the whole write. Read direction (`from_storage`) defaults to dropping
//! individually invalid fields so legacy or partially-written records remain
//! readable; `ReadPolicy::Strict` turns those drops into errors.

use crate::errors::{DbError, DbResult};
use crate::schema::{ColumnDef, ColumnType, Row, StorageRow, TableSchema, Value};

/// Read-path behavior for values that fail post-coercion validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPolicy {
    /// Drop invalid fields from the result
    #[default]
    Lenient,
    /// Fail the whole row read
    Strict,
}

/// Encode an application row into its wire representation.
///
/// Iterates every declared column when `partial` is false (materializing
/// defaults for absent columns), or only the keys present in `row` when
/// `partial` is true. Auto-increment columns are stripped unconditionally,
/// regardless of any caller-supplied value. Keys not declared in the schema
/// are ignored.
pub fn to_storage(schema: &TableSchema, row: &Row, partial: bool) -> DbResult<StorageRow> {
    let mut out = StorageRow::new();

    for (name, def) in schema.iter() {
        if partial && !row.contains_key(name) {
            continue;
        }
        if def.auto_increment {
            continue;
        }

        let value = match row.get(name) {
            Some(v) => Some(v.clone()),
            None => def.default.as_ref().map(|d| d.resolve()),
        };

        let value = match value {
            None | Some(Value::Null) => {
                if def.not_null {
                    return Err(DbError::validation(name, "column is NOT NULL"));
                }
                if let Some(Value::Null) = value {
                    out.insert(name.clone(), Value::Null);
                }
                continue;
            }
            Some(v) => v,
        };

        validate(name, def, &value)?;

        if let Some(wire) = to_wire(value, def.column_type) {
            out.insert(name.clone(), wire);
        }
    }

    Ok(out)
}

/// Decode one wire row back into an application row.
///
/// Absent columns with a default are materialized; DATETIME epoch integers
/// are decoded back to date values; every decoded value is re-validated.
/// Under [`ReadPolicy::Lenient`] a failing field is dropped, under
/// [`ReadPolicy::Strict`] the read fails.
pub fn from_storage_row(
    schema: &TableSchema,
    row: &StorageRow,
    policy: ReadPolicy,
) -> DbResult<Row> {
    let mut out = Row::new();

    for (name, def) in schema.iter() {
        let value = match row.get(name) {
            None => match def.default.as_ref() {
                Some(d) => d.resolve(),
                None => continue,
            },
            Some(v) => v.clone(),
        };

        if value.is_null() {
            continue;
        }

        let value = match from_wire(value, def.column_type) {
            Some(v) => v,
            None => {
                if policy == ReadPolicy::Strict {
                    return Err(DbError::validation(name, "unrepresentable wire value"));
                }
                continue;
            }
        };

        match validate(name, def, &value) {
            Ok(()) => {
                out.insert(name.clone(), value);
            }
            Err(err) => {
                if policy == ReadPolicy::Strict {
                    return Err(err);
                }
            }
        }
    }

    Ok(out)
}

/// Decode a batch of wire rows; see [`from_storage_row`]
pub fn from_storage(
    schema: &TableSchema,
    rows: &[StorageRow],
    policy: ReadPolicy,
) -> DbResult<Vec<Row>> {
    rows.iter()
        .map(|row| from_storage_row(schema, row, policy))
        .collect()
}

/// Validate a non-null value against its column definition
fn validate(name: &str, def: &ColumnDef, value: &Value) -> DbResult<()> {
    if !value.matches(def.column_type) {
        return Err(DbError::validation(
            name,
            format!(
                "expected {}, got {}",
                def.column_type,
                value.classify().type_name()
            ),
        ));
    }

    if let Some(options) = &def.options {
        let allowed = value
            .as_text()
            .map(|s| options.iter().any(|o| o == s))
            .unwrap_or(false);
        if !allowed {
            return Err(DbError::validation(
                name,
                format!("value is not one of {:?}", options),
            ));
        }
    }

    if let Some(check) = &def.check {
        check(value).map_err(|msg| DbError::validation(name, msg))?;
    }

    Ok(())
}

/// Coerce a validated value into its wire representation.
///
/// `None` means the value has no wire representation and the key is dropped
/// from the payload.
fn to_wire(value: Value, column_type: ColumnType) -> Option<Value> {
    match (value, column_type) {
        (Value::DateTime(dt), ColumnType::DateTime) => Some(Value::Integer(dt.timestamp_millis())),
        (v, _) => Some(v),
    }
}

/// Coerce a wire value back into its application representation
fn from_wire(value: Value, column_type: ColumnType) -> Option<Value> {
    match (value, column_type) {
        (Value::Integer(ms), ColumnType::DateTime) => {
            chrono::DateTime::from_timestamp_millis(ms).map(Value::DateTime)
        }
        (v, _) => Some(v),
    }
}
