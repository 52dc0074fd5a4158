//! In-memory reference driver
//!
//! Implements the full storage contract against process-local state. Used by
//! the test suite and as the embedded default backend. Every persisted row
//! carries the implicit `rowid` identity column so callers can address
//! specific physical rows; projections always include it.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::RwLock;

use async_trait::async_trait;
use regex::Regex;

use crate::errors::{DbError, DbResult};
use crate::query::{Compare, Operator, QueryDescriptor};
use crate::schema::{StorageRow, TableSchema, Value};

use super::StorageDriver;

/// The implicit row-identity column every driver row carries
pub const ROW_ID: &str = "rowid";

struct MemTable {
    schema: TableSchema,
    rows: Vec<StorageRow>,
    next_rowid: i64,
    auto_counters: HashMap<String, i64>,
}

impl MemTable {
    fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            next_rowid: 1,
            auto_counters: HashMap::new(),
        }
    }

    /// Additively reconcile a newly declared column set into this table
    fn reconcile(&mut self, schema: &TableSchema) {
        let mut merged = self.schema.clone();
        for (name, def) in schema.iter() {
            if !merged.contains(name) {
                merged = merged.column(name.clone(), def.clone());
            }
        }
        self.schema = merged;
    }
}

/// In-memory storage backend
pub struct MemoryDriver {
    database: RwLock<Option<String>>,
    disconnected: AtomicBool,
    tables: RwLock<HashMap<String, MemTable>>,
}

impl MemoryDriver {
    /// Create an unbound driver
    pub fn new() -> Self {
        Self {
            database: RwLock::new(None),
            disconnected: AtomicBool::new(false),
            tables: RwLock::new(HashMap::new()),
        }
    }

    fn check_connected(&self) -> DbResult<()> {
        if self.disconnected.load(AtomicOrdering::SeqCst) {
            let name = self
                .database
                .read()
                .ok()
                .and_then(|d| d.clone())
                .unwrap_or_else(|| "memory".to_string());
            return Err(DbError::Disconnected(name));
        }
        Ok(())
    }

    fn with_table<R>(
        &self,
        table: &str,
        f: impl FnOnce(&MemTable) -> DbResult<R>,
    ) -> DbResult<R> {
        let tables = self
            .tables
            .read()
            .map_err(|e| DbError::driver("memory", e.to_string()))?;
        let mem = tables
            .get(table)
            .ok_or_else(|| DbError::NotFound(format!("table '{}'", table)))?;
        f(mem)
    }

    fn with_table_mut<R>(
        &self,
        table: &str,
        f: impl FnOnce(&mut MemTable) -> DbResult<R>,
    ) -> DbResult<R> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| DbError::driver("memory", e.to_string()))?;
        let mem = tables
            .get_mut(table)
            .ok_or_else(|| DbError::NotFound(format!("table '{}'", table)))?;
        f(mem)
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    async fn connect(&self, database: &str) -> DbResult<()> {
        let mut bound = self
            .database
            .write()
            .map_err(|e| DbError::driver("memory", e.to_string()))?;
        *bound = Some(database.to_string());
        self.disconnected.store(false, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> DbResult<()> {
        self.disconnected.store(true, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn create_table(&self, table: &str, schema: &TableSchema) -> DbResult<()> {
        self.check_connected()?;
        let mut tables = self
            .tables
            .write()
            .map_err(|e| DbError::driver("memory", e.to_string()))?;
        match tables.get_mut(table) {
            Some(existing) => existing.reconcile(schema),
            None => {
                tables.insert(table.to_string(), MemTable::new(schema.clone()));
            }
        }
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> DbResult<()> {
        self.check_connected()?;
        let mut tables = self
            .tables
            .write()
            .map_err(|e| DbError::driver("memory", e.to_string()))?;
        tables
            .remove(table)
            .ok_or_else(|| DbError::NotFound(format!("table '{}'", table)))?;
        Ok(())
    }

    async fn delete_database(&self) -> DbResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| DbError::driver("memory", e.to_string()))?;
        tables.clear();
        Ok(())
    }

    async fn select_all(
        &self,
        table: &str,
        descriptor: Option<&QueryDescriptor>,
    ) -> DbResult<Vec<StorageRow>> {
        self.check_connected()?;
        self.with_table(table, |mem| execute(mem, descriptor))
    }

    async fn select_one(
        &self,
        table: &str,
        descriptor: Option<&QueryDescriptor>,
    ) -> DbResult<Option<StorageRow>> {
        let rows = self.select_all(table, descriptor).await?;
        Ok(rows.into_iter().next())
    }

    async fn select_first(
        &self,
        table: &str,
        descriptor: Option<&QueryDescriptor>,
    ) -> DbResult<Option<StorageRow>> {
        let rows = self.select_all(table, descriptor).await?;
        Ok(rows.into_iter().next())
    }

    async fn select_last(
        &self,
        table: &str,
        descriptor: Option<&QueryDescriptor>,
    ) -> DbResult<Option<StorageRow>> {
        let rows = self.select_all(table, descriptor).await?;
        Ok(rows.into_iter().last())
    }

    async fn insert(&self, table: &str, mut row: StorageRow) -> DbResult<StorageRow> {
        self.check_connected()?;
        self.with_table_mut(table, |mem| {
            row.insert(ROW_ID.to_string(), Value::Integer(mem.next_rowid));
            mem.next_rowid += 1;

            // Generate keys for absent auto-increment columns
            let auto: Vec<String> = mem
                .schema
                .iter()
                .filter(|(_, def)| def.auto_increment)
                .map(|(name, _)| name.clone())
                .collect();
            for name in auto {
                if !row.contains_key(&name) {
                    let counter = mem.auto_counters.entry(name.clone()).or_insert(0);
                    *counter += 1;
                    row.insert(name, Value::Integer(*counter));
                }
            }

            mem.rows.push(row.clone());
            Ok(row)
        })
    }

    async fn update(
        &self,
        table: &str,
        row: StorageRow,
        descriptor: &QueryDescriptor,
    ) -> DbResult<u64> {
        self.check_connected()?;
        check_mutation_descriptor(descriptor, "update")?;
        let filters = compile_filters(descriptor)?;
        self.with_table_mut(table, |mem| {
            let mut affected = 0;
            for stored in mem.rows.iter_mut() {
                if matches_filters(stored, &filters) {
                    for (key, value) in &row {
                        if key != ROW_ID {
                            stored.insert(key.clone(), value.clone());
                        }
                    }
                    affected += 1;
                }
            }
            Ok(affected)
        })
    }

    async fn delete(&self, table: &str, descriptor: &QueryDescriptor) -> DbResult<u64> {
        self.check_connected()?;
        check_mutation_descriptor(descriptor, "delete")?;
        let filters = compile_filters(descriptor)?;
        self.with_table_mut(table, |mem| {
            let before = mem.rows.len();
            mem.rows.retain(|row| !matches_filters(row, &filters));
            Ok((before - mem.rows.len()) as u64)
        })
    }

    async fn length(&self, table: &str, descriptor: Option<&QueryDescriptor>) -> DbResult<u64> {
        self.check_connected()?;
        let filters = match descriptor {
            Some(d) => compile_filters(d)?,
            None => Vec::new(),
        };
        self.with_table(table, |mem| {
            Ok(mem
                .rows
                .iter()
                .filter(|row| matches_filters(row, &filters))
                .count() as u64)
        })
    }
}

/// Reject descriptors a mutation cannot honor: unconstrained or paged
fn check_mutation_descriptor(descriptor: &QueryDescriptor, operation: &str) -> DbResult<()> {
    if !descriptor.is_constrained() {
        return Err(DbError::InvalidArgument(format!(
            "{} requires a non-empty where clause",
            operation
        )));
    }
    if descriptor.take.is_some() || descriptor.skip.is_some() {
        return Err(DbError::InvalidArgument(format!(
            "{} addresses the full filter match; take/skip are not supported",
            operation
        )));
    }
    Ok(())
}

/// One pre-compiled filter condition
enum Filter {
    Compare {
        column: String,
        operator: Operator,
        compare: Compare,
    },
    Pattern {
        column: String,
        regex: Regex,
        negate: bool,
    },
}

/// Validate and pre-compile a descriptor's where clauses.
///
/// `LIKE` comparators are regular-expression-shaped; a malformed pattern is
/// rejected up front instead of failing per row.
fn compile_filters(descriptor: &QueryDescriptor) -> DbResult<Vec<Filter>> {
    descriptor
        .wheres
        .iter()
        .map(|clause| match clause.operator {
            Operator::Like | Operator::NotLike => {
                let pattern = match &clause.compare {
                    Compare::Single(Value::Text(p)) => p,
                    _ => {
                        return Err(DbError::InvalidArgument(format!(
                            "{} requires a text pattern",
                            clause.operator
                        )))
                    }
                };
                let regex = Regex::new(pattern).map_err(|e| {
                    DbError::InvalidArgument(format!("invalid pattern '{}': {}", pattern, e))
                })?;
                Ok(Filter::Pattern {
                    column: clause.column.clone(),
                    regex,
                    negate: clause.operator == Operator::NotLike,
                })
            }
            _ => Ok(Filter::Compare {
                column: clause.column.clone(),
                operator: clause.operator,
                compare: clause.compare.clone(),
            }),
        })
        .collect()
}

fn matches_filters(row: &StorageRow, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Pattern {
            column,
            regex,
            negate,
        } => {
            let hit = row
                .get(column)
                .and_then(Value::as_text)
                .map(|s| regex.is_match(s))
                .unwrap_or(false);
            hit != *negate
        }
        Filter::Compare {
            column,
            operator,
            compare,
        } => {
            let Some(value) = row.get(column) else {
                return false;
            };
            eval_compare(value, *operator, compare)
        }
    })
}

fn eval_compare(value: &Value, operator: Operator, compare: &Compare) -> bool {
    match (operator, compare) {
        (Operator::Eq, Compare::Single(rhs)) => is_equal(value, rhs),
        (Operator::Ne, Compare::Single(rhs)) => !is_equal(value, rhs),
        (Operator::Gt, Compare::Single(rhs)) => {
            cmp_values(value, rhs) == Some(Ordering::Greater)
        }
        (Operator::Lt, Compare::Single(rhs)) => cmp_values(value, rhs) == Some(Ordering::Less),
        (Operator::Ge, Compare::Single(rhs)) => {
            matches!(cmp_values(value, rhs), Some(Ordering::Greater | Ordering::Equal))
        }
        (Operator::Le, Compare::Single(rhs)) => {
            matches!(cmp_values(value, rhs), Some(Ordering::Less | Ordering::Equal))
        }
        (Operator::Between, Compare::Range(low, high)) => in_range(value, low, high),
        (Operator::NotBetween, Compare::Range(low, high)) => !in_range(value, low, high),
        (Operator::In, Compare::List(values)) => values.iter().any(|v| is_equal(value, v)),
        (Operator::NotIn, Compare::List(values)) => !values.iter().any(|v| is_equal(value, v)),
        _ => false,
    }
}

fn in_range(value: &Value, low: &Value, high: &Value) -> bool {
    matches!(cmp_values(value, low), Some(Ordering::Greater | Ordering::Equal))
        && matches!(cmp_values(value, high), Some(Ordering::Less | Ordering::Equal))
}

fn is_equal(a: &Value, b: &Value) -> bool {
    cmp_values(a, b) == Some(Ordering::Equal)
}

/// Ordering across the numeric family and within text/boolean domains
fn cmp_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::BigInt(x), Value::BigInt(y)) => Some(x.cmp(y)),
        (Value::Integer(x), Value::BigInt(y)) => Some((*x as i128).cmp(y)),
        (Value::BigInt(x), Value::Integer(y)) => Some(x.cmp(&(*y as i128))),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Integer(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Integer(y)) => x.partial_cmp(&(*y as f64)),
        (Value::BigInt(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::BigInt(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Run a full select: filter, sort, page, project
fn execute(mem: &MemTable, descriptor: Option<&QueryDescriptor>) -> DbResult<Vec<StorageRow>> {
    let Some(descriptor) = descriptor else {
        return Ok(mem.rows.clone());
    };

    let filters = compile_filters(descriptor)?;
    let mut rows: Vec<StorageRow> = mem
        .rows
        .iter()
        .filter(|row| matches_filters(row, &filters))
        .cloned()
        .collect();

    for order in descriptor.order.iter().rev() {
        rows.sort_by(|a, b| {
            let ord = match (a.get(&order.column), b.get(&order.column)) {
                (Some(x), Some(y)) => cmp_values(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if order.ascending {
                ord
            } else {
                ord.reverse()
            }
        });
    }

    let skip = descriptor.skip.unwrap_or(0);
    let take = descriptor.take.unwrap_or(usize::MAX);
    let mut rows: Vec<StorageRow> = rows.into_iter().skip(skip).take(take).collect();

    if !descriptor.columns.is_empty() {
        for row in rows.iter_mut() {
            // The identity column is always projected alongside requests
            row.retain(|key, _| key == ROW_ID || descriptor.columns.contains(key));
        }
    }

    Ok(rows)
}
