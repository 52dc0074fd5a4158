//! Table engine
//!
//! The per-table core composing the schema, the codec, the driver, and the
//! event hub. Lifecycle:
//!
//! ```text
//! uninitialized -> initializing -> ready -> (re-initializing -> ready)* -> disconnected
//! ```
//!
//! Construction and re-initialization immediately start `create_table`
//! against the driver; `ready()` attaches to that outstanding attempt, so
//! callers never observe a half-created table. Re-initialization replaces
//! the schema and driver in place: engine identity and attached listeners
//! survive a backend swap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use crate::codec::{self, ReadPolicy};
use crate::driver::{StorageDriver, ROW_ID};
use crate::errors::{DbError, DbResult};
use crate::events::{ChangeEvent, EventHub};
use crate::observability::{Logger, Severity};
use crate::query::{Operator, Query, QueryDescriptor};
use crate::schema::{Row, TableSchema, Value};

/// Readiness of the outstanding initialization attempt
#[derive(Debug, Clone, PartialEq)]
enum Readiness {
    /// `create_table` is in flight
    Pending,
    /// The table exists and operations may proceed
    Ready,
    /// `create_table` failed; the message is preserved
    Failed(String),
    /// The engine was torn down; terminal
    Disconnected,
}

struct EngineState {
    schema: TableSchema,
    driver: Arc<dyn StorageDriver>,
}

/// The core engine owning one table's schema, driver binding, and lifecycle
pub struct TableEngine {
    database: String,
    name: String,
    state: RwLock<EngineState>,
    disconnected: AtomicBool,
    readiness: watch::Sender<Readiness>,
    hub: Arc<EventHub>,
    read_policy: ReadPolicy,
}

impl TableEngine {
    /// Create an engine and immediately start table creation.
    ///
    /// Table creation runs as a spawned task, so this must be called from
    /// within a tokio runtime; outside one it panics.
    pub(crate) fn new(
        database: impl Into<String>,
        name: impl Into<String>,
        driver: Arc<dyn StorageDriver>,
        schema: TableSchema,
        hub: Arc<EventHub>,
        read_policy: ReadPolicy,
    ) -> Arc<Self> {
        let (readiness, _) = watch::channel(Readiness::Pending);
        let engine = Arc::new(Self {
            database: database.into(),
            name: name.into(),
            state: RwLock::new(EngineState {
                schema: schema.clone(),
                driver: driver.clone(),
            }),
            disconnected: AtomicBool::new(false),
            readiness,
            hub,
            read_policy,
        });
        engine.initialize(driver, schema);
        engine
    }

    /// Install a new driver and column set, then re-run table creation.
    ///
    /// In-flight query builders captured before this call operate against
    /// the new driver once it resolves. Spawns the creation task, so it
    /// must be called from within a tokio runtime.
    pub fn initialize(self: &Arc<Self>, driver: Arc<dyn StorageDriver>, schema: TableSchema) {
        if self.is_disconnected() {
            return;
        }

        {
            let mut state = self.state.write().expect("engine state poisoned");
            state.driver = driver;
            state.schema = schema;
        }
        self.readiness.send_replace(Readiness::Pending);

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let (driver, schema) = engine.snapshot();
            let outcome = driver.create_table(&engine.name, &schema).await;
            if engine.is_disconnected() {
                return;
            }
            match outcome {
                Ok(()) => {
                    engine.readiness.send_replace(Readiness::Ready);
                }
                Err(err) => {
                    Logger::log(
                        Severity::Error,
                        "table_create_failed",
                        &[
                            ("database", engine.database.as_str()),
                            ("table", engine.name.as_str()),
                            ("error", &err.to_string()),
                        ],
                    );
                    engine.readiness.send_replace(Readiness::Failed(err.to_string()));
                }
            }
        });
    }

    /// Await the outstanding initialization.
    ///
    /// Memoized: repeated calls before completion attach to the same pending
    /// attempt. Fails fast once the engine is disconnected.
    pub async fn ready(&self) -> DbResult<()> {
        if self.is_disconnected() {
            return Err(DbError::Disconnected(self.qualified_name()));
        }

        let mut rx = self.readiness.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            match current {
                Readiness::Ready => return Ok(()),
                Readiness::Failed(message) => {
                    return Err(DbError::driver("create_table", message));
                }
                Readiness::Disconnected => {
                    return Err(DbError::Disconnected(self.qualified_name()));
                }
                Readiness::Pending => {
                    if rx.changed().await.is_err() {
                        return Err(DbError::Disconnected(self.qualified_name()));
                    }
                }
            }
        }
    }

    /// Mark this engine disconnected; terminal
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        self.readiness.send_replace(Readiness::Disconnected);
    }

    /// Whether the engine has been torn down
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning database name
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The shared hub for this table's physical identity
    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    /// Read-path validation policy
    pub fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }

    /// Snapshot the current driver and schema
    pub(crate) fn snapshot(&self) -> (Arc<dyn StorageDriver>, TableSchema) {
        let state = self.state.read().expect("engine state poisoned");
        (state.driver.clone(), state.schema.clone())
    }

    /// Current column set
    pub fn schema(&self) -> TableSchema {
        self.state.read().expect("engine state poisoned").schema.clone()
    }

    fn qualified_name(&self) -> String {
        format!("{}:{}", self.database, self.name)
    }

    /// Select every matching row
    pub async fn select_all(&self, descriptor: Option<&QueryDescriptor>) -> DbResult<Vec<Row>> {
        self.ready().await?;
        let (driver, schema) = self.snapshot();
        let rows = driver
            .select_all(&self.name, descriptor)
            .await
            .map_err(|e| e.in_operation("select_all"))?;
        codec::from_storage(&schema, &rows, self.read_policy)
    }

    /// Select a single matching row
    pub async fn select_one(&self, descriptor: Option<&QueryDescriptor>) -> DbResult<Option<Row>> {
        self.ready().await?;
        let (driver, schema) = self.snapshot();
        let row = driver
            .select_one(&self.name, descriptor)
            .await
            .map_err(|e| e.in_operation("select_one"))?;
        row.map(|r| codec::from_storage_row(&schema, &r, self.read_policy))
            .transpose()
    }

    /// Select the first matching row
    pub async fn select_first(
        &self,
        descriptor: Option<&QueryDescriptor>,
    ) -> DbResult<Option<Row>> {
        self.ready().await?;
        let (driver, schema) = self.snapshot();
        let row = driver
            .select_first(&self.name, descriptor)
            .await
            .map_err(|e| e.in_operation("select_first"))?;
        row.map(|r| codec::from_storage_row(&schema, &r, self.read_policy))
            .transpose()
    }

    /// Select the last matching row
    pub async fn select_last(
        &self,
        descriptor: Option<&QueryDescriptor>,
    ) -> DbResult<Option<Row>> {
        self.ready().await?;
        let (driver, schema) = self.snapshot();
        let row = driver
            .select_last(&self.name, descriptor)
            .await
            .map_err(|e| e.in_operation("select_last"))?;
        row.map(|r| codec::from_storage_row(&schema, &r, self.read_policy))
            .transpose()
    }

    /// Count matching rows
    pub async fn length(&self, descriptor: Option<&QueryDescriptor>) -> DbResult<u64> {
        self.ready().await?;
        let (driver, _) = self.snapshot();
        driver
            .length(&self.name, descriptor)
            .await
            .map_err(|e| e.in_operation("length"))
    }

    /// Whether any row matches the descriptor
    pub async fn exists(&self, descriptor: &QueryDescriptor) -> DbResult<bool> {
        Ok(self.length(Some(descriptor)).await? > 0)
    }

    /// Validate, persist, and publish one row; returns it as stored
    pub async fn insert(&self, row: &Row) -> DbResult<Row> {
        self.ready().await?;
        let (driver, schema) = self.snapshot();
        let payload = codec::to_storage(&schema, row, false)?;
        let stored = driver
            .insert(&self.name, payload)
            .await
            .map_err(|e| e.in_operation("insert"))?;
        self.hub.publish(ChangeEvent::Insert {
            rows: vec![stored.clone()],
        });
        codec::from_storage_row(&schema, &stored, self.read_policy)
    }

    /// Insert a batch as independent per-row inserts.
    ///
    /// One bad row does not block the others; each slot carries its own
    /// outcome.
    pub async fn insert_many(&self, rows: &[Row]) -> Vec<DbResult<Row>> {
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(self.insert(row).await);
        }
        results
    }

    /// Apply a partial row to every matching row.
    ///
    /// The affected set is snapshotted with the same descriptor immediately
    /// before mutating, so the published pre-image is accurate; the
    /// post-image is re-selected by the identity column afterwards.
    ///
    /// Mutations address the full filter match. A descriptor carrying
    /// `take`/`skip` is rejected, since paging would make the mutated set
    /// diverge from the published images.
    pub async fn update(&self, row: &Row, descriptor: &QueryDescriptor) -> DbResult<u64> {
        self.ready().await?;
        check_mutation_descriptor(descriptor, "update")?;
        let (driver, schema) = self.snapshot();

        let previous = driver
            .select_all(&self.name, Some(descriptor))
            .await
            .map_err(|e| e.in_operation("update"))?;

        let payload = codec::to_storage(&schema, row, true)?;
        let affected = driver
            .update(&self.name, payload, descriptor)
            .await
            .map_err(|e| e.in_operation("update"))?;

        let ids: Vec<Value> = previous
            .iter()
            .filter_map(|r| r.get(ROW_ID).cloned())
            .collect();
        let current = if ids.is_empty() {
            Vec::new()
        } else {
            let by_identity = Query::new().filter(ROW_ID, Operator::In, ids).descriptor();
            driver
                .select_all(&self.name, Some(&by_identity))
                .await
                .map_err(|e| e.in_operation("update"))?
        };

        self.hub.publish(ChangeEvent::Update { previous, current });
        Ok(affected)
    }

    /// Delete every matching row, publishing the pre-image
    pub async fn delete(&self, descriptor: &QueryDescriptor) -> DbResult<u64> {
        self.ready().await?;
        check_mutation_descriptor(descriptor, "delete")?;
        let (driver, _) = self.snapshot();

        let previous = driver
            .select_all(&self.name, Some(descriptor))
            .await
            .map_err(|e| e.in_operation("delete"))?;
        let affected = driver
            .delete(&self.name, descriptor)
            .await
            .map_err(|e| e.in_operation("delete"))?;

        self.hub.publish(ChangeEvent::Delete { rows: previous });
        Ok(affected)
    }
}

/// Reject descriptors a mutation cannot honor: unconstrained ones, and
/// paged ones (the mutated set must equal the published images)
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

impl std::fmt::Debug for TableEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableEngine")
            .field("database", &self.database)
            .field("name", &self.name)
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}
