//! Table handles
//!
//! The public façade over a [`TableEngine`]: a handle pairs the shared
//! engine with a row-shape adapter and its own local listener set. Every
//! handle runs one subscription pump against the table's hub, re-shaping
//! raw storage rows through its own adapter before local delivery, so
//! independently constructed handles observe the same physical changes in
//! their respective row shapes without re-querying the backend.

use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::codec;
use crate::errors::DbResult;
use crate::events::ChangeEvent;
use crate::observability::{Logger, Severity};
use crate::query::{QueryDescriptor, TableQuery};
use crate::schema::Row;

use super::adapter::{IdentityAdapter, RowAdapter};
use super::engine::TableEngine;

/// Aborts the subscription pump when the last handle clone is dropped
struct PumpGuard(Mutex<Option<JoinHandle<()>>>);

impl Drop for PumpGuard {
    fn drop(&mut self) {
        if let Ok(mut task) = self.0.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

/// A typed handle onto one table
pub struct TableHandle<T = Row>
where
    T: Clone + Send + 'static,
{
    engine: Arc<TableEngine>,
    adapter: Arc<dyn RowAdapter<T>>,
    listeners: Arc<RwLock<Vec<mpsc::UnboundedSender<ChangeEvent<T>>>>>,
    _pump: Arc<PumpGuard>,
}

impl<T> Clone for TableHandle<T>
where
    T: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            adapter: self.adapter.clone(),
            listeners: self.listeners.clone(),
            _pump: self._pump.clone(),
        }
    }
}

impl TableHandle<Row> {
    /// Create the default (identity-shaped) handle for an engine
    pub(crate) fn new(engine: Arc<TableEngine>) -> Self {
        Self::attach(engine, Arc::new(IdentityAdapter))
    }
}

impl<T> TableHandle<T>
where
    T: Clone + Send + 'static,
{
    /// Attach a handle with its own adapter and a fresh subscription pump
    fn attach(engine: Arc<TableEngine>, adapter: Arc<dyn RowAdapter<T>>) -> Self {
        let listeners: Arc<RwLock<Vec<mpsc::UnboundedSender<ChangeEvent<T>>>>> =
            Arc::new(RwLock::new(Vec::new()));

        let mut rx = engine.hub().subscribe();
        let pump_engine = engine.clone();
        let pump_adapter = adapter.clone();
        let pump_listeners = listeners.clone();
        let task = tokio::spawn(async move {
            loop {
                let raw = match rx.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        // The hub buffer overflowed; resume from the oldest
                        // retained event
                        Logger::log(
                            Severity::Warn,
                            "change_stream_lagged",
                            &[
                                ("table", pump_engine.name()),
                                ("skipped", &skipped.to_string()),
                            ],
                        );
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                // Re-shape through the engine's current schema and this
                // handle's own adapter; rows that fail to decode are dropped
                let schema = pump_engine.schema();
                let policy = pump_engine.read_policy();
                let adapter = pump_adapter.clone();
                let event = raw.filter_map(|storage_row| {
                    codec::from_storage_row(&schema, &storage_row, policy)
                        .ok()
                        .and_then(|row| adapter.from_row(row).ok())
                });

                let mut listeners = match pump_listeners.write() {
                    Ok(l) => l,
                    Err(_) => break,
                };
                listeners.retain(|tx| tx.send(event.clone()).is_ok());
            }
        });

        Self {
            engine,
            adapter,
            listeners,
            _pump: Arc::new(PumpGuard(Mutex::new(Some(task)))),
        }
    }

    /// Rebind to a different row shape.
    ///
    /// The new handle shares the engine (driver, schema, hub key) but owns a
    /// fresh listener set and its own subscription pump; this handle and its
    /// listeners are unaffected.
    pub fn with_adapter<U, A>(&self, adapter: A) -> TableHandle<U>
    where
        U: Clone + Send + 'static,
        A: RowAdapter<U> + 'static,
    {
        TableHandle::attach(self.engine.clone(), Arc::new(adapter))
    }

    /// The shared engine behind this handle
    pub fn engine(&self) -> &Arc<TableEngine> {
        &self.engine
    }

    /// Table name
    pub fn name(&self) -> &str {
        self.engine.name()
    }

    /// Await the outstanding initialization
    pub async fn ready(&self) -> DbResult<()> {
        self.engine.ready().await
    }

    /// Register a local listener for this handle's shaped change events
    pub fn changes(&self) -> mpsc::UnboundedReceiver<ChangeEvent<T>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .write()
            .expect("listener set poisoned")
            .push(tx);
        rx
    }

    /// Start a fluent query against this table
    pub fn query(&self) -> TableQuery<'_, T> {
        TableQuery::new(self)
    }

    /// Select every matching row
    pub async fn select_all(&self, descriptor: Option<&QueryDescriptor>) -> DbResult<Vec<T>> {
        let rows = self.engine.select_all(descriptor).await?;
        rows.into_iter()
            .map(|row| self.adapter.from_row(row))
            .collect()
    }

    /// Select a single matching row
    pub async fn select_one(&self, descriptor: Option<&QueryDescriptor>) -> DbResult<Option<T>> {
        let row = self.engine.select_one(descriptor).await?;
        row.map(|r| self.adapter.from_row(r)).transpose()
    }

    /// Select the first matching row
    pub async fn select_first(&self, descriptor: Option<&QueryDescriptor>) -> DbResult<Option<T>> {
        let row = self.engine.select_first(descriptor).await?;
        row.map(|r| self.adapter.from_row(r)).transpose()
    }

    /// Select the last matching row
    pub async fn select_last(&self, descriptor: Option<&QueryDescriptor>) -> DbResult<Option<T>> {
        let row = self.engine.select_last(descriptor).await?;
        row.map(|r| self.adapter.from_row(r)).transpose()
    }

    /// Count matching rows
    pub async fn length(&self, descriptor: Option<&QueryDescriptor>) -> DbResult<u64> {
        self.engine.length(descriptor).await
    }

    /// Whether any row matches
    pub async fn exists(&self, descriptor: &QueryDescriptor) -> DbResult<bool> {
        self.engine.exists(descriptor).await
    }

    /// Validate, persist, and publish one value; returns it as stored
    pub async fn insert(&self, value: &T) -> DbResult<T> {
        let row = self.adapter.to_row(value)?;
        let stored = self.engine.insert(&row).await?;
        self.adapter.from_row(stored)
    }

    /// Insert a batch as independent per-row inserts; one bad value fails in
    /// isolation
    pub async fn insert_many(&self, values: &[T]) -> Vec<DbResult<T>> {
        let mut results = Vec::with_capacity(values.len());
        for value in values {
            results.push(self.insert(value).await);
        }
        results
    }

    /// Apply a partial row to every matching row
    pub async fn update(&self, row: &Row, descriptor: &QueryDescriptor) -> DbResult<u64> {
        self.engine.update(row, descriptor).await
    }

    /// Delete every matching row
    pub async fn delete(&self, descriptor: &QueryDescriptor) -> DbResult<u64> {
        self.engine.delete(descriptor).await
    }
}

impl<T> std::fmt::Debug for TableHandle<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableHandle")
            .field("engine", &self.engine)
            .finish()
    }
}
