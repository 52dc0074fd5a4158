//! Database registry
//!
//! Owns the named collection of table engines for one logical database plus
//! driver lifecycle: first setup, backend swap, and cascading deletion.
//! Engines are created lazily on first reference to a table name and cached;
//! a backend swap re-initializes every cached engine in place so existing
//! handles (and their listeners) keep working against the new driver.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::DatabaseConfig;
use crate::driver::StorageDriver;
use crate::errors::{DbError, DbResult};
use crate::events::EventRegistry;
use crate::observability::{Logger, Severity};
use crate::schema::TableSchema;
use crate::table::{TableEngine, TableHandle};

/// The owner of all table engines for one logical database
pub struct Database {
    name: String,
    driver: RwLock<Arc<dyn StorageDriver>>,
    tables: RwLock<HashMap<String, TableHandle>>,
    table_names: RwLock<Vec<String>>,
    events: Arc<EventRegistry>,
    config: DatabaseConfig,
    disconnected: AtomicBool,
}

impl Database {
    /// Connect a driver and open a database registry with default config
    pub async fn open(
        name: impl Into<String>,
        driver: Arc<dyn StorageDriver>,
        events: Arc<EventRegistry>,
    ) -> DbResult<Self> {
        Self::open_with_config(name, driver, events, DatabaseConfig::new()).await
    }

    /// Connect a driver and open a database registry
    pub async fn open_with_config(
        name: impl Into<String>,
        driver: Arc<dyn StorageDriver>,
        events: Arc<EventRegistry>,
        config: DatabaseConfig,
    ) -> DbResult<Self> {
        let name = name.into();
        driver
            .connect(&name)
            .await
            .map_err(|e| e.in_operation("connect"))?;
        Logger::log(
            Severity::Info,
            "database_opened",
            &[("database", name.as_str())],
        );
        Ok(Self {
            name,
            driver: RwLock::new(driver),
            tables: RwLock::new(HashMap::new()),
            table_names: RwLock::new(Vec::new()),
            events,
            config,
            disconnected: AtomicBool::new(false),
        })
    }

    /// Logical database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered table names, in declaration order
    pub fn table_names(&self) -> Vec<String> {
        self.table_names
            .read()
            .expect("table names poisoned")
            .clone()
    }

    /// Whether this registry has been disconnected
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    fn check_connected(&self) -> DbResult<()> {
        if self.is_disconnected() {
            return Err(DbError::Disconnected(self.name.clone()));
        }
        Ok(())
    }

    fn current_driver(&self) -> Arc<dyn StorageDriver> {
        self.driver.read().expect("driver poisoned").clone()
    }

    /// Return the cached handle for a table, or lazily construct its engine.
    ///
    /// The column set is used only when the engine does not exist yet; use
    /// [`Database::redefine_table`] to change an existing table's columns.
    /// Constructing an engine spawns its table-creation task and the
    /// handle's subscription pump, so this must be called from within a
    /// tokio runtime; outside one it panics.
    pub fn table(&self, name: &str, schema: TableSchema) -> DbResult<TableHandle> {
        self.check_connected()?;

        if let Some(handle) = self
            .tables
            .read()
            .expect("table cache poisoned")
            .get(name)
        {
            return Ok(handle.clone());
        }

        let mut tables = self.tables.write().expect("table cache poisoned");
        if let Some(handle) = tables.get(name) {
            return Ok(handle.clone());
        }

        let hub = self.events.hub(&self.name, name);
        let engine = TableEngine::new(
            self.name.clone(),
            name,
            self.current_driver(),
            schema,
            hub,
            self.config.read_policy,
        );
        let handle = TableHandle::new(engine);
        tables.insert(name.to_string(), handle.clone());
        self.table_names
            .write()
            .expect("table names poisoned")
            .push(name.to_string());
        Ok(handle)
    }

    /// Re-initialize a cached engine with a new column set.
    ///
    /// Engine identity and attached listeners survive; the handle's next
    /// `ready()` awaits the re-created table. Spawns the creation task, so
    /// this must be called from within a tokio runtime.
    pub fn redefine_table(&self, name: &str, schema: TableSchema) -> DbResult<TableHandle> {
        self.check_connected()?;
        let handle = self
            .tables
            .read()
            .expect("table cache poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("table '{}'", name)))?;
        handle.engine().initialize(self.current_driver(), schema);
        Ok(handle)
    }

    /// Drop a table: driver call, cache eviction, name removal
    pub async fn delete_table(&self, name: &str) -> DbResult<()> {
        self.check_connected()?;
        self.current_driver()
            .delete_table(name)
            .await
            .map_err(|e| e.in_operation("delete_table"))?;

        if let Some(handle) = self
            .tables
            .write()
            .expect("table cache poisoned")
            .remove(name)
        {
            handle.engine().disconnect();
        }
        self.table_names
            .write()
            .expect("table names poisoned")
            .retain(|n| n != name);
        Ok(())
    }

    /// Destroy the whole database and tear down every cached engine
    pub async fn delete_database(&self) -> DbResult<()> {
        self.check_connected()?;
        self.disconnected.store(true, Ordering::SeqCst);

        let driver = self.current_driver();
        driver
            .delete_database()
            .await
            .map_err(|e| e.in_operation("delete_database"))?;
        driver
            .disconnect()
            .await
            .map_err(|e| e.in_operation("disconnect"))?;

        self.teardown_tables();
        Logger::log(
            Severity::Info,
            "database_deleted",
            &[("database", self.name.as_str())],
        );
        Ok(())
    }

    /// Disconnect without destroying stored data
    pub async fn disconnect(&self) -> DbResult<()> {
        self.check_connected()?;
        self.disconnected.store(true, Ordering::SeqCst);
        self.current_driver()
            .disconnect()
            .await
            .map_err(|e| e.in_operation("disconnect"))?;
        self.teardown_tables();
        Ok(())
    }

    /// First setup or backend swap.
    ///
    /// Connects the new driver, installs it, and re-runs initialization for
    /// every cached engine so existing handles keep working.
    pub async fn initialize(&self, driver: Arc<dyn StorageDriver>) -> DbResult<()> {
        driver
            .connect(&self.name)
            .await
            .map_err(|e| e.in_operation("connect"))?;

        *self.driver.write().expect("driver poisoned") = driver.clone();
        self.disconnected.store(false, Ordering::SeqCst);

        let handles: Vec<TableHandle> = self
            .tables
            .read()
            .expect("table cache poisoned")
            .values()
            .cloned()
            .collect();
        for handle in &handles {
            let schema = handle.engine().schema();
            handle.engine().initialize(driver.clone(), schema);
        }

        Logger::log(
            Severity::Info,
            "database_initialized",
            &[
                ("database", self.name.as_str()),
                ("tables", &handles.len().to_string()),
            ],
        );
        Ok(())
    }

    fn teardown_tables(&self) {
        let mut tables = self.tables.write().expect("table cache poisoned");
        for handle in tables.values() {
            handle.engine().disconnect();
        }
        tables.clear();
        self.table_names
            .write()
            .expect("table names poisoned")
            .clear();
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("tables", &self.table_names())
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}
