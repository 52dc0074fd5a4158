//! Event hub and process-wide hub registry
//!
//! One hub per physical table, keyed by `"<database>:<table>"`. The engine
//! that performs a mutation publishes into the hub; every handle for the
//! same key subscribes. Hubs are keyed by name, not by instance, so engine
//! churn never produces distinct hubs, and entries live for the process
//! lifetime (cardinality is bounded by the number of declared tables, not by
//! request volume).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::schema::StorageRow;

use super::event::ChangeEvent;

/// Default broadcast channel depth per hub
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// The shared notification hub for one physical table
pub struct EventHub {
    key: String,
    tx: broadcast::Sender<ChangeEvent<StorageRow>>,
}

impl EventHub {
    fn new(key: String, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { key, tx }
    }

    /// The `"<database>:<table>"` identity of this hub
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Fan a raw mutation out to every subscriber.
    ///
    /// Returns the number of subscribers that received it; publishing with
    /// no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent<StorageRow>) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Attach a subscriber to this hub's raw event stream
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent<StorageRow>> {
        self.tx.subscribe()
    }

    /// Number of attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("key", &self.key)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Process-scoped map from physical-table identity to its hub.
///
/// Passed by reference into every database and table engine rather than held
/// as an ambient global; the mutex guards only map access, never delivery.
#[derive(Debug)]
pub struct EventRegistry {
    capacity: usize,
    hubs: Mutex<HashMap<String, Arc<EventHub>>>,
}

impl EventRegistry {
    /// Create a registry with the default per-hub capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a registry with an explicit per-hub channel depth
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            hubs: Mutex::new(HashMap::new()),
        }
    }

    /// Look up or lazily create the hub for a physical table.
    ///
    /// Entries are never evicted.
    pub fn hub(&self, database: &str, table: &str) -> Arc<EventHub> {
        let key = format!("{}:{}", database, table);
        let mut hubs = self.hubs.lock().expect("event registry poisoned");
        hubs.entry(key.clone())
            .or_insert_with(|| Arc::new(EventHub::new(key, self.capacity)))
            .clone()
    }

    /// Number of distinct hubs created so far
    pub fn len(&self) -> usize {
        self.hubs.lock().expect("event registry poisoned").len()
    }

    /// Whether no hub has been created yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}
