//! Change event types

use crate::schema::Row;

/// Kind of table mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// New rows inserted
    Insert,
    /// Existing rows updated
    Update,
    /// Rows deleted
    Delete,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Insert => write!(f, "insert"),
            EventKind::Update => write!(f, "update"),
            EventKind::Delete => write!(f, "delete"),
        }
    }
}

/// One table mutation, carrying the affected rows.
///
/// On the hub the payload is raw storage rows; each subscribing handle
/// re-shapes the payload through its own row adapter before local delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T = Row> {
    /// Rows were inserted
    Insert {
        /// The rows as persisted
        rows: Vec<T>,
    },
    /// Rows were updated
    Update {
        /// Snapshot taken immediately before the mutation
        previous: Vec<T>,
        /// The affected rows after the mutation
        current: Vec<T>,
    },
    /// Rows were deleted
    Delete {
        /// Snapshot taken immediately before the mutation
        rows: Vec<T>,
    },
}

impl<T> ChangeEvent<T> {
    /// The mutation kind
    pub fn kind(&self) -> EventKind {
        match self {
            ChangeEvent::Insert { .. } => EventKind::Insert,
            ChangeEvent::Update { .. } => EventKind::Update,
            ChangeEvent::Delete { .. } => EventKind::Delete,
        }
    }

    /// Re-shape the payload, dropping rows the mapping rejects
    pub(crate) fn filter_map<U>(self, f: impl Fn(T) -> Option<U>) -> ChangeEvent<U> {
        let map = |rows: Vec<T>| rows.into_iter().filter_map(&f).collect();
        match self {
            ChangeEvent::Insert { rows } => ChangeEvent::Insert { rows: map(rows) },
            ChangeEvent::Update { previous, current } => ChangeEvent::Update {
                previous: previous.into_iter().filter_map(&f).collect(),
                current: current.into_iter().filter_map(&f).collect(),
            },
            ChangeEvent::Delete { rows } => ChangeEvent::Delete { rows: map(rows) },
        }
    }
}
