//! Observability
//!
//! Structured logging for lifecycle edges.

mod logger;

pub use logger::{Logger, Severity};
