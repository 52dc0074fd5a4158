//! Table subsystem
//!
//! [`TableEngine`] owns one table's schema, driver binding, readiness, and
//! event publication; [`TableHandle`] is the typed public façade over it.

mod adapter;
mod engine;
mod handle;

pub use adapter::{FnAdapter, IdentityAdapter, RowAdapter};
pub use engine::TableEngine;
pub use handle::TableHandle;
