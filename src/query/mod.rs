//! Query subsystem
//!
//! The mutable builder, the immutable descriptor snapshot drivers consume,
//! and the bound builder with terminal operations.

mod bound;
mod builder;
mod descriptor;

pub use bound::TableQuery;
pub use builder::Query;
pub use descriptor::{Compare, Operator, OrderBy, QueryDescriptor, WhereClause};
