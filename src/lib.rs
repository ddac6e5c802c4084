// Core infrastructure modules
pub mod core;
pub mod driver;

// Supporting modules
pub mod config;
pub mod test_utils;

// Re-export the capability surface for convenience
pub use crate::core::db::{
    ConnectionState, MockDatabase, Query, Queryable, Rows, SqlDatabase, Transactional, Value,
};
pub use crate::core::{Result, SqlGateError};
