/// Core Module for SQLGate
///
/// This module contains the database capability traits, the production and
/// mock adapters, and the shared error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{Result, SqlGateError};
