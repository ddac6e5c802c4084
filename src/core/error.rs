/// SQLGate Error Module
///
/// This module defines the error type shared by the capability traits,
/// the adapters and the drivers.
use thiserror::Error;

/// Comprehensive error type for SQLGate.
///
/// Covers:
/// - Driver failures (SQLite errors and driver-reported messages)
/// - Connection establishment that ran out of attempts
/// - Transaction recovery (rollback) and commit failures
/// - Configuration loading
#[derive(Error, Debug)]
pub enum SqlGateError {
    /// Errors raised by the SQLite driver
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Errors reported by any other driver
    #[error("Driver error: {0}")]
    Driver(String),

    /// No driver is registered under the requested name
    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    /// Every connection attempt failed
    #[error("Failed to connect to the database after {attempts} attempts")]
    ConnectFailed {
        attempts: u32,
        #[source]
        source: Option<Box<SqlGateError>>,
    },

    /// A query or transaction was issued without an open connection
    #[error("Database connection is not initialized")]
    NotConnected,

    /// A statement failed and the rollback that followed failed too
    #[error("transaction rollback error: {rollback}\noriginal error: {original}")]
    Rollback {
        rollback: Box<SqlGateError>,
        original: Box<SqlGateError>,
    },

    /// All statements succeeded but the commit did not
    #[error("transaction commit error: {0}")]
    Commit(Box<SqlGateError>),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors for unexpected conditions
    #[error("Application error: {0}")]
    App(String),
}

/// Type alias for Result to use SqlGateError as the error type.
pub type Result<T> = std::result::Result<T, SqlGateError>;
