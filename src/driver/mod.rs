//! Driver layer: the primitives the adapters are built on.
//!
//! A `Driver` opens a `Connection`; a connection runs statements and begins
//! `Transaction`s. Terminal transaction actions take the boxed handle by
//! value, so a handle can be committed or rolled back at most once.

pub mod sqlite;

use crate::core::db::{Rows, Value};
use crate::core::{Result, SqlGateError};
use std::collections::HashMap;
use std::sync::Arc;

pub use sqlite::SqliteDriver;

/// Opens connections for one kind of database
pub trait Driver: Send + Sync {
    /// Name the driver is registered under by default
    fn name(&self) -> &str;

    /// Opens a connection described by a driver-specific connection string
    fn open(&self, connection_string: &str) -> Result<Box<dyn Connection>>;
}

/// An open database session, safe to share between callers
pub trait Connection: Send + Sync {
    /// Runs a statement and returns its result cursor
    fn query(&self, sql: &str, args: &[Value]) -> Result<Rows>;

    /// Runs a statement and returns the number of affected rows
    fn exec(&self, sql: &str, args: &[Value]) -> Result<usize>;

    /// Starts a transaction on this connection
    fn begin(&self) -> Result<Box<dyn Transaction + '_>>;

    /// Closes the session
    fn close(self: Box<Self>) -> Result<()>;
}

/// An in-flight unit of work.
///
/// Dropping a transaction without committing rolls it back.
pub trait Transaction {
    fn exec(&mut self, sql: &str, args: &[Value]) -> Result<usize>;

    fn query(&mut self, sql: &str, args: &[Value]) -> Result<Rows>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}

/// Drivers addressable by name
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in drivers (`sqlite`, `sqlite3`)
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let sqlite: Arc<dyn Driver> = Arc::new(SqliteDriver);
        registry.register_as("sqlite3", Arc::clone(&sqlite));
        registry.register(sqlite);
        registry
    }

    /// Registers a driver under its own name, replacing any previous one
    pub fn register(&mut self, driver: Arc<dyn Driver>) {
        let name = driver.name().to_string();
        self.drivers.insert(name, driver);
    }

    /// Registers a driver under an alias
    pub fn register_as(&mut self, name: impl Into<String>, driver: Arc<dyn Driver>) {
        self.drivers.insert(name.into(), driver);
    }

    /// Looks up a driver by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Driver>> {
        self.drivers
            .get(name)
            .cloned()
            .ok_or_else(|| SqlGateError::UnknownDriver(name.to_string()))
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}
