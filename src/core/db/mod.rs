/// Database Module
///
/// This module provides the database capabilities of SQLGate, organized
/// into focused submodules.
///
/// ## Architecture
///
/// - **Capabilities** (this file): `Queryable` for init/close/query and
///   `Transactional` for adapters that also run transactions
/// - **Connection Management** (`connection.rs`): the production adapter with
///   its retrying connect
/// - **Retry** (`retry.rs`): backoff schedule and sleeping
/// - **Transactions** (`transaction.rs`): the commit/rollback protocol
/// - **Mock** (`mock.rs`): adapter wrapping an already open connection
/// - **Queries** (`query.rs`): `Query` values and the `Rows` cursor
///
/// ## Error Handling
///
/// All operations return the crate-wide `SqlGateError`. Running out of
/// connection attempts is reported from `init` as
/// `SqlGateError::ConnectFailed`; deciding to exit is left to the caller.
pub mod connection;
pub mod mock;
pub mod query;
pub mod retry;
pub mod transaction;

pub use connection::{ConnectionState, SqlDatabase};
pub use mock::MockDatabase;
pub use query::{format_value, Query, Row, Rows, Value};
pub use retry::{Backoff, Sleeper, ThreadSleeper};
pub use transaction::execute_transaction;

use crate::core::Result;
use crate::driver::Transaction;

/// Minimal database capability: connect, query, disconnect
pub trait Queryable {
    /// Establishes the connection
    fn init(&mut self, driver: &str, connection_string: &str, max_retries: u32) -> Result<()>;

    /// Releases the connection; a no-op when there is none
    fn close(&mut self) -> Result<()>;

    /// Runs a statement with positional arguments and hands back its cursor
    fn run_query(&self, query: &str, args: &[Value]) -> Result<Rows>;

    /// Runs a prepared `Query` value
    fn run(&self, query: &Query) -> Result<Rows> {
        self.run_query(query.text(), query.args())
    }
}

/// Capability for adapters that can run atomic units of work
pub trait Transactional: Queryable {
    /// Runs every query in order, atomically
    fn run_transaction(&self, queries: &[Query]) -> Result<()>;

    /// Starts a transaction the caller drives step by step
    fn begin_transaction(&self) -> Result<Box<dyn Transaction + '_>>;
}
