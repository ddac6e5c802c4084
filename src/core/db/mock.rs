/// Mock Adapter Module
///
/// An adapter built around a connection the test has already opened. It
/// skips driver lookup and retries entirely.

use super::transaction::execute_transaction;
use super::{Query, Queryable, Rows, Transactional, Value};
use crate::core::{Result, SqlGateError};
use crate::driver::{Connection, Transaction};

/// Adapter over an injected connection
pub struct MockDatabase {
    connection: Option<Box<dyn Connection>>,
}

impl MockDatabase {
    pub fn new(connection: Box<dyn Connection>) -> Self {
        MockDatabase {
            connection: Some(connection),
        }
    }

    fn conn(&self) -> Result<&dyn Connection> {
        self.connection.as_deref().ok_or(SqlGateError::NotConnected)
    }
}

impl std::fmt::Debug for MockDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDatabase")
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

impl Queryable for MockDatabase {
    /// Accepts anything; the connection is already open.
    fn init(&mut self, _driver: &str, _connection_string: &str, _max_retries: u32) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(conn) => conn.close(),
            None => Ok(()),
        }
    }

    fn run_query(&self, query: &str, args: &[Value]) -> Result<Rows> {
        self.conn()?.query(query, args)
    }
}

impl Transactional for MockDatabase {
    fn run_transaction(&self, queries: &[Query]) -> Result<()> {
        execute_transaction(self.conn()?, queries)
    }

    fn begin_transaction(&self) -> Result<Box<dyn Transaction + '_>> {
        self.conn()?.begin()
    }
}
