/// SQLite Driver Module
///
/// rusqlite-backed implementation of the driver traits. A single
/// `rusqlite::Connection` sits behind a mutex; a transaction keeps the lock
/// for its whole lifetime and drives `BEGIN`/`COMMIT`/`ROLLBACK` itself.
/// The thread owning an open transaction is recorded so that its own direct
/// statements fail fast instead of deadlocking on the lock.

use super::{Connection, Driver, Transaction};
use crate::core::db::{Row, Rows, Value};
use crate::core::{Result, SqlGateError};
use rusqlite::params_from_iter;
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

/// Driver for SQLite databases.
///
/// Connection strings are file paths, `:memory:`, or `file:` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn open(&self, connection_string: &str) -> Result<Box<dyn Connection>> {
        let conn = SqliteConnection::open(connection_string)?;
        Ok(Box::new(conn))
    }
}

/// Shared SQLite session
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
    /// Thread running an open transaction, if any
    tx_owner: Mutex<Option<ThreadId>>,
}

impl SqliteConnection {
    /// Opens a database and applies the session pragmas
    pub fn open(connection_string: &str) -> Result<Self> {
        debug!("Opening SQLite database {}", connection_string);
        let conn = rusqlite::Connection::open(connection_string)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps a connection that is already open
    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        SqliteConnection {
            conn: Mutex::new(conn),
            tx_owner: Mutex::new(None),
        }
    }

    /// Locks the connection for a direct statement.
    ///
    /// Fails instead of blocking when this thread already holds the lock
    /// through an open transaction.
    fn lock(&self) -> Result<MutexGuard<'_, rusqlite::Connection>> {
        if *lock_owner(&self.tx_owner)? == Some(thread::current().id()) {
            return Err(SqlGateError::App(
                "connection is held by an open transaction on this thread".to_string(),
            ));
        }
        self.conn
            .lock()
            .map_err(|_| SqlGateError::App("Failed to acquire database lock".to_string()))
    }
}

fn lock_owner(owner: &Mutex<Option<ThreadId>>) -> Result<MutexGuard<'_, Option<ThreadId>>> {
    owner
        .lock()
        .map_err(|_| SqlGateError::App("Failed to acquire database lock".to_string()))
}

impl Connection for SqliteConnection {
    fn query(&self, sql: &str, args: &[Value]) -> Result<Rows> {
        let conn = self.lock()?;
        query_rows(&conn, sql, args)
    }

    fn exec(&self, sql: &str, args: &[Value]) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute(sql, params_from_iter(args.iter()))?)
    }

    /// Starts a transaction.
    ///
    /// The connection stays locked until the transaction ends. Other threads
    /// wait for it; the owning thread gets an error from direct statements.
    fn begin(&self) -> Result<Box<dyn Transaction + '_>> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN")?;
        *lock_owner(&self.tx_owner)? = Some(thread::current().id());
        Ok(Box::new(SqliteTransaction {
            conn,
            owner: &self.tx_owner,
            rolled_back: false,
        }))
    }

    fn close(self: Box<Self>) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| SqlGateError::App("Failed to acquire database lock".to_string()))?;
        conn.close().map_err(|(_, e)| SqlGateError::Database(e))
    }
}

/// Transaction holding the connection lock
pub struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, rusqlite::Connection>,
    owner: &'a Mutex<Option<ThreadId>>,
    rolled_back: bool,
}

impl Transaction for SqliteTransaction<'_> {
    fn exec(&mut self, sql: &str, args: &[Value]) -> Result<usize> {
        Ok(self.conn.execute(sql, params_from_iter(args.iter()))?)
    }

    fn query(&mut self, sql: &str, args: &[Value]) -> Result<Rows> {
        query_rows(&self.conn, sql, args)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        Ok(self.conn.execute_batch("COMMIT")?)
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.rolled_back = true;
        Ok(self.conn.execute_batch("ROLLBACK")?)
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        // Still inside BEGIN without an explicit rollback: never committed,
        // or COMMIT failed and left the transaction open (go-sqlite3 does
        // the same after a failed commit).
        if !self.rolled_back && !self.conn.is_autocommit() {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("Rollback of abandoned transaction failed: {}", e);
            }
        }
        match self.owner.lock() {
            Ok(mut owner) => *owner = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

fn query_rows(conn: &rusqlite::Connection, sql: &str, args: &[Value]) -> Result<Rows> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let column_count = columns.len();

    let mut rows = stmt.query(params_from_iter(args.iter()))?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(row.get::<_, Value>(i)?);
        }
        collected.push(Row::new(values));
    }

    Ok(Rows::new(columns, collected))
}
