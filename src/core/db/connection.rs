/// Connection Management Module
///
/// This module provides the production adapter: driver selection, the
/// retrying connect, and query/transaction execution over the established
/// connection.

use super::retry::{Backoff, Sleeper, ThreadSleeper};
use super::transaction::execute_transaction;
use super::{Query, Queryable, Rows, Transactional, Value};
use crate::core::{Result, SqlGateError};
use crate::driver::{Connection, DriverRegistry, Transaction};
use std::sync::Arc;
use tracing::{info, warn};

/// Represents connection establishment states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been established (or it was closed)
    Disconnected,
    /// Connection attempts in progress
    Connecting,
    /// Connection established
    Connected,
    /// Every attempt failed
    Failed,
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

/// Production database adapter.
///
/// Owns its connection; share it by reference (or `Arc`) once `init` has
/// succeeded.
pub struct SqlDatabase {
    registry: DriverRegistry,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
    connection: Option<Box<dyn Connection>>,
    state: ConnectionState,
}

impl SqlDatabase {
    /// Creates an adapter using the built-in drivers
    pub fn new() -> Self {
        Self::with_registry(DriverRegistry::with_defaults())
    }

    /// Creates an adapter resolving driver names through `registry`
    pub fn with_registry(registry: DriverRegistry) -> Self {
        SqlDatabase {
            registry,
            backoff: Backoff::default(),
            sleeper: Arc::new(ThreadSleeper),
            connection: None,
            state: ConnectionState::default(),
        }
    }

    /// Replaces the backoff schedule
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replaces how the adapter waits between attempts
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn conn(&self) -> Result<&dyn Connection> {
        self.connection.as_deref().ok_or(SqlGateError::NotConnected)
    }
}

impl Default for SqlDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SqlDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlDatabase")
            .field("registry", &self.registry)
            .field("backoff", &self.backoff)
            .field("state", &self.state)
            .finish()
    }
}

impl Queryable for SqlDatabase {
    /// Connects, retrying up to `max_retries` times.
    ///
    /// Attempt `n` that fails is followed by a `2^n` unit wait. When no
    /// attempt succeeds the adapter ends up `Failed` and
    /// `SqlGateError::ConnectFailed` is returned; `max_retries == 0` fails
    /// without trying. A connection from an earlier `init` is closed first.
    fn init(&mut self, driver: &str, connection_string: &str, max_retries: u32) -> Result<()> {
        let driver = self.registry.get(driver)?;
        if let Some(previous) = self.connection.take() {
            info!("Closing previous database connection before reconnecting");
            if let Err(e) = previous.close() {
                warn!("Failed to close previous database connection: {}", e);
            }
        }
        self.state = ConnectionState::Connecting;

        let mut last_error = None;
        for attempt in 1..=max_retries {
            match driver.open(connection_string) {
                Ok(conn) => {
                    info!("Connected to the database successfully");
                    self.connection = Some(conn);
                    self.state = ConnectionState::Connected;
                    return Ok(());
                }
                Err(e) => {
                    warn!("Attempt {}: Failed to connect to the DB: {}", attempt, e);
                    let delay = self.backoff.delay(attempt);
                    warn!("Attempt {}: Retrying in {:?}...", attempt, delay);
                    self.sleeper.sleep(delay);
                    last_error = Some(Box::new(e));
                }
            }
        }

        self.state = ConnectionState::Failed;
        Err(SqlGateError::ConnectFailed {
            attempts: max_retries,
            source: last_error,
        })
    }

    fn close(&mut self) -> Result<()> {
        self.state = ConnectionState::Disconnected;
        match self.connection.take() {
            Some(conn) => {
                info!("Closing database connection");
                conn.close()
            }
            None => Ok(()),
        }
    }

    fn run_query(&self, query: &str, args: &[Value]) -> Result<Rows> {
        self.conn()?.query(query, args)
    }
}

impl Transactional for SqlDatabase {
    fn run_transaction(&self, queries: &[Query]) -> Result<()> {
        execute_transaction(self.conn()?, queries)
    }

    fn begin_transaction(&self) -> Result<Box<dyn Transaction + '_>> {
        self.conn()?.begin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Call, RecordingSleeper, Script, ScriptedDriver};
    use std::time::Duration;

    fn scripted(script: &Script) -> (SqlDatabase, RecordingSleeper) {
        let mut registry = DriverRegistry::new();
        registry.register(Arc::new(ScriptedDriver::new(script.clone())));
        let sleeper = RecordingSleeper::new();
        let db = SqlDatabase::with_registry(registry).sleeper(Arc::new(sleeper.clone()));
        (db, sleeper)
    }

    fn opens(script: &Script) -> usize {
        script.count(|c| matches!(c, Call::Open(_)))
    }

    #[test]
    fn test_starts_disconnected() {
        let db = SqlDatabase::new();
        assert_eq!(db.state(), ConnectionState::Disconnected);
        assert!(!db.is_connected());
    }

    #[test]
    fn test_first_attempt_success_does_not_sleep() {
        let script = Script::new();
        let (mut db, sleeper) = scripted(&script);

        db.init("scripted", "db://primary", 5).unwrap();

        assert_eq!(db.state(), ConnectionState::Connected);
        assert_eq!(script.calls(), vec![Call::Open("db://primary".into())]);
        assert!(sleeper.sleeps().is_empty());
    }

    #[test]
    fn test_succeeds_after_failures() {
        let script = Script::new().fail_opens(2);
        let (mut db, sleeper) = scripted(&script);

        db.init("scripted", "db://primary", 5).unwrap();

        assert_eq!(opens(&script), 3);
        assert_eq!(db.state(), ConnectionState::Connected);
        assert_eq!(
            sleeper.sleeps(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn test_exhausted_retries() {
        let script = Script::new().fail_opens(u32::MAX);
        let (mut db, sleeper) = scripted(&script);

        let err = db.init("scripted", "db://primary", 3).unwrap_err();

        match &err {
            SqlGateError::ConnectFailed { attempts, source } => {
                assert_eq!(*attempts, 3);
                assert!(source.is_some());
            }
            other => panic!("Expected ConnectFailed, got {}", other),
        }
        assert_eq!(opens(&script), 3);
        assert_eq!(
            sleeper.sleeps(),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
        assert_eq!(db.state(), ConnectionState::Failed);
        assert!(!db.is_connected());
    }

    #[test]
    fn test_zero_retries_never_attempts() {
        let script = Script::new();
        let (mut db, sleeper) = scripted(&script);

        let err = db.init("scripted", "db://primary", 0).unwrap_err();

        assert!(matches!(err, SqlGateError::ConnectFailed { attempts: 0, source: None }));
        assert!(script.calls().is_empty());
        assert!(sleeper.sleeps().is_empty());
        assert_eq!(db.state(), ConnectionState::Failed);
    }

    #[test]
    fn test_unknown_driver_fails_before_connecting() {
        let script = Script::new();
        let (mut db, sleeper) = scripted(&script);

        let err = db.init("oracle", "db://primary", 3).unwrap_err();

        assert!(matches!(err, SqlGateError::UnknownDriver(_)));
        assert!(script.calls().is_empty());
        assert!(sleeper.sleeps().is_empty());
        assert_eq!(db.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_query_passes_text_and_args_through() {
        let script = Script::new().with_rows(&["n"], vec![vec![Value::Integer(42)]]);
        let (mut db, _) = scripted(&script);
        db.init("scripted", "db", 1).unwrap();

        let query = Query::new("INSERT INTO t VALUES ($1)", [42i64]);
        let mut rows = db.run(&query).unwrap();

        assert_eq!(rows.next().unwrap().get(0), Some(&Value::Integer(42)));
        assert_eq!(
            script.calls().last(),
            Some(&Call::Query(
                "INSERT INTO t VALUES ($1)".into(),
                vec![Value::Integer(42)]
            ))
        );
    }

    #[test]
    fn test_query_error_is_returned() {
        let script = Script::new().fail_statement("SELECT * FROM missing", "no such table: missing");
        let (mut db, _) = scripted(&script);
        db.init("scripted", "db", 1).unwrap();

        let err = db.run_query("SELECT * FROM missing", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Driver error: no such table: missing");
    }

    #[test]
    fn test_operations_require_connection() {
        let db = SqlDatabase::new();

        assert!(matches!(db.run_query("SELECT 1", &[]), Err(SqlGateError::NotConnected)));
        assert!(matches!(db.run_transaction(&[]), Err(SqlGateError::NotConnected)));
        assert!(matches!(db.begin_transaction(), Err(SqlGateError::NotConnected)));
    }

    #[test]
    fn test_run_transaction_commits() {
        let script = Script::new();
        let (mut db, _) = scripted(&script);
        db.init("scripted", "db", 1).unwrap();

        db.run_transaction(&[Query::text_only("UPDATE t SET n = n + 1")])
            .unwrap();

        assert_eq!(script.count(|c| matches!(c, Call::Commit)), 1);
        assert_eq!(script.count(|c| matches!(c, Call::Rollback)), 0);
    }

    #[test]
    fn test_begin_transaction_gives_caller_control() {
        let script = Script::new();
        let (mut db, _) = scripted(&script);
        db.init("scripted", "db", 1).unwrap();

        let mut tx = db.begin_transaction().unwrap();
        tx.exec("DELETE FROM t", &[]).unwrap();
        tx.rollback().unwrap();

        assert_eq!(
            script.calls()[1..].to_vec(),
            vec![Call::Begin, Call::Exec("DELETE FROM t".into(), vec![]), Call::Rollback]
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        let script = Script::new();
        let (mut db, _) = scripted(&script);
        db.init("scripted", "db", 1).unwrap();

        db.close().unwrap();
        db.close().unwrap();

        assert_eq!(script.count(|c| matches!(c, Call::Close)), 1);
        assert_eq!(db.state(), ConnectionState::Disconnected);
        assert!(matches!(db.run_query("SELECT 1", &[]), Err(SqlGateError::NotConnected)));
    }

    #[test]
    fn test_close_without_init() {
        let mut db = SqlDatabase::new();
        assert!(db.close().is_ok());
    }

    #[test]
    fn test_failed_reinit_drops_previous_connection() {
        let mut db = SqlDatabase::new().sleeper(Arc::new(RecordingSleeper::new()));
        db.init("sqlite", ":memory:", 1).unwrap();
        assert!(db.is_connected());

        let err = db.init("sqlite", "/nonexistent/dir/x.db", 1).unwrap_err();

        assert!(matches!(err, SqlGateError::ConnectFailed { attempts: 1, .. }));
        assert_eq!(db.state(), ConnectionState::Failed);
        assert!(!db.is_connected());
        assert!(matches!(db.run_query("SELECT 1", &[]), Err(SqlGateError::NotConnected)));
    }

    #[test]
    fn test_reinit_closes_previous_connection() {
        let script = Script::new();
        let (mut db, _) = scripted(&script);
        db.init("scripted", "db://first", 1).unwrap();
        db.init("scripted", "db://second", 1).unwrap();

        assert_eq!(
            script.calls(),
            vec![
                Call::Open("db://first".into()),
                Call::Close,
                Call::Open("db://second".into()),
            ]
        );
        assert_eq!(db.state(), ConnectionState::Connected);
    }
}
