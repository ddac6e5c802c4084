/// # Test Utilities Module
///
/// Scripted driver doubles and a recording sleeper for exercising the
/// adapters without a real database or real waiting.
///
/// This module provides:
/// - `Script`: shared call log plus the failures to inject
/// - `ScriptedDriver`, `ScriptedConnection`: driver doubles that obey a script
/// - `RecordingSleeper`: remembers requested delays instead of sleeping

use crate::core::db::{Row, Rows, Sleeper, Value};
use crate::core::{Result, SqlGateError};
use crate::driver::{Connection, Driver, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A primitive invoked on a scripted driver
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open(String),
    Query(String, Vec<Value>),
    Exec(String, Vec<Value>),
    Begin,
    Commit,
    Rollback,
    Close,
}

#[derive(Debug, Clone)]
enum Matcher {
    Text(String),
    Arg(Value),
}

impl Matcher {
    fn matches(&self, sql: &str, args: &[Value]) -> bool {
        match self {
            Matcher::Text(text) => text == sql,
            Matcher::Arg(value) => args.contains(value),
        }
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    calls: Vec<Call>,
    open_failures: u32,
    failed_opens: u32,
    statement_failures: Vec<(Matcher, String)>,
    begin_error: Option<String>,
    commit_error: Option<String>,
    rollback_error: Option<String>,
    rows: Option<(Vec<String>, Vec<Vec<Value>>)>,
}

/// Call log and failure plan shared by every double built from it
#[derive(Debug, Clone, Default)]
pub struct Script {
    state: Arc<Mutex<ScriptState>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The first `n` opens fail with "connection refused"
    pub fn fail_opens(self, n: u32) -> Self {
        self.state().open_failures = n;
        self
    }

    /// Statements with exactly this text fail
    pub fn fail_statement(self, sql: &str, message: &str) -> Self {
        self.state()
            .statement_failures
            .push((Matcher::Text(sql.to_string()), message.to_string()));
        self
    }

    /// Statements bound to this argument fail
    pub fn fail_exec_with_arg(self, arg: Value, message: &str) -> Self {
        self.state()
            .statement_failures
            .push((Matcher::Arg(arg), message.to_string()));
        self
    }

    pub fn fail_begin(self, message: &str) -> Self {
        self.state().begin_error = Some(message.to_string());
        self
    }

    pub fn fail_commit(self, message: &str) -> Self {
        self.state().commit_error = Some(message.to_string());
        self
    }

    pub fn fail_rollback(self, message: &str) -> Self {
        self.state().rollback_error = Some(message.to_string());
        self
    }

    /// Rows returned by every successful query
    pub fn with_rows(self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.state().rows = Some((columns, rows));
        self
    }

    /// Every call recorded so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Number of recorded calls matching `pred`
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }

    fn check_statement(&self, sql: &str, args: &[Value]) -> Result<()> {
        let state = self.state();
        match state
            .statement_failures
            .iter()
            .find(|(matcher, _)| matcher.matches(sql, args))
        {
            Some((_, message)) => Err(SqlGateError::Driver(message.clone())),
            None => Ok(()),
        }
    }

    fn rows(&self) -> Rows {
        match &self.state().rows {
            Some((columns, rows)) => Rows::new(
                columns.clone(),
                rows.iter().cloned().map(Row::new).collect(),
            ),
            None => Rows::empty(),
        }
    }
}

fn fail_if(error: &Option<String>) -> Result<()> {
    match error {
        Some(message) => Err(SqlGateError::Driver(message.clone())),
        None => Ok(()),
    }
}

/// Driver double registered as `scripted`
#[derive(Debug, Clone)]
pub struct ScriptedDriver {
    script: Script,
}

impl ScriptedDriver {
    pub fn new(script: Script) -> Self {
        ScriptedDriver { script }
    }
}

impl Driver for ScriptedDriver {
    fn name(&self) -> &str {
        "scripted"
    }

    fn open(&self, connection_string: &str) -> Result<Box<dyn Connection>> {
        self.script.record(Call::Open(connection_string.to_string()));
        {
            let mut state = self.script.state();
            if state.failed_opens < state.open_failures {
                state.failed_opens += 1;
                return Err(SqlGateError::Driver("connection refused".to_string()));
            }
        }
        Ok(Box::new(ScriptedConnection::new(self.script.clone())))
    }
}

/// Connection double that records and fails according to its script
#[derive(Debug, Clone)]
pub struct ScriptedConnection {
    script: Script,
}

impl ScriptedConnection {
    pub fn new(script: Script) -> Self {
        ScriptedConnection { script }
    }
}

impl Connection for ScriptedConnection {
    fn query(&self, sql: &str, args: &[Value]) -> Result<Rows> {
        self.script.record(Call::Query(sql.to_string(), args.to_vec()));
        self.script.check_statement(sql, args)?;
        Ok(self.script.rows())
    }

    fn exec(&self, sql: &str, args: &[Value]) -> Result<usize> {
        self.script.record(Call::Exec(sql.to_string(), args.to_vec()));
        self.script.check_statement(sql, args)?;
        Ok(1)
    }

    fn begin(&self) -> Result<Box<dyn Transaction + '_>> {
        self.script.record(Call::Begin);
        fail_if(&self.script.state().begin_error)?;
        Ok(Box::new(ScriptedTransaction {
            script: self.script.clone(),
        }))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.script.record(Call::Close);
        Ok(())
    }
}

struct ScriptedTransaction {
    script: Script,
}

impl Transaction for ScriptedTransaction {
    fn exec(&mut self, sql: &str, args: &[Value]) -> Result<usize> {
        self.script.record(Call::Exec(sql.to_string(), args.to_vec()));
        self.script.check_statement(sql, args)?;
        Ok(1)
    }

    fn query(&mut self, sql: &str, args: &[Value]) -> Result<Rows> {
        self.script.record(Call::Query(sql.to_string(), args.to_vec()));
        self.script.check_statement(sql, args)?;
        Ok(self.script.rows())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.script.record(Call::Commit);
        fail_if(&self.script.state().commit_error)
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.script.record(Call::Rollback);
        fail_if(&self.script.state().rollback_error)
    }
}

/// Sleeper that records each requested delay and returns at once
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(duration);
    }
}
