/// Transaction Execution Module
///
/// Runs an ordered batch of queries as one atomic unit. Exactly one of
/// commit or rollback ends every transaction this module begins.

use super::Query;
use crate::core::{Result, SqlGateError};
use crate::driver::Connection;
use tracing::{debug, warn};

/// Executes `queries` in order inside a single transaction.
///
/// - If the transaction cannot begin, that error is returned and nothing runs.
/// - The first failing statement stops the batch and triggers a rollback;
///   its error is returned, or `SqlGateError::Rollback` if the rollback
///   fails as well.
/// - Otherwise the transaction is committed; a failed commit is returned as
///   `SqlGateError::Commit`.
pub fn execute_transaction(conn: &dyn Connection, queries: &[Query]) -> Result<()> {
    debug!("Running transaction of {} statements", queries.len());
    let mut tx = conn.begin()?;

    for (index, query) in queries.iter().enumerate() {
        if let Err(original) = tx.exec(query.text(), query.args()) {
            warn!("Transaction failed at statement {}: {}", index + 1, original);
            return match tx.rollback() {
                Ok(()) => Err(original),
                Err(rollback) => Err(SqlGateError::Rollback {
                    rollback: Box::new(rollback),
                    original: Box::new(original),
                }),
            };
        }
    }

    tx.commit()
        .map_err(|e| SqlGateError::Commit(Box::new(e)))
}
