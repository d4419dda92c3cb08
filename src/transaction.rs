//! Transaction scoping with automatic rollback.
//!
//! [`transaction`] checks out one physical connection, opens a transaction on
//! it, and hands the caller a bound [`PooledConnection`]. Every statement the
//! closure issues through that wrapper lands on the same connection. Success
//! commits, failure rolls back, and in both paths the connection returns to
//! the pool exactly once.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::error;

use crate::connection::{Connector, PooledConnection, QueryOptions};
use crate::error::ConduitError;

/// Run `work` inside a transaction.
///
/// When the connector is already a bound connection (a nested call inside an
/// open transaction), `work` runs against it directly with no second
/// begin/commit; the outermost scope owns the transaction boundary.
///
/// When the closure fails, the transaction is rolled back and the closure's
/// error is returned; a rollback failure is logged but does not mask it. When
/// the commit itself fails, a rollback is attempted and the commit error is
/// returned.
///
/// # Errors
/// Checkout and begin failures propagate as-is, then the closure's error or
/// the commit error as described above.
pub async fn transaction<'a, T, F>(
    work: F,
    connector: impl Into<Connector<'a>>,
    options: QueryOptions,
) -> Result<T, ConduitError>
where
    F: for<'c> FnOnce(&'c PooledConnection) -> BoxFuture<'c, Result<T, ConduitError>>,
{
    let pool = match connector.into() {
        Connector::Connection(conn) => match conn.pool() {
            // A pool-backed wrapper: start a fresh transaction on its pool.
            Some(pool) => pool.clone(),
            // Already inside a transaction: join it.
            None => return work(conn).await,
        },
        Connector::Pool(pool) => pool.clone(),
    };

    let mut slot = pool.checkout().await?;
    slot.begin().await?;

    let slot = Arc::new(Mutex::new(slot));
    let bound = PooledConnection::bound(Arc::clone(&slot), options);

    match work(&bound).await {
        Ok(value) => {
            drop(bound);
            let mut guard = slot.lock().await;
            match guard.commit().await {
                Ok(()) => Ok(value),
                Err(commit_err) => {
                    error!("transaction commit failed: {commit_err}");
                    if let Err(rollback_err) = guard.rollback().await {
                        error!("rollback after failed commit also failed: {rollback_err}");
                    }
                    Err(commit_err)
                }
            }
        }
        Err(work_err) => {
            error!("transaction failed, rolling back: {work_err}");
            drop(bound);
            let mut guard = slot.lock().await;
            if let Err(rollback_err) = guard.rollback().await {
                error!("rollback failed: {rollback_err}");
            }
            Err(work_err)
        }
    }
    // `slot` drops here, returning the connection to the pool.
}
