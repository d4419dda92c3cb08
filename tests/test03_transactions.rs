use std::sync::Arc;

use futures_util::future::BoxFuture;
use sql_conduit::prelude::*;
use sql_conduit::transaction;

async fn ledger_pool(dir: &tempfile::TempDir, limit: usize) -> ConnectionPool {
    let db = dir.path().join("ledger.db");
    let pool = create_pool(
        Arc::new(SqliteDriver::new(db.to_string_lossy().into_owned())),
        &PoolSettings {
            connection_limit: limit,
        },
    )
    .unwrap();
    PooledConnection::new(&pool)
        .execute("CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount INTEGER)")
        .await
        .unwrap();
    pool
}

async fn count(pool: &ConnectionPool) -> i64 {
    let row = PooledConnection::new(pool)
        .query_one_required("SELECT COUNT(*) AS n FROM ledger", None)
        .await
        .unwrap();
    *row.get("n").unwrap().as_int().unwrap()
}

fn two_inserts(conn: &PooledConnection) -> BoxFuture<'_, Result<i64, ConduitError>> {
    Box::pin(async move {
        conn.execute(("INSERT INTO ledger (amount) VALUES (?)", vec![10.into()]))
            .await?;
        let second = conn
            .execute(("INSERT INTO ledger (amount) VALUES (?)", vec![20.into()]))
            .await?;
        Ok(second.insert_id)
    })
}

fn insert_then_fail(conn: &PooledConnection) -> BoxFuture<'_, Result<(), ConduitError>> {
    Box::pin(async move {
        conn.execute(("INSERT INTO ledger (amount) VALUES (?)", vec![99.into()]))
            .await?;
        conn.execute("INSERT INTO no_such_table VALUES (1)").await?;
        Ok(())
    })
}

fn nested_outer(conn: &PooledConnection) -> BoxFuture<'_, Result<(), ConduitError>> {
    Box::pin(async move {
        conn.execute(("INSERT INTO ledger (amount) VALUES (?)", vec![1.into()]))
            .await?;
        // Joins the open transaction on the same connection; no second BEGIN.
        transaction(nested_inner, conn, QueryOptions::default()).await?;
        Ok(())
    })
}

fn nested_inner(conn: &PooledConnection) -> BoxFuture<'_, Result<(), ConduitError>> {
    Box::pin(async move {
        assert!(conn.is_bound());
        conn.execute(("INSERT INTO ledger (amount) VALUES (?)", vec![2.into()]))
            .await?;
        Ok(())
    })
}

#[tokio::test]
async fn successful_transaction_commits_and_returns_the_closure_value() {
    let dir = tempfile::tempdir().unwrap();
    let pool = ledger_pool(&dir, 2).await;

    let last_id = transaction(two_inserts, &pool, QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(last_id, 2);
    assert_eq!(count(&pool).await, 2);
}

#[tokio::test]
async fn failed_transaction_rolls_back_everything() {
    let dir = tempfile::tempdir().unwrap();
    let pool = ledger_pool(&dir, 2).await;

    let err = transaction(insert_then_fail, &pool, QueryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConduitError::QueryFailed(_)));
    assert_eq!(count(&pool).await, 0);
}

#[tokio::test]
async fn connection_returns_to_the_pool_after_rollback() {
    let dir = tempfile::tempdir().unwrap();
    let pool = ledger_pool(&dir, 1).await;

    transaction(insert_then_fail, &pool, QueryOptions::default())
        .await
        .unwrap_err();

    // With a single-slot pool this would hang if the slot leaked.
    let id = transaction(two_inserts, &pool, QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(id, 2);
    assert_eq!(count(&pool).await, 2);
}

#[tokio::test]
async fn nested_transaction_joins_the_outer_scope() {
    let dir = tempfile::tempdir().unwrap();
    let pool = ledger_pool(&dir, 1).await;

    transaction(nested_outer, &pool, QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(count(&pool).await, 2);
}

#[tokio::test]
async fn transaction_accepts_a_pool_backed_connection() {
    let dir = tempfile::tempdir().unwrap();
    let pool = ledger_pool(&dir, 2).await;
    let conn = PooledConnection::new(&pool);

    transaction(two_inserts, &conn, QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(count(&pool).await, 2);
}
