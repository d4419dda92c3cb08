//! Embedded `SQLite` driver.
//!
//! rusqlite is synchronous, so every call hops to the blocking pool while
//! holding the connection's mutex. Result-shape classification is exact:
//! a prepared statement with at least one result column is SELECT-shaped,
//! anything else is a mutation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection as SqliteConnectionType;
use tracing::debug;

use crate::error::ConduitError;
use crate::pool::MAX_PREPARED_STATEMENTS;
use crate::results::Row;
use crate::types::SqlParam;

use super::{Driver, DriverConnection, DriverOutput, MutationSummary};

/// Connection factory for a `SQLite` database file (or URI such as
/// `file::memory:?cache=shared`).
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    database: String,
}

impl SqliteDriver {
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    async fn connect(&self) -> Result<Box<dyn DriverConnection>, ConduitError> {
        let database = self.database.clone();
        let conn = run_blocking(move || {
            let conn = SqliteConnectionType::open(&database)?;
            conn.set_prepared_statement_cache_capacity(MAX_PREPARED_STATEMENTS);
            // Writers from sibling pooled connections wait instead of
            // surfacing SQLITE_BUSY.
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(conn)
        })
        .await?;
        debug!(database = %self.database, "sqlite connection opened");
        Ok(Box::new(SqliteDriverConnection {
            conn: Arc::new(Mutex::new(conn)),
        }))
    }
}

struct SqliteDriverConnection {
    conn: Arc<Mutex<SqliteConnectionType>>,
}

impl SqliteDriverConnection {
    async fn run_batch(&mut self, sql: &'static str) -> Result<(), ConduitError> {
        let conn = Arc::clone(&self.conn);
        run_blocking(move || {
            let conn = lock(&conn)?;
            conn.execute_batch(sql)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl DriverConnection for SqliteDriverConnection {
    async fn exec(&mut self, sql: &str, args: &[SqlParam]) -> Result<DriverOutput, ConduitError> {
        let sql = sql.to_owned();
        let values = convert_params(args)?;
        let conn = Arc::clone(&self.conn);
        run_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare_cached(&sql)?;
            if stmt.column_count() > 0 {
                let names = Arc::new(
                    stmt.column_names()
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>(),
                );
                let mut rows = stmt.query(rusqlite::params_from_iter(values))?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut row_values = Vec::with_capacity(names.len());
                    for idx in 0..names.len() {
                        row_values.push(value_from_sqlite(row.get_ref(idx)?));
                    }
                    out.push(Row::new(Arc::clone(&names), row_values));
                }
                Ok(DriverOutput::Rows(out))
            } else {
                let affected = stmt.execute(rusqlite::params_from_iter(values))?;
                Ok(DriverOutput::Mutation(MutationSummary {
                    affected_rows: affected as u64,
                    insert_id: conn.last_insert_rowid(),
                }))
            }
        })
        .await
    }

    async fn begin(&mut self) -> Result<(), ConduitError> {
        self.run_batch("BEGIN").await
    }

    async fn commit(&mut self) -> Result<(), ConduitError> {
        self.run_batch("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), ConduitError> {
        self.run_batch("ROLLBACK").await
    }

    async fn init_session(&mut self) -> Result<(), ConduitError> {
        // SQLite's closest analog of READ-COMMITTED session isolation.
        self.run_batch("PRAGMA read_uncommitted = 0").await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, ConduitError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ConduitError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ConduitError::Connection(format!("sqlite worker task failed: {e}")))?
}

fn lock(
    conn: &Arc<Mutex<SqliteConnectionType>>,
) -> Result<std::sync::MutexGuard<'_, SqliteConnectionType>, ConduitError> {
    conn.lock()
        .map_err(|_| ConduitError::Connection("sqlite connection mutex poisoned".to_string()))
}

/// Convert bound parameters to rusqlite values.
fn convert_params(params: &[SqlParam]) -> Result<Vec<rusqlite::types::Value>, ConduitError> {
    let mut values = Vec::with_capacity(params.len());
    for param in params {
        values.push(match param {
            SqlParam::Int(i) => rusqlite::types::Value::Integer(*i),
            SqlParam::Float(f) => rusqlite::types::Value::Real(*f),
            SqlParam::Text(s) => rusqlite::types::Value::Text(s.clone()),
            SqlParam::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
            SqlParam::Timestamp(dt) => {
                rusqlite::types::Value::Text(dt.format("%F %T%.f").to_string())
            }
            SqlParam::Null => rusqlite::types::Value::Null,
            SqlParam::Json(j) => rusqlite::types::Value::Text(j.to_string()),
            SqlParam::Blob(bytes) => rusqlite::types::Value::Blob(bytes.clone()),
            SqlParam::List(_) => {
                return Err(ConduitError::Parameter(
                    "list parameters must be expanded by the statement builder".to_string(),
                ));
            }
        });
    }
    Ok(values)
}

fn value_from_sqlite(value: rusqlite::types::ValueRef<'_>) -> SqlParam {
    match value {
        rusqlite::types::ValueRef::Null => SqlParam::Null,
        rusqlite::types::ValueRef::Integer(i) => SqlParam::Int(i),
        rusqlite::types::ValueRef::Real(f) => SqlParam::Float(f),
        rusqlite::types::ValueRef::Text(bytes) => {
            SqlParam::Text(String::from_utf8_lossy(bytes).into_owned())
        }
        rusqlite::types::ValueRef::Blob(bytes) => SqlParam::Blob(bytes.to_vec()),
    }
}
