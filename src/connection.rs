//! Pooled connection wrapper and the query/execute contract.
//!
//! [`PooledConnection`] exposes one uniform API whether it wraps the shared
//! pool (each call checks out its own physical connection) or a single bound
//! connection held open by a transaction (calls serialize on that
//! connection). `query` insists on a SELECT-shaped result and `execute` on a
//! mutation summary; crossing them is a [`ConduitError::ShapeMismatch`], not
//! a silent coercion.

use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt, stream};
use tokio::sync::Mutex;
use tracing::{Level, debug, error, info, trace, warn};

use crate::driver::{DriverOutput, MutationSummary};
use crate::error::ConduitError;
use crate::format::format_sql;
use crate::pool::{ConnectionPool, PooledSlot};
use crate::results::{Row, apply_blob_encoding};
use crate::template::{IntoStatement, Statement};

/// Upper bound on simultaneously in-flight statements for the batch helpers.
pub const BATCH_CONCURRENCY: usize = 50;

const QUERY_SHAPE_MSG: &str =
    "query() is only for SELECT; for INSERT, UPDATE, DELETE and SET use execute()";
const EXECUTE_SHAPE_MSG: &str =
    "execute() is only for INSERT, UPDATE, DELETE and SET; for SELECT use query()";
const EMPTY_RESULT_MSG: &str = "query returned no rows";

pub use crate::results::QueryOptions;

enum Inner {
    /// Fresh wrapper over the shared pool
    Pool(ConnectionPool),
    /// Wrapper over one checked-out connection bound to a transaction
    Bound(Arc<Mutex<PooledSlot>>),
}

/// Uniform query/execute surface over either the shared pool or one bound
/// transactional connection.
pub struct PooledConnection {
    inner: Inner,
    options: QueryOptions,
}

impl PooledConnection {
    /// Wrap the shared pool with default options.
    #[must_use]
    pub fn new(pool: &ConnectionPool) -> Self {
        Self::with_options(pool, QueryOptions::default())
    }

    /// Wrap the shared pool with per-call options.
    #[must_use]
    pub fn with_options(pool: &ConnectionPool, options: QueryOptions) -> Self {
        Self {
            inner: Inner::Pool(pool.clone()),
            options,
        }
    }

    pub(crate) fn bound(slot: Arc<Mutex<PooledSlot>>, options: QueryOptions) -> Self {
        Self {
            inner: Inner::Bound(slot),
            options,
        }
    }

    /// Whether this wrapper is bound to an active transaction connection.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        matches!(self.inner, Inner::Bound(_))
    }

    pub(crate) fn pool(&self) -> Option<&ConnectionPool> {
        match &self.inner {
            Inner::Pool(pool) => Some(pool),
            Inner::Bound(_) => None,
        }
    }

    #[must_use]
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// SELECT from the database.
    ///
    /// # Errors
    /// `ShapeMismatch` if the statement produced a mutation summary;
    /// `QueryFailed` if the driver rejected the statement.
    pub async fn query(&self, statement: impl IntoStatement) -> Result<Vec<Row>, ConduitError> {
        let statement = statement.into_statement();
        self.query_statement(&statement).await
    }

    /// As [`Self::query`], failing with `EmptyResult` when zero rows come back.
    ///
    /// # Errors
    /// `EmptyResult` (with `message` when given) on zero rows, plus the
    /// `query` failure modes.
    pub async fn query_required(
        &self,
        statement: impl IntoStatement,
        message: Option<&str>,
    ) -> Result<Vec<Row>, ConduitError> {
        let rows = self.query(statement).await?;
        if rows.is_empty() {
            return Err(ConduitError::EmptyResult(
                message.unwrap_or(EMPTY_RESULT_MSG).to_string(),
            ));
        }
        Ok(rows)
    }

    /// First row of [`Self::query`], or `None` when the result is empty.
    ///
    /// # Errors
    /// Same failure modes as `query`.
    pub async fn query_one(
        &self,
        statement: impl IntoStatement,
    ) -> Result<Option<Row>, ConduitError> {
        Ok(self.query(statement).await?.into_iter().next())
    }

    /// As [`Self::query_one`], failing with `EmptyResult` when absent.
    ///
    /// # Errors
    /// `EmptyResult` (with `message` when given) on zero rows, plus the
    /// `query` failure modes.
    pub async fn query_one_required(
        &self,
        statement: impl IntoStatement,
        message: Option<&str>,
    ) -> Result<Row, ConduitError> {
        self.query_one(statement).await?.ok_or_else(|| {
            ConduitError::EmptyResult(message.unwrap_or(EMPTY_RESULT_MSG).to_string())
        })
    }

    /// INSERT, UPDATE, DELETE or SET.
    ///
    /// # Errors
    /// `ShapeMismatch` if the statement produced a row set; `QueryFailed` if
    /// the driver rejected the statement.
    pub async fn execute(
        &self,
        statement: impl IntoStatement,
    ) -> Result<MutationSummary, ConduitError> {
        let statement = statement.into_statement();
        match self.dispatch(&statement).await? {
            DriverOutput::Mutation(summary) => Ok(summary),
            DriverOutput::Rows(_) => {
                Err(ConduitError::ShapeMismatch(EXECUTE_SHAPE_MSG.to_string()))
            }
        }
    }

    /// Run many SELECTs with bounded concurrency.
    ///
    /// Result `i` corresponds to input `i`; dispatch order beyond that is
    /// unspecified. Against a bound connection the statements serialize.
    ///
    /// # Errors
    /// The first failure from any statement.
    pub async fn query_many<S: IntoStatement>(
        &self,
        statements: Vec<S>,
    ) -> Result<Vec<Vec<Row>>, ConduitError> {
        let statements: Vec<Statement> = statements
            .into_iter()
            .map(IntoStatement::into_statement)
            .collect();
        stream::iter(statements.iter().map(|s| self.query_statement(s)))
            .buffered(BATCH_CONCURRENCY)
            .try_collect()
            .await
    }

    /// Run many mutations with bounded concurrency; see [`Self::query_many`].
    ///
    /// # Errors
    /// The first failure from any statement.
    pub async fn execute_many<S: IntoStatement>(
        &self,
        statements: Vec<S>,
    ) -> Result<Vec<MutationSummary>, ConduitError> {
        let statements: Vec<Statement> = statements
            .into_iter()
            .map(IntoStatement::into_statement)
            .collect();
        stream::iter(statements.iter().map(|s| self.execute_statement(s)))
            .buffered(BATCH_CONCURRENCY)
            .try_collect()
            .await
    }

    async fn query_statement(&self, statement: &Statement) -> Result<Vec<Row>, ConduitError> {
        match self.dispatch(statement).await? {
            DriverOutput::Rows(mut rows) => {
                apply_blob_encoding(&mut rows, &self.options);
                Ok(rows)
            }
            DriverOutput::Mutation(_) => {
                Err(ConduitError::ShapeMismatch(QUERY_SHAPE_MSG.to_string()))
            }
        }
    }

    async fn execute_statement(
        &self,
        statement: &Statement,
    ) -> Result<MutationSummary, ConduitError> {
        match self.dispatch(statement).await? {
            DriverOutput::Mutation(summary) => Ok(summary),
            DriverOutput::Rows(_) => {
                Err(ConduitError::ShapeMismatch(EXECUTE_SHAPE_MSG.to_string()))
            }
        }
    }

    async fn dispatch(&self, statement: &Statement) -> Result<DriverOutput, ConduitError> {
        self.log_sql(statement);
        let result = match &self.inner {
            Inner::Pool(pool) => {
                let mut slot = pool.checkout().await?;
                slot.exec(&statement.sql, &statement.args).await
            }
            Inner::Bound(slot) => {
                let mut guard = slot.lock().await;
                guard.exec(&statement.sql, &statement.args).await
            }
        };
        result.map_err(|err| {
            error!(sql = %format_sql(&statement.sql, &statement.args), "query failed: {err}");
            ConduitError::QueryFailed(Box::new(err))
        })
    }

    fn log_sql(&self, statement: &Statement) {
        let rendered = format_sql(&statement.sql, &statement.args);
        match self.options.log_level {
            Some(level) => log_at(level, &rendered),
            None => debug!("{rendered}"),
        }
    }
}

fn log_at(level: Level, message: &str) {
    if level == Level::ERROR {
        error!("{message}");
    } else if level == Level::WARN {
        warn!("{message}");
    } else if level == Level::INFO {
        info!("{message}");
    } else if level == Level::TRACE {
        trace!("{message}");
    } else {
        debug!("{message}");
    }
}

/// Either a bare pool or an already-bound connection wrapper; everything the
/// free helpers need to resolve a [`PooledConnection`].
pub enum Connector<'a> {
    Pool(&'a ConnectionPool),
    Connection(&'a PooledConnection),
}

impl<'a> From<&'a ConnectionPool> for Connector<'a> {
    fn from(pool: &'a ConnectionPool) -> Self {
        Connector::Pool(pool)
    }
}

impl<'a> From<&'a PooledConnection> for Connector<'a> {
    fn from(conn: &'a PooledConnection) -> Self {
        Connector::Connection(conn)
    }
}

enum Resolved<'a> {
    Borrowed(&'a PooledConnection),
    Owned(PooledConnection),
}

impl Resolved<'_> {
    fn get(&self) -> &PooledConnection {
        match self {
            Resolved::Borrowed(conn) => conn,
            Resolved::Owned(conn) => conn,
        }
    }
}

fn resolve<'a>(connector: Connector<'a>, options: QueryOptions) -> Resolved<'a> {
    match connector {
        // An existing wrapper keeps the options it was built with.
        Connector::Connection(conn) => Resolved::Borrowed(conn),
        Connector::Pool(pool) => Resolved::Owned(PooledConnection::with_options(pool, options)),
    }
}

/// SELECT from the database.
///
/// # Errors
/// See [`PooledConnection::query`].
pub async fn query<'a>(
    statement: impl IntoStatement,
    connector: impl Into<Connector<'a>>,
    options: QueryOptions,
) -> Result<Vec<Row>, ConduitError> {
    resolve(connector.into(), options).get().query(statement).await
}

/// SELECT that errors when no rows are found.
///
/// # Errors
/// See [`PooledConnection::query_required`].
pub async fn query_required<'a>(
    statement: impl IntoStatement,
    connector: impl Into<Connector<'a>>,
    message: Option<&str>,
    options: QueryOptions,
) -> Result<Vec<Row>, ConduitError> {
    resolve(connector.into(), options)
        .get()
        .query_required(statement, message)
        .await
}

/// SELECT one row, or `None`.
///
/// # Errors
/// See [`PooledConnection::query_one`].
pub async fn query_one<'a>(
    statement: impl IntoStatement,
    connector: impl Into<Connector<'a>>,
    options: QueryOptions,
) -> Result<Option<Row>, ConduitError> {
    resolve(connector.into(), options)
        .get()
        .query_one(statement)
        .await
}

/// SELECT one row, erroring when absent.
///
/// # Errors
/// See [`PooledConnection::query_one_required`].
pub async fn query_one_required<'a>(
    statement: impl IntoStatement,
    connector: impl Into<Connector<'a>>,
    message: Option<&str>,
    options: QueryOptions,
) -> Result<Row, ConduitError> {
    resolve(connector.into(), options)
        .get()
        .query_one_required(statement, message)
        .await
}

/// INSERT, UPDATE, DELETE or SET.
///
/// # Errors
/// See [`PooledConnection::execute`].
pub async fn execute<'a>(
    statement: impl IntoStatement,
    connector: impl Into<Connector<'a>>,
    options: QueryOptions,
) -> Result<MutationSummary, ConduitError> {
    resolve(connector.into(), options).get().execute(statement).await
}

/// Batch SELECT helper; see [`PooledConnection::query_many`].
///
/// # Errors
/// The first failure from any statement.
pub async fn query_many<'a, S: IntoStatement>(
    statements: Vec<S>,
    connector: impl Into<Connector<'a>>,
    options: QueryOptions,
) -> Result<Vec<Vec<Row>>, ConduitError> {
    resolve(connector.into(), options)
        .get()
        .query_many(statements)
        .await
}

/// Batch mutation helper; see [`PooledConnection::execute_many`].
///
/// # Errors
/// The first failure from any statement.
pub async fn execute_many<'a, S: IntoStatement>(
    statements: Vec<S>,
    connector: impl Into<Connector<'a>>,
    options: QueryOptions,
) -> Result<Vec<MutationSummary>, ConduitError> {
    resolve(connector.into(), options)
        .get()
        .execute_many(statements)
        .await
}
