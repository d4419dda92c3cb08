use thiserror::Error;

/// Unified error type for the access layer.
///
/// Every public operation either resolves with its documented success value or
/// fails with one of these kinds; nothing is swallowed or retried here.
#[derive(Debug, Error)]
pub enum ConduitError {
    /// `query` was used for a mutation, or `execute` for a SELECT.
    #[error("{0}")]
    ShapeMismatch(String),

    /// A `*_required` variant found zero rows.
    #[error("{0}")]
    EmptyResult(String),

    /// The driver rejected the statement. The original cause is preserved as
    /// the error source; the rendered SQL is logged before this is raised.
    #[error("query failed: {0}")]
    QueryFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Tunnel session or forward setup failed before a pool was constructed.
    #[error("tunnel setup failed: {0}")]
    Tunnel(String),

    /// Checking out a connection from the pool failed.
    #[error("pool error: {0}")]
    Pool(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parameter conversion error: {0}")]
    Parameter(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl From<deadpool::managed::PoolError<ConduitError>> for ConduitError {
    fn from(err: deadpool::managed::PoolError<ConduitError>) -> Self {
        match err {
            deadpool::managed::PoolError::Backend(inner) => inner,
            other => ConduitError::Pool(other.to_string()),
        }
    }
}
