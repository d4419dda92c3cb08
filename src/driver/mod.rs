//! Driver collaborator boundary.
//!
//! The access layer consumes the underlying database driver through one
//! narrow capability: execute a parameterized statement over a connection and
//! report the shape of what came back. The shape is a tagged value rather
//! than a runtime probe, so the query/execute contract upstream is an
//! exhaustive match.

pub mod sqlite;

use async_trait::async_trait;

use crate::error::ConduitError;
use crate::results::Row;
use crate::types::SqlParam;

pub use sqlite::SqliteDriver;

/// Result metadata for non-SELECT statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationSummary {
    /// Rows changed by the statement
    pub affected_rows: u64,
    /// Generated identifier of the most recent insert on this connection
    pub insert_id: i64,
}

/// What a driver hands back from one generic dispatch.
#[derive(Debug)]
pub enum DriverOutput {
    /// SELECT-style result set
    Rows(Vec<Row>),
    /// INSERT/UPDATE/DELETE-style summary
    Mutation(MutationSummary),
}

/// One physical connection checked out from the driver.
///
/// Callers hold the connection exclusively while it is checked out; the
/// transaction verbs map directly to BEGIN/COMMIT/ROLLBACK on the wire.
#[async_trait]
pub trait DriverConnection: Send {
    /// Execute a parameterized statement and classify the result shape.
    async fn exec(&mut self, sql: &str, args: &[SqlParam]) -> Result<DriverOutput, ConduitError>;

    async fn begin(&mut self) -> Result<(), ConduitError>;

    async fn commit(&mut self) -> Result<(), ConduitError>;

    async fn rollback(&mut self) -> Result<(), ConduitError>;

    /// Session setup issued once per physical connection, immediately after
    /// it is opened (the read-committed isolation statement).
    async fn init_session(&mut self) -> Result<(), ConduitError>;
}

/// Connection factory the pool builds physical connections through.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DriverConnection>, ConduitError>;
}
