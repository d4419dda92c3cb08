//! Pooled database access with typed result contracts.
//!
//! sql-conduit wraps a connection pool (optionally reached through a secure
//! tunnel) behind a small, shape-checked query surface:
//!
//! - [`SqlBuilder`] assembles parameterized SQL, expanding list parameters
//!   into `IN (...)` placeholder groups and splicing prebuilt statements into
//!   larger ones.
//! - [`PooledConnection`] dispatches statements against the pool and enforces
//!   the result-shape contract: `query` only for SELECT-shaped statements,
//!   `execute` only for mutations.
//! - [`transaction`] scopes a closure to one physical connection with
//!   commit-on-success and rollback-on-error.
//!
//! # Builder contracts
//!
//! Two behaviors of the builder are deliberate and relied upon by callers:
//!
//! - List parameters are deduplicated (first occurrence wins, order
//!   preserved) before placeholder expansion, so `IN` lists never carry
//!   repeated values.
//! - Bare falsy values (`Null`, `false`, `0`, `0.0`, empty string) bound via
//!   [`SqlBuilder::bind`] emit neither a placeholder nor an argument. Bind
//!   such values inside a list, or splice them as literal text, when they
//!   must reach the database.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sql_conduit::prelude::*;
//!
//! # async fn demo() -> Result<(), ConduitError> {
//! let pool = create_pool(
//!     Arc::new(SqliteDriver::new("app.db")),
//!     &PoolSettings::default(),
//! )?;
//!
//! let stmt = SqlBuilder::new()
//!     .text("SELECT id, name FROM users WHERE id IN ")
//!     .bind(SqlParam::List(vec![1.into(), 2.into(), 2.into(), 3.into()]))
//!     .finish();
//!
//! let conn = PooledConnection::new(&pool);
//! let rows = conn.query(stmt).await?;
//! for row in &rows {
//!     println!("{:?}", row.get("name"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod format;
pub mod pool;
pub mod prelude;
pub mod results;
pub mod template;
pub mod transaction;
pub mod tunnel;
pub mod types;

pub use config::{DbConfig, TunnelConfig};
pub use connection::{
    BATCH_CONCURRENCY, Connector, PooledConnection, execute, execute_many, query, query_many,
    query_one, query_one_required, query_required,
};
pub use driver::{Driver, DriverConnection, DriverOutput, MutationSummary, SqliteDriver};
pub use error::ConduitError;
pub use format::format_sql;
pub use pool::{ConnectionPool, MAX_PREPARED_STATEMENTS, PoolSettings, create_pool};
pub use results::{BlobEncoding, QueryOptions, Row};
pub use template::{IntoStatement, SqlBuilder, Statement, placeholders};
pub use transaction::transaction;
pub use tunnel::{TcpRelay, Tunnel, TunnelHandle, TunnelSession, connect_through_tunnel};
pub use types::SqlParam;
