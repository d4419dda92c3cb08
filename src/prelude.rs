//! Convenience re-exports for the common surface.
//!
//! ```
//! use sql_conduit::prelude::*;
//! ```

pub use crate::config::{DbConfig, TunnelConfig};
pub use crate::connection::{
    Connector, PooledConnection, execute, execute_many, query, query_many, query_one,
    query_one_required, query_required,
};
pub use crate::driver::{Driver, DriverConnection, MutationSummary, SqliteDriver};
pub use crate::error::ConduitError;
pub use crate::pool::{ConnectionPool, PoolSettings, create_pool};
pub use crate::results::{BlobEncoding, QueryOptions, Row};
pub use crate::template::{IntoStatement, SqlBuilder, Statement, placeholders};
pub use crate::transaction::transaction;
pub use crate::tunnel::{TcpRelay, Tunnel, TunnelHandle, connect_through_tunnel};
pub use crate::types::SqlParam;
