//! Connection pool construction and checkout.
//!
//! The pool applies fixed policy regardless of caller-supplied settings:
//! callers queue without bound for a free slot, prepared-statement caches are
//! capped at [`MAX_PREPARED_STATEMENTS`], and every physical connection runs
//! its session setup statement immediately after it is opened. Teardown is
//! owned by the host process, not this layer.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use deadpool::managed::{Manager, Metrics, Object, Pool, RecycleResult};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::driver::{Driver, DriverConnection};
use crate::error::ConduitError;

/// Per-connection prepared-statement cache ceiling.
pub const MAX_PREPARED_STATEMENTS: usize = 20;

/// Caller-tunable pool knobs. Everything else is fixed policy.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    /// Ceiling on simultaneously open physical connections. Forced to 1 when
    /// the pool is wired through a tunnel.
    pub connection_limit: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            connection_limit: 10,
        }
    }
}

pub(crate) struct DriverManager {
    driver: Arc<dyn Driver>,
}

impl Manager for DriverManager {
    type Type = Box<dyn DriverConnection>;
    type Error = ConduitError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let mut conn = self.driver.connect().await?;
        conn.init_session().await?;
        debug!("connection opened, session initialized");
        Ok(conn)
    }

    async fn recycle(
        &self,
        _conn: &mut Self::Type,
        _metrics: &Metrics,
    ) -> RecycleResult<Self::Error> {
        Ok(())
    }
}

/// One physical connection checked out of the pool.
///
/// Dropping the slot returns the connection to the pool; that is the only
/// release path, so release happens exactly once per checkout.
pub struct PooledSlot {
    inner: Object<DriverManager>,
}

impl Deref for PooledSlot {
    type Target = Box<dyn DriverConnection>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PooledSlot {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Drop for PooledSlot {
    fn drop(&mut self) {
        debug!("connection released");
    }
}

/// Shared connection pool. Cheap to clone; all clones refer to the same set
/// of physical connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Pool<DriverManager>,
}

impl ConnectionPool {
    /// Build a pool over the given driver.
    ///
    /// # Errors
    /// Returns `ConduitError::Config` if the settings are unusable.
    pub fn new(driver: Arc<dyn Driver>, settings: &PoolSettings) -> Result<Self, ConduitError> {
        if settings.connection_limit == 0 {
            return Err(ConduitError::Config(
                "connection_limit must be at least 1".to_string(),
            ));
        }
        let manager = DriverManager { driver };
        let inner = Pool::builder(manager)
            .max_size(settings.connection_limit)
            .build()
            .map_err(|e| ConduitError::Config(format!("failed to build pool: {e}")))?;
        Ok(Self { inner })
    }

    /// Effective ceiling on physical connections.
    #[must_use]
    pub fn connection_limit(&self) -> usize {
        self.inner.status().max_size
    }

    /// Check out one physical connection, waiting for a free slot if the
    /// pool is exhausted.
    ///
    /// # Errors
    /// Returns a pool or driver error if the checkout fails.
    pub(crate) async fn checkout(&self) -> Result<PooledSlot, ConduitError> {
        if self.inner.status().available == 0 {
            warn!("waiting for available connection slot");
        }
        let inner = self.inner.get().await.map_err(ConduitError::from)?;
        debug!("connection acquired");
        Ok(PooledSlot { inner })
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.inner.status();
        f.debug_struct("ConnectionPool")
            .field("max_size", &status.max_size)
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}

/// Build a pool directly against a database endpoint (no tunnel).
///
/// # Errors
/// Returns `ConduitError::Config` if pool construction fails.
pub fn create_pool(
    driver: Arc<dyn Driver>,
    settings: &PoolSettings,
) -> Result<ConnectionPool, ConduitError> {
    ConnectionPool::new(driver, settings)
}
