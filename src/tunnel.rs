//! Tunnel wiring for pools that cannot reach the database directly.
//!
//! The secure transport itself is a collaborator: anything that can open a
//! session and forward a local ephemeral port to the remote database endpoint
//! satisfies [`Tunnel`]. The forwarded endpoint carries a single multiplexed
//! stream, so the pool built over it is capped at one physical connection and
//! concurrent logical callers queue for the slot.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error};

use crate::config::{DbConfig, TunnelConfig};
use crate::driver::Driver;
use crate::error::ConduitError;
use crate::pool::{ConnectionPool, PoolSettings};

/// An established tunnel session able to forward ports.
#[async_trait]
pub trait TunnelSession: Send + Sync {
    /// Forward a local ephemeral port to `remote_host:remote_port` and return
    /// the local bind address. Fails if the remote refuses or the session
    /// drops before the forward completes.
    async fn forward(
        &self,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<SocketAddr, ConduitError>;
}

/// Transport collaborator that opens tunnel sessions.
#[async_trait]
pub trait Tunnel: Send + Sync {
    async fn connect(&self, config: &TunnelConfig) -> Result<Box<dyn TunnelSession>, ConduitError>;
}

/// Keeps the tunnel session alive for the lifetime of the pool built over it.
pub struct TunnelHandle {
    session: Box<dyn TunnelSession>,
}

impl TunnelHandle {
    #[must_use]
    pub fn session(&self) -> &dyn TunnelSession {
        self.session.as_ref()
    }
}

/// Open the tunnel, forward a local port to the database endpoint, and build
/// a pool bound to the forwarded address.
///
/// The session is established first; only once the forward succeeds is the
/// pool constructed, with its connection ceiling forced to 1. On any tunnel
/// failure no pool is returned.
///
/// # Errors
/// Returns `ConduitError::Tunnel` if the session or forward setup fails, or
/// `ConduitError::Config` if pool construction fails afterwards.
pub async fn connect_through_tunnel(
    transport: &dyn Tunnel,
    tunnel_config: &TunnelConfig,
    db_config: &DbConfig,
    settings: &PoolSettings,
    make_driver: impl FnOnce(&DbConfig) -> Arc<dyn Driver>,
) -> Result<(ConnectionPool, TunnelHandle), ConduitError> {
    let session = transport.connect(tunnel_config).await?;
    let local = session.forward(&db_config.host, db_config.port).await?;
    debug!(%local, remote = %db_config.host, port = db_config.port, "tunnel forward established");

    let mut forwarded = db_config.clone();
    forwarded.host = local.ip().to_string();
    forwarded.port = local.port();

    // One multiplexed stream behind the forward: one physical connection.
    let mut capped = settings.clone();
    capped.connection_limit = 1;

    let pool = ConnectionPool::new(make_driver(&forwarded), &capped)?;
    Ok((pool, TunnelHandle { session }))
}

/// Plain-TCP relay implementing [`Tunnel`].
///
/// Useful when the secure path is established externally (for example an
/// already-running port forward) and in tests. Each accepted local connection
/// is proxied byte-for-byte to the remote endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpRelay;

#[async_trait]
impl Tunnel for TcpRelay {
    async fn connect(
        &self,
        _config: &TunnelConfig,
    ) -> Result<Box<dyn TunnelSession>, ConduitError> {
        Ok(Box::new(TcpRelaySession))
    }
}

struct TcpRelaySession;

#[async_trait]
impl TunnelSession for TcpRelaySession {
    async fn forward(
        &self,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<SocketAddr, ConduitError> {
        let remote = format!("{remote_host}:{remote_port}");

        // Probe the remote first so a refused endpoint fails the forward
        // rather than the first checkout.
        TcpStream::connect(&remote)
            .await
            .map_err(|e| ConduitError::Tunnel(format!("remote {remote} refused: {e}")))?;

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| ConduitError::Tunnel(format!("local bind failed: {e}")))?;
        let local = listener
            .local_addr()
            .map_err(|e| ConduitError::Tunnel(format!("local bind failed: {e}")))?;

        tokio::spawn(async move {
            loop {
                let Ok((mut inbound, _)) = listener.accept().await else {
                    break;
                };
                let remote = remote.clone();
                tokio::spawn(async move {
                    match TcpStream::connect(&remote).await {
                        Ok(mut outbound) => {
                            let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound)
                                .await;
                        }
                        Err(e) => error!(%remote, "relay connect failed: {e}"),
                    }
                });
            }
        });

        Ok(local)
    }
}
