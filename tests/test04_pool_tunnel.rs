use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sql_conduit::prelude::*;
use sql_conduit::tunnel::TunnelSession;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone, Default)]
struct RecordingTunnel {
    forwards: Arc<Mutex<Vec<(String, u16)>>>,
}

struct RecordingSession {
    forwards: Arc<Mutex<Vec<(String, u16)>>>,
}

#[async_trait]
impl Tunnel for RecordingTunnel {
    async fn connect(
        &self,
        _config: &TunnelConfig,
    ) -> Result<Box<dyn TunnelSession>, ConduitError> {
        Ok(Box::new(RecordingSession {
            forwards: Arc::clone(&self.forwards),
        }))
    }
}

#[async_trait]
impl TunnelSession for RecordingSession {
    async fn forward(
        &self,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<SocketAddr, ConduitError> {
        self.forwards
            .lock()
            .unwrap()
            .push((remote_host.to_string(), remote_port));
        Ok("127.0.0.1:15432".parse().unwrap())
    }
}

struct RefusingTunnel;

#[async_trait]
impl Tunnel for RefusingTunnel {
    async fn connect(
        &self,
        _config: &TunnelConfig,
    ) -> Result<Box<dyn TunnelSession>, ConduitError> {
        Err(ConduitError::Tunnel("authentication failed".to_string()))
    }
}

fn tunnel_config() -> TunnelConfig {
    TunnelConfig {
        host: "bastion.example".to_string(),
        port: 22,
        username: "deploy".to_string(),
        password: "secret".to_string(),
    }
}

fn db_config() -> DbConfig {
    DbConfig {
        host: "db.internal".to_string(),
        port: 3306,
        user: Some("app".to_string()),
        password: None,
        database: "app".to_string(),
    }
}

#[tokio::test]
async fn tunnel_pool_is_forced_to_one_connection_and_targets_the_forward() {
    let transport = RecordingTunnel::default();
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("tunnel.db").to_string_lossy().into_owned();

    let seen_endpoint = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&seen_endpoint);
    let (pool, _handle) = connect_through_tunnel(
        &transport,
        &tunnel_config(),
        &db_config(),
        &PoolSettings {
            connection_limit: 10,
        },
        move |forwarded: &DbConfig| -> Arc<dyn Driver> {
            *seen.lock().unwrap() = Some((forwarded.host.clone(), forwarded.port));
            Arc::new(SqliteDriver::new(db))
        },
    )
    .await
    .unwrap();

    assert_eq!(pool.connection_limit(), 1);
    assert_eq!(
        *transport.forwards.lock().unwrap(),
        vec![("db.internal".to_string(), 3306)]
    );
    // The driver is pointed at the local end of the forward.
    assert_eq!(
        seen_endpoint.lock().unwrap().clone(),
        Some(("127.0.0.1".to_string(), 15432))
    );

    // The pool over the forward serves queries.
    let rows = PooledConnection::new(&pool).query("SELECT 1 AS one").await.unwrap();
    assert_eq!(rows[0].get("one").unwrap().as_int(), Some(&1));
}

#[tokio::test]
async fn tunnel_failure_yields_no_pool() {
    let result = connect_through_tunnel(
        &RefusingTunnel,
        &tunnel_config(),
        &db_config(),
        &PoolSettings::default(),
        |forwarded: &DbConfig| -> Arc<dyn Driver> {
            Arc::new(SqliteDriver::new(forwarded.database.clone()))
        },
    )
    .await;

    match result {
        Err(ConduitError::Tunnel(msg)) => assert!(msg.contains("authentication failed")),
        Err(other) => panic!("expected Tunnel error, got {other}"),
        Ok(_) => panic!("expected Tunnel error, got a pool"),
    }
}

#[tokio::test]
async fn zero_connection_limit_is_rejected() {
    let err = create_pool(
        Arc::new(SqliteDriver::new(":memory:")),
        &PoolSettings {
            connection_limit: 0,
        },
    )
    .unwrap_err();
    assert!(matches!(err, ConduitError::Config(_)));
}

#[tokio::test]
async fn tcp_relay_proxies_bytes_to_the_remote() {
    // Stand-in remote: echoes whatever it receives.
    let echo = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let echo_addr = echo.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = echo.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 64];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 || socket.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    let session = TcpRelay
        .connect(&tunnel_config())
        .await
        .unwrap();
    let local = session
        .forward(&echo_addr.ip().to_string(), echo_addr.port())
        .await
        .unwrap();

    let mut stream = TcpStream::connect(local).await.unwrap();
    stream.write_all(b"ping").await.unwrap();
    let mut reply = [0u8; 4];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply, b"ping");
}

#[tokio::test]
async fn tcp_relay_fails_fast_on_unreachable_remote() {
    let session = TcpRelay.connect(&tunnel_config()).await.unwrap();
    // Reserved port with nothing listening.
    let err = session.forward("127.0.0.1", 1).await.unwrap_err();
    assert!(matches!(err, ConduitError::Tunnel(_)));
}
