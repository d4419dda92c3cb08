//! Configuration shapes.
//!
//! Loading these from the environment or files belongs to the host
//! application; this layer only defines the shapes it consumes.

use serde::Deserialize;

/// Database endpoint configuration.
///
/// `database` is driver-specific: a schema name for networked servers, a file
/// path or URI for the embedded driver.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub database: String,
}

/// Secure-tunnel endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TunnelConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}
