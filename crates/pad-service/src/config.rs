//! Daemon and client configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use net_transport::{DEFAULT_PORT, TransportConfig};
use serde::{Deserialize, Serialize};
use shared_protocol::RoleTag;

/// Daemon settings, shared read-only by every worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub bind_addr: SocketAddr,
    /// Tag a client must present to be served
    pub role_tag: RoleTag,
    pub transport: TransportConfig,
    /// How long shutdown waits for running sessions before cancelling them,
    /// in milliseconds
    pub shutdown_grace_ms: u64,
}

impl DaemonConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            role_tag: RoleTag::ENCRYPT,
            transport: TransportConfig::default(),
            shutdown_grace_ms: 5000,
        }
    }
}

/// Client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port`, resolved at connect time
    pub server_addr: String,
    pub role_tag: RoleTag,
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            server_addr: format!("{host}:{port}"),
            ..Default::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("localhost:{DEFAULT_PORT}"),
            role_tag: RoleTag::ENCRYPT,
            transport: TransportConfig::default(),
        }
    }
}
