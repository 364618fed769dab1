use crate::common::TlsConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Default listener address of the ping server
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:50505";

/// Configuration for the ping server
///
/// # Examples
///
/// ```
/// use pingsrv::ServerConfig;
/// use pingsrv::common::TlsConfig;
///
/// let config = ServerConfig {
///     bind_addr: "127.0.0.1:50505".parse().unwrap(),
///     tls: TlsConfig::default(),
///     max_concurrent_streams: Some(128),
///     tcp_keepalive: None,
/// };
/// assert!(!config.tls.is_requested());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Certificate material; when any of it is set the server requires mTLS
    pub tls: TlsConfig,
    /// Maximum concurrent HTTP/2 streams per connection
    pub max_concurrent_streams: Option<u32>,
    /// TCP keepalive interval for accepted connections
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 50505)),
            tls: TlsConfig::default(),
            max_concurrent_streams: None,
            tcp_keepalive: Some(Duration::from_secs(60)),
        }
    }
}
