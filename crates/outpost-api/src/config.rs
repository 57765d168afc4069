use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Network and TLS settings of the control channel.
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Public TLS listener.
    pub listen_addr: SocketAddr,
    /// Loopback service receiving proxied requests (`host:port`).
    pub upstream_addr: String,
    /// PEM certificate chain.
    pub tls_cert: PathBuf,
    /// PEM private key.
    pub tls_key: PathBuf,
    /// Budget for the TLS handshake and for reading request headers.
    pub read_timeout: Duration,
    /// Connection is closed after this long without bytes in either direction.
    pub idle_timeout: Duration,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8521)),
            upstream_addr: "127.0.0.1:9000".to_string(),
            tls_cert: PathBuf::from("/opt/outpost/server.crt"),
            tls_key: PathBuf::from("/opt/outpost/server.key"),
            read_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(120),
        }
    }
}

/// Timing of the `/monitor` stream.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    /// A keepalive is written on a tick only if nothing went out for this long.
    pub silence: Duration,
    /// Message types whose latest value is replayed to a new session.
    pub replay_latest: Vec<String>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            silence: Duration::from_secs(4),
            replay_latest: Vec::new(),
        }
    }
}
