//! Server configuration

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bridge::BridgeConfig;
use crate::coordinator::actor::DEFAULT_COMMAND_BUFFER;
use crate::error::{Error, Result};

/// Default STUN server for the ingest endpoint
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Certificate files looked for in the working directory when no TLS
/// variables are set
pub const DEFAULT_CERT_FILE: &str = "cert.pem";
/// See [`DEFAULT_CERT_FILE`]
pub const DEFAULT_KEY_FILE: &str = "key.pem";

/// PEM certificate chain and private key for HTTPS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Certificate chain
    pub cert: PathBuf,
    /// Private key
    pub key: PathBuf,
}

impl TlsConfig {
    /// Create a TLS config from PEM file paths
    pub fn new(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
        }
    }

    /// `cert.pem` and `key.pem` in `dir`, if both exist
    pub fn discover(dir: &Path) -> Option<Self> {
        let cert = dir.join(DEFAULT_CERT_FILE);
        let key = dir.join(DEFAULT_KEY_FILE);
        (cert.is_file() && key.is_file()).then(|| Self::new(cert, key))
    }
}

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent WebSocket connections (0 = unlimited)
    pub max_connections: usize,

    /// Depth of the coordinator command queue
    pub command_buffer: usize,

    /// ICE servers used by the ingest endpoint's peer connections
    pub ice_servers: Vec<String>,

    /// How long the ingest endpoint waits for ICE gathering
    pub ice_gathering_timeout: Duration,

    /// How long an answered ingest peer may take to connect
    pub ingest_connect_timeout: Duration,

    /// Serve HTTPS with these files instead of plain HTTP
    pub tls: Option<TlsConfig>,

    /// RTMP bridge settings
    pub bridge: BridgeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            max_connections: 0, // Unlimited
            command_buffer: DEFAULT_COMMAND_BUFFER,
            ice_servers: vec![DEFAULT_STUN_SERVER.to_owned()],
            ice_gathering_timeout: Duration::from_secs(5),
            ingest_connect_timeout: Duration::from_secs(30),
            tls: None,
            bridge: BridgeConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Build a config from environment variables
    ///
    /// `BIND_ADDR` (full socket address) takes precedence over `PORT`.
    /// `MAX_CONNECTIONS`, `FFMPEG_PATH` and `RTMP_URL` override the
    /// corresponding defaults. `TLS_CERT` and `TLS_KEY` enable HTTPS and
    /// must be set together; without them HTTPS is used when `cert.pem` and
    /// `key.pem` exist in the working directory.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        if config.tls.is_none() {
            config.tls = TlsConfig::discover(Path::new("."));
        }
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {}", port)))?;
            config.bind_addr.set_port(port);
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|_| Error::Config(format!("BIND_ADDR is not a socket address: {}", addr)))?;
        }
        if let Some(max) = lookup("MAX_CONNECTIONS") {
            config.max_connections = max
                .parse()
                .map_err(|_| Error::Config(format!("MAX_CONNECTIONS is not a number: {}", max)))?;
        }
        if let Some(program) = lookup("FFMPEG_PATH") {
            config.bridge = config.bridge.program(program);
        }
        if let Some(url) = lookup("RTMP_URL") {
            config.bridge = config.bridge.output_url(url);
        }
        config.tls = match (lookup("TLS_CERT"), lookup("TLS_KEY")) {
            (Some(cert), Some(key)) => Some(TlsConfig::new(cert, key)),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "TLS_CERT and TLS_KEY must be set together".to_owned(),
                ))
            }
        };

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the ICE servers for the ingest endpoint
    pub fn ice_servers(mut self, servers: Vec<String>) -> Self {
        self.ice_servers = servers;
        self
    }

    /// Set the ICE gathering timeout
    pub fn ice_gathering_timeout(mut self, timeout: Duration) -> Self {
        self.ice_gathering_timeout = timeout;
        self
    }

    /// Set the ingest connect timeout
    pub fn ingest_connect_timeout(mut self, timeout: Duration) -> Self {
        self.ingest_connect_timeout = timeout;
        self
    }

    /// Serve HTTPS
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Set the bridge configuration
    pub fn bridge(mut self, bridge: BridgeConfig) -> Self {
        self.bridge = bridge;
        self
    }
}
