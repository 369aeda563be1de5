//! Gateway configuration with validation.
//!
//! Three listeners are configured: plain HTTP, plain WebSocket, and the
//! authenticated listener which serves both transports. The JWT secret is only
//! ever referenced by path.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default tolerance between a token's `iat` and the server clock
pub const DEFAULT_CLOCK_SKEW_TOLERANCE: Duration = Duration::from_secs(5);

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Plain HTTP server configuration
    pub http: HttpConfig,
    /// Plain WebSocket server configuration
    pub websocket: WebSocketConfig,
    /// Authenticated listener configuration
    pub auth: AuthConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let auth = self.auth_addr();

        // Port 0 asks the OS for an ephemeral port, so it never collides.
        if self.http.enabled && collides(self.http_addr(), auth) {
            return Err(ConfigError::EndpointCollision {
                transport: "http",
                addr: auth,
            });
        }
        if self.websocket.enabled && collides(self.ws_addr(), auth) {
            return Err(ConfigError::EndpointCollision {
                transport: "ws",
                addr: auth,
            });
        }
        if self.http.enabled
            && self.websocket.enabled
            && collides(self.http_addr(), self.ws_addr())
        {
            return Err(ConfigError::DuplicatePorts);
        }

        if self.auth.clock_skew_tolerance.is_zero() {
            return Err(ConfigError::InvalidTolerance(
                "clock skew tolerance cannot be 0".into(),
            ));
        }

        if self.websocket.max_message_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_message_size cannot be 0".into(),
            ));
        }

        if self.http.max_batch_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_batch_size cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Get WebSocket server bind address
    pub fn ws_addr(&self) -> SocketAddr {
        SocketAddr::new(self.websocket.host, self.websocket.port)
    }

    /// Get authenticated server bind address
    pub fn auth_addr(&self) -> SocketAddr {
        SocketAddr::new(self.auth.host, self.auth.port)
    }
}

fn collides(a: SocketAddr, b: SocketAddr) -> bool {
    if a.port() == 0 || b.port() == 0 || a.port() != b.port() {
        return false;
    }
    a.ip() == b.ip() || a.ip().is_unspecified() || b.ip().is_unspecified()
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8545)
    pub port: u16,
    /// Enable HTTP server
    pub enabled: bool,
    /// Namespaces exposed on the plain listener
    pub modules: Vec<String>,
    /// Max requests in a single batch
    pub max_batch_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8545,
            enabled: true,
            modules: vec!["web3".to_string()],
            max_batch_size: 100,
        }
    }
}

/// WebSocket server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8546)
    pub port: u16,
    /// Enable WebSocket server
    pub enabled: bool,
    /// Namespaces exposed on the plain listener
    pub modules: Vec<String>,
    /// Max inbound message size in bytes
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8546,
            enabled: true,
            modules: vec!["web3".to_string()],
            max_message_size: 1024 * 1024,
        }
    }
}

/// Authenticated listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bind address (localhost only by default)
    pub host: IpAddr,
    /// Port (default: 8551)
    pub port: u16,
    /// Path of the hex-encoded JWT secret file
    pub jwt_secret: PathBuf,
    /// Max distance between `iat` and the server clock at receipt
    #[serde(with = "humantime_serde")]
    pub clock_skew_tolerance: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8551,
            jwt_secret: PathBuf::from("jwtsecret"),
            clock_skew_tolerance: DEFAULT_CLOCK_SKEW_TOLERANCE,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Authenticated listener shares an address with a plain one
    #[error("{transport} listener and auth listener share address {addr}")]
    EndpointCollision {
        transport: &'static str,
        addr: SocketAddr,
    },
    /// Plain HTTP and WebSocket servers using the same port
    #[error("duplicate ports configured")]
    DuplicatePorts,
    /// Invalid tolerance window
    #[error("invalid tolerance: {0}")]
    InvalidTolerance(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
