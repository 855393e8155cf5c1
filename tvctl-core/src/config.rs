//! Remote configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// Default TCP port of the legacy protocol.
pub const LEGACY_PORT: u16 = 55000;
/// Default insecure websocket port.
pub const WEBSOCKET_PORT: u16 = 8001;
/// Default TLS websocket port.
pub const WEBSOCKET_SECURE_PORT: u16 = 8002;

/// Which wire protocol a TV speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Binary TCP protocol of pre-2016 sets.
    Legacy,
    /// JSON-over-websocket protocol of 2016+ sets.
    WebSocket,
}

impl FromStr for Method {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Method::Legacy),
            "websocket" => Ok(Method::WebSocket),
            other => Err(RemoteError::InvalidConfig(format!(
                "unrecognized method {other:?} (expected \"legacy\" or \"websocket\")"
            ))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Legacy => write!(f, "legacy"),
            Method::WebSocket => write!(f, "websocket"),
        }
    }
}

/// Everything needed to reach and identify against one TV.
///
/// `token` and `paired` are the only fields the engine itself writes,
/// after a websocket pairing issued a fresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TV address (IP or hostname).
    pub host: String,
    /// Legacy port, or the insecure websocket port. `0` picks the default.
    pub port: u16,
    /// TLS websocket port.
    pub secure_port: u16,
    /// `"legacy"` or `"websocket"`.
    pub method: String,
    /// Controller name shown on the TV.
    pub name: String,
    /// Controller description (legacy identification only).
    pub description: String,
    /// Controller id (legacy identification only).
    pub id: String,
    /// Seconds per blocking operation. `0` waits forever.
    pub timeout: u64,
    /// Token issued by a websocket TV during pairing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Set once a websocket pairing succeeded.
    pub paired: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 0,
            secure_port: WEBSOCKET_SECURE_PORT,
            method: "legacy".into(),
            name: "tvctl".into(),
            description: "PC".into(),
            id: String::new(),
            timeout: 0,
            token: None,
            paired: false,
        }
    }
}

impl Config {
    /// Convenience constructor for the common fields.
    pub fn new(host: impl Into<String>, method: Method) -> Self {
        Self {
            host: host.into(),
            method: method.to_string(),
            ..Self::default()
        }
    }

    /// Check required fields and resolve the method.
    ///
    /// Performs no I/O.
    pub fn validate(&self) -> Result<Method, RemoteError> {
        let method = self.method.parse::<Method>()?;
        if self.host.trim().is_empty() {
            return Err(RemoteError::InvalidConfig("host is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(RemoteError::InvalidConfig("name is required".into()));
        }
        if method == Method::WebSocket && self.secure_port == 0 {
            return Err(RemoteError::InvalidConfig("secure_port must be non-zero".into()));
        }
        Ok(method)
    }

    /// Port to dial for `method`, substituting the default for `0`.
    pub fn effective_port(&self, method: Method) -> u16 {
        match (self.port, method) {
            (0, Method::Legacy) => LEGACY_PORT,
            (0, Method::WebSocket) => WEBSOCKET_PORT,
            (port, _) => port,
        }
    }

    /// The per-operation deadline, or `None` to block indefinitely.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
