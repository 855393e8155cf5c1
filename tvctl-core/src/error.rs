//! Error taxonomy surfaced by the remote-control engine.
//!
//! All fallible operations return `Result<T, RemoteError>`.
//! Transport errors that mean "the TV went away" are normalized to
//! [`RemoteError::ConnectionClosed`], I/O deadlines to [`RemoteError::Timeout`].

use std::fmt;
use std::io::ErrorKind;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Why the TV refused the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The TV (or the user on the TV) rejected the identification.
    Rejected,
    /// The user dismissed the authorization prompt.
    Cancelled,
    /// A previously issued token is no longer accepted. Re-pair.
    TokenRevoked,
    /// Nobody answered the pairing prompt on the TV in time.
    PairingTimedOut,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::Rejected => write!(f, "rejected by the TV"),
            Denial::Cancelled => write!(f, "authorization cancelled on the TV"),
            Denial::TokenRevoked => write!(f, "stored token was revoked"),
            Denial::PairingTimedOut => write!(f, "pairing prompt timed out on the TV"),
        }
    }
}

/// The canonical error type for remote-control operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    // ── Caller errors ────────────────────────────────────────────
    /// Unrecognized method or missing required field. No I/O was attempted.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The key name is not in the key table.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// `control` was called on a remote that is not ready.
    #[error("not connected")]
    NotConnected,

    // ── Protocol errors ──────────────────────────────────────────
    /// The TV refused identification or pairing.
    #[error("access denied: {0}")]
    AccessDenied(Denial),

    /// The TV sent a frame that matches no known response shape.
    #[error("unhandled response: {0}")]
    UnhandledResponse(String),

    /// A connection phase change that the state machine does not allow.
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),

    // ── Connection errors ────────────────────────────────────────
    /// The transport dropped unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// An operation exceeded the configured deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The TCP layer reported an error.
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    /// The websocket layer reported an error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// TLS configuration failed.
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    // ── Serialization / persistence ──────────────────────────────
    /// A JSON message could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The token store could not persist or read the token.
    #[error("token store: {0}")]
    TokenStore(String),
}

impl RemoteError {
    /// Whether the remote that produced this error must be reopened.
    ///
    /// `UnknownKey` and `NotConnected` leave the connection as it was.
    /// A `TokenStore` failure aborts the pairing that issued the token.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RemoteError::UnknownKey(_) | RemoteError::NotConnected)
    }

    /// Map an I/O error, folding peer-gone kinds into `ConnectionClosed`.
    pub(crate) fn from_io(err: std::io::Error, timeout: Option<Duration>) -> Self {
        match err.kind() {
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected => RemoteError::ConnectionClosed,
            ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                RemoteError::Timeout(timeout.unwrap_or_default())
            }
            _ => RemoteError::Io(err),
        }
    }

    /// Map a websocket error the same way.
    pub(crate) fn from_ws(err: tungstenite::Error, timeout: Option<Duration>) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                RemoteError::ConnectionClosed
            }
            tungstenite::Error::Io(io) => RemoteError::from_io(io, timeout),
            tungstenite::Error::Protocol(tungstenite::error::ProtocolError::ResetWithoutClosingHandshake) => {
                RemoteError::ConnectionClosed
            }
            other => RemoteError::WebSocket(other),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
