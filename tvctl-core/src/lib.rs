//! # tvctl-core
//!
//! Protocol engine for sending remote-control keys to Samsung TVs.
//!
//! This crate contains:
//! - **Key codec**: `KeyCodec` resolving key names per protocol generation
//! - **Legacy protocol**: `LegacyCodec` framing and the TCP handshake (pre-2016 sets)
//! - **Websocket protocol**: TLS-first channel, pairing and token flow (2016+ sets)
//! - **Token store**: `TokenStore` seam for persisting the pairing token
//! - **State**: `ConnectionPhase` state machine shared by both protocols
//! - **Remote**: the `Remote` facade owning one connection
//! - **Error**: `RemoteError`: typed, `thiserror`-based error taxonomy

pub mod config;
pub mod error;
pub mod key;
pub mod legacy;
pub mod network;
pub mod protocol;
pub mod remote;
pub mod state;
pub mod token;
pub mod websocket;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use config::{Config, LEGACY_PORT, Method, WEBSOCKET_PORT, WEBSOCKET_SECURE_PORT};
pub use error::{Denial, RemoteError};
pub use key::{DEFAULT_KEYS, KeyCodec, KeyCommand, KeyIdentifier, KeyTable};
pub use legacy::{LegacyCodec, LegacyFrame, LegacyProtocol};
pub use network::ConnectionInfo;
pub use protocol::Protocol;
pub use remote::Remote;
pub use state::ConnectionPhase;
pub use token::{MemoryTokenStore, Token, TokenStore};
pub use websocket::{Endpoint, WebSocketProtocol};

pub use tokio_util::sync::CancellationToken;
