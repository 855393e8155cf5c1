//! Connection state machine shared by both protocol variants.
//!
//! Provides a `ConnectionPhase` enum that models the lifecycle of one
//! TV connection, with validated transitions that return `Result`
//! instead of panicking.

use std::time::Instant;

use crate::error::RemoteError;

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of a TV connection.
///
/// ```text
///  Unopened ──► Handshaking ──► Ready ──► Closed
///                   │    ▲                  ▲
///                   ▼    │                  │
///             AwaitingPairing ──────────────┤
///                   │                       │
///                   └───────────────────────┘
/// ```
///
/// `Closed` is terminal: nothing transitions out of it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No transport yet.
    #[default]
    Unopened,

    /// Transport is being established and the TV identified against.
    Handshaking,

    /// Websocket only: waiting for the user to confirm on the TV.
    AwaitingPairing,

    /// Ready for key commands.
    Ready {
        /// When the connection became ready.
        since: Instant,
    },

    /// Transport released. Terminal.
    Closed,
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unopened => write!(f, "Unopened"),
            Self::Handshaking => write!(f, "Handshaking"),
            Self::AwaitingPairing => write!(f, "AwaitingPairing"),
            Self::Ready { .. } => write!(f, "Ready"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

impl ConnectionPhase {
    /// Returns `true` when key commands may be sent.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Returns `true` once the connection has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// How long the connection has been ready. `None` in any other phase.
    pub fn ready_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Ready { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Handshaking`.
    ///
    /// Valid from: `Unopened`.
    pub fn begin_handshake(&mut self) -> Result<(), RemoteError> {
        match self {
            Self::Unopened => {
                *self = Self::Handshaking;
                Ok(())
            }
            _ => Err(RemoteError::InvalidTransition(
                "cannot handshake: not in Unopened state",
            )),
        }
    }

    /// Transition to `AwaitingPairing`.
    ///
    /// Valid from: `Handshaking`.
    pub fn await_pairing(&mut self) -> Result<(), RemoteError> {
        match self {
            Self::Handshaking => {
                *self = Self::AwaitingPairing;
                Ok(())
            }
            _ => Err(RemoteError::InvalidTransition(
                "cannot await pairing: not in Handshaking state",
            )),
        }
    }

    /// Transition to `Ready`.
    ///
    /// Valid from: `Handshaking`, `AwaitingPairing`.
    pub fn become_ready(&mut self) -> Result<(), RemoteError> {
        match self {
            Self::Handshaking | Self::AwaitingPairing => {
                *self = Self::Ready {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(RemoteError::InvalidTransition(
                "cannot become ready: handshake not in progress",
            )),
        }
    }

    /// Transition to `Closed` from any phase. Idempotent.
    ///
    /// Returns `true` if the phase actually changed.
    pub fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        *self = Self::Closed;
        true
    }
}

// ── Tests ────────────────────────────────────────────────────────
