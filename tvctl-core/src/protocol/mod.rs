//! The capability both wire protocols provide to [`Remote`](crate::Remote).

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, Method};
use crate::error::RemoteError;
use crate::key::KeyIdentifier;
use crate::state::ConnectionPhase;

/// One TV connection speaking a particular wire protocol.
///
/// Implementations own their transport and keep `phase()` truthful:
/// any failure during `open` leaves the phase `Closed`.
#[async_trait]
pub trait Protocol: Send {
    fn method(&self) -> Method;

    fn phase(&self) -> &ConnectionPhase;

    /// The configuration in effect, including any token issued while
    /// opening.
    fn config(&self) -> &Config;

    /// Suggested pause between consecutive key presses.
    fn key_interval(&self) -> Duration;

    /// Connect and run the handshake. Cancelling `cancel` aborts the
    /// wait with [`RemoteError::ConnectionClosed`].
    async fn open(&mut self, cancel: &CancellationToken) -> Result<(), RemoteError>;

    /// Send one key press. Only valid when ready.
    async fn send_key(&mut self, key: &KeyIdentifier) -> Result<(), RemoteError>;

    /// Release the transport. Idempotent.
    async fn close(&mut self) -> Result<(), RemoteError>;
}
