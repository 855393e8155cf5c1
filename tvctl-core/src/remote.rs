//! The `Remote` facade: one TV, one protocol, one transport.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{Config, Method};
use crate::error::RemoteError;
use crate::key::{KeyCodec, KeyCommand, KeyTable};
use crate::legacy::LegacyProtocol;
use crate::protocol::Protocol;
use crate::state::ConnectionPhase;
use crate::token::TokenStore;
use crate::websocket::WebSocketProtocol;

/// A remote control bound to one TV.
///
/// Operations take `&mut self`; share a `Remote` across tasks only
/// behind your own lock. Dropping it releases the transport.
pub struct Remote {
    protocol: Box<dyn Protocol>,
    codec: KeyCodec,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Remote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Remote")
            .field("method", &self.protocol.method())
            .field("phase", self.protocol.phase())
            .finish()
    }
}

impl Remote {
    /// Build an unopened remote. Fails with `InvalidConfig` without
    /// touching the network.
    pub fn new<S>(config: Config, store: S) -> Result<Self, RemoteError>
    where
        S: TokenStore + 'static,
    {
        Self::with_key_table(config, store, KeyTable::builtin())
    }

    /// Like [`new`](Self::new) with a caller-supplied key table.
    pub fn with_key_table<S>(config: Config, store: S, table: KeyTable) -> Result<Self, RemoteError>
    where
        S: TokenStore + 'static,
    {
        let method = config.validate()?;
        let protocol: Box<dyn Protocol> = match method {
            Method::Legacy => Box::new(LegacyProtocol::new(config)),
            Method::WebSocket => Box::new(WebSocketProtocol::new(config, Arc::new(store))),
        };
        Ok(Self::from_protocol(protocol, table))
    }

    /// Wrap an existing protocol implementation.
    pub fn from_protocol(protocol: Box<dyn Protocol>, table: KeyTable) -> Self {
        let codec = KeyCodec::with_table(protocol.method(), table);
        Self {
            protocol,
            codec,
            cancel: CancellationToken::new(),
        }
    }

    /// Build and connect. Handshake errors propagate unchanged.
    pub async fn open<S>(config: Config, store: S) -> Result<Self, RemoteError>
    where
        S: TokenStore + 'static,
    {
        let mut remote = Self::new(config, store)?;
        remote.connect().await?;
        Ok(remote)
    }

    /// Build and connect, aborting the handshake when `cancel` fires.
    pub async fn open_with_cancel<S>(
        config: Config,
        store: S,
        cancel: CancellationToken,
    ) -> Result<Self, RemoteError>
    where
        S: TokenStore + 'static,
    {
        let mut remote = Self::new(config, store)?;
        remote.cancel = cancel;
        remote.connect().await?;
        Ok(remote)
    }

    /// Open the connection, including any pairing wait.
    pub async fn connect(&mut self) -> Result<(), RemoteError> {
        let cancel = self.cancel.clone();
        self.protocol.open(&cancel).await
    }

    /// Token that aborts a pending [`connect`](Self::connect) from
    /// elsewhere; the aborted connect fails with `ConnectionClosed`.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Press one key.
    ///
    /// `UnknownKey` leaves the connection usable; transport failures
    /// close it.
    pub async fn control(&mut self, key: impl Into<KeyCommand>) -> Result<(), RemoteError> {
        let key = key.into();
        if !self.protocol.phase().is_ready() {
            return Err(RemoteError::NotConnected);
        }
        let identifier = self.codec.encode(key.name())?;

        match self.protocol.send_key(&identifier).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if e.is_fatal() {
                    warn!(key = %identifier, "send failed, closing connection: {e}");
                    self.protocol.close().await?;
                }
                Err(e)
            }
        }
    }

    /// Release the transport. Safe to call repeatedly and on a
    /// half-opened remote.
    pub async fn close(&mut self) -> Result<(), RemoteError> {
        self.cancel.cancel();
        if !self.protocol.phase().is_closed() {
            debug!("closing remote");
        }
        self.protocol.close().await
    }

    /// Open a remote, run `f` with it and close it exactly once,
    /// whether `f` succeeds or not.
    pub async fn scoped<S, T, F>(config: Config, store: S, f: F) -> Result<T, RemoteError>
    where
        S: TokenStore + 'static,
        F: AsyncFnOnce(&mut Remote) -> Result<T, RemoteError>,
    {
        let mut remote = Self::open(config, store).await?;
        let result = f(&mut remote).await;
        let closed = remote.close().await;
        let value = result?;
        closed?;
        Ok(value)
    }

    pub fn method(&self) -> Method {
        self.protocol.method()
    }

    pub fn phase(&self) -> &ConnectionPhase {
        self.protocol.phase()
    }

    /// Configuration in effect, including a token issued by pairing.
    pub fn config(&self) -> &Config {
        self.protocol.config()
    }

    /// Suggested pause between consecutive key presses.
    pub fn key_interval(&self) -> Duration {
        self.protocol.key_interval()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyIdentifier;
    use crate::token::MemoryTokenStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records calls; `io` counts anything that would touch a transport.
    #[derive(Default)]
    struct Recorder {
        io: usize,
        sent: Vec<String>,
        closes: usize,
    }

    struct FakeProtocol {
        phase: ConnectionPhase,
        config: Config,
        log: Arc<Mutex<Recorder>>,
        fail_with: Option<fn() -> RemoteError>,
    }

    impl FakeProtocol {
        fn new(log: Arc<Mutex<Recorder>>) -> Self {
            Self {
                phase: ConnectionPhase::Unopened,
                config: Config::new("tv", Method::Legacy),
                log,
                fail_with: None,
            }
        }
    }

    #[async_trait]
    impl Protocol for FakeProtocol {
        fn method(&self) -> Method {
            Method::Legacy
        }
        fn phase(&self) -> &ConnectionPhase {
            &self.phase
        }
        fn config(&self) -> &Config {
            &self.config
        }
        fn key_interval(&self) -> Duration {
            Duration::ZERO
        }
        async fn open(&mut self, _cancel: &CancellationToken) -> Result<(), RemoteError> {
            self.log.lock().unwrap().io += 1;
            self.phase.begin_handshake()?;
            self.phase.become_ready()
        }
        async fn send_key(&mut self, key: &KeyIdentifier) -> Result<(), RemoteError> {
            let mut log = self.log.lock().unwrap();
            log.io += 1;
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            log.sent.push(key.to_string());
            Ok(())
        }
        async fn close(&mut self) -> Result<(), RemoteError> {
            if self.phase.close() {
                self.log.lock().unwrap().closes += 1;
            }
            Ok(())
        }
    }

    fn fake() -> (Remote, Arc<Mutex<Recorder>>) {
        let log = Arc::new(Mutex::new(Recorder::default()));
        let remote = Remote::from_protocol(Box::new(FakeProtocol::new(log.clone())), KeyTable::builtin());
        (remote, log)
    }

    #[test]
    fn unrecognized_method_is_invalid_config() {
        let config = Config {
            method: "infrared".into(),
            ..Config::new("tv", Method::Legacy)
        };
        let err = Remote::new(config, MemoryTokenStore::new()).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidConfig(_)));
    }

    #[test]
    fn method_selects_protocol() {
        let r = Remote::new(Config::new("tv", Method::WebSocket), MemoryTokenStore::new()).unwrap();
        assert_eq!(r.method(), Method::WebSocket);
        assert_eq!(r.key_interval(), Duration::from_millis(500));
        assert_eq!(*r.phase(), ConnectionPhase::Unopened);

        let r = Remote::new(Config::new("tv", Method::Legacy), MemoryTokenStore::new()).unwrap();
        assert_eq!(r.method(), Method::Legacy);
        assert_eq!(r.key_interval(), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn control_on_unopened_remote_does_no_io() {
        let (mut remote, log) = fake();
        assert!(matches!(remote.control("KEY_MENU").await, Err(RemoteError::NotConnected)));
        assert_eq!(log.lock().unwrap().io, 0);
    }

    #[tokio::test]
    async fn control_on_closed_remote_does_no_io() {
        let (mut remote, log) = fake();
        remote.connect().await.unwrap();
        remote.close().await.unwrap();
        let before = log.lock().unwrap().io;
        assert!(matches!(remote.control("KEY_MENU").await, Err(RemoteError::NotConnected)));
        assert_eq!(log.lock().unwrap().io, before);
    }

    #[tokio::test]
    async fn unknown_key_keeps_connection() {
        let (mut remote, log) = fake();
        remote.connect().await.unwrap();
        assert!(matches!(remote.control("KEY_WARP").await, Err(RemoteError::UnknownKey(_))));
        assert!(remote.phase().is_ready());
        remote.control("KEY_MENU").await.unwrap();
        assert_eq!(log.lock().unwrap().sent, vec!["KEY_MENU".to_string()]);
    }

    #[tokio::test]
    async fn transport_failure_closes_remote() {
        let log = Arc::new(Mutex::new(Recorder::default()));
        let mut proto = FakeProtocol::new(log.clone());
        proto.fail_with = Some(|| RemoteError::ConnectionClosed);
        let mut remote = Remote::from_protocol(Box::new(proto), KeyTable::builtin());
        remote.connect().await.unwrap();

        assert!(matches!(remote.control("KEY_MENU").await, Err(RemoteError::ConnectionClosed)));
        assert!(remote.phase().is_closed());
        assert!(matches!(remote.control("KEY_MENU").await, Err(RemoteError::NotConnected)));
    }

    #[tokio::test]
    async fn close_twice_releases_once() {
        let (mut remote, log) = fake();
        remote.connect().await.unwrap();
        remote.close().await.unwrap();
        remote.close().await.unwrap();
        assert_eq!(log.lock().unwrap().closes, 1);
    }

    #[tokio::test]
    async fn close_cancels_pending_handle() {
        let (mut remote, _log) = fake();
        let handle = remote.cancel_handle();
        remote.close().await.unwrap();
        assert!(handle.is_cancelled());
    }
}
