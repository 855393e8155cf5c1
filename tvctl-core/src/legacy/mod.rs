//! Legacy (pre-2016) binary TCP protocol.
//!
//! ```text
//!  controller                               TV
//!      │ ── identification(description,id,name) ──► │
//!      │ ◄── 0a ..  (allow prompt shown) ────────── │   zero or more
//!      │ ◄── 64 00 01 00  granted ───────────────── │
//!      │ ── command(KEY_…) ───────────────────────► │   fire and forget
//! ```

pub mod codec;
pub mod frame;

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, Method};
use crate::error::{Denial, RemoteError};
use crate::key::KeyIdentifier;
use crate::network::{ConnectionInfo, with_deadline};
use crate::protocol::Protocol;
use crate::state::ConnectionPhase;

pub use codec::LegacyCodec;
pub use frame::{LegacyFrame, Reply};

/// Pause between key presses that legacy sets keep up with.
pub const KEY_INTERVAL: Duration = Duration::from_millis(200);

// ── Exchanges ────────────────────────────────────────────────────

fn normalize(err: RemoteError, limit: Option<Duration>) -> RemoteError {
    match err {
        RemoteError::Io(io) => RemoteError::from_io(io, limit),
        other => other,
    }
}

async fn send_frame<S>(
    framed: &mut Framed<S, LegacyCodec>,
    frame: LegacyFrame,
    limit: Option<Duration>,
) -> Result<(), RemoteError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    with_deadline(limit, async {
        framed.send(frame).await.map_err(|e| normalize(e, limit))
    })
    .await
}

async fn next_reply<S>(
    framed: &mut Framed<S, LegacyCodec>,
    limit: Option<Duration>,
) -> Result<LegacyFrame, RemoteError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    with_deadline(limit, async {
        match framed.next().await {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(e)) => Err(normalize(e, limit)),
            None => Err(RemoteError::ConnectionClosed),
        }
    })
    .await
}

/// Send the identification frame and wait for the TV's verdict.
///
/// Every read is bounded by `limit`, including reads while the TV
/// shows its allow/deny prompt.
pub async fn identify<S>(
    framed: &mut Framed<S, LegacyCodec>,
    config: &Config,
    limit: Option<Duration>,
) -> Result<(), RemoteError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    debug!("sending identification");
    send_frame(framed, LegacyFrame::identification(config)?, limit).await?;

    let mut prompted = false;
    loop {
        let reply = next_reply(framed, limit).await?;
        match Reply::classify(&reply.payload) {
            Reply::Granted | Reply::Accepted => {
                debug!(tv = %reply.origin_lossy(), "access granted");
                return Ok(());
            }
            Reply::AwaitingApproval => {
                if !prompted {
                    warn!("waiting for the controller to be allowed on the TV");
                    prompted = true;
                }
            }
            Reply::Denied => return Err(RemoteError::AccessDenied(Denial::Rejected)),
            Reply::Cancelled => return Err(RemoteError::AccessDenied(Denial::Cancelled)),
            Reply::Empty => return Err(RemoteError::ConnectionClosed),
            Reply::Unknown(bytes) => {
                return Err(RemoteError::UnhandledResponse(frame::hex(&bytes)));
            }
        }
    }
}

/// Write one key command. No reply is awaited.
pub async fn send_command<S>(
    framed: &mut Framed<S, LegacyCodec>,
    key: &KeyIdentifier,
    limit: Option<Duration>,
) -> Result<(), RemoteError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_frame(framed, LegacyFrame::command(key)?, limit).await
}

// ── LegacyProtocol ───────────────────────────────────────────────

/// Legacy protocol over TCP.
pub struct LegacyProtocol {
    config: Config,
    phase: ConnectionPhase,
    framed: Option<Framed<TcpStream, LegacyCodec>>,
}

impl LegacyProtocol {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            phase: ConnectionPhase::Unopened,
            framed: None,
        }
    }

    fn endpoint(&self) -> ConnectionInfo {
        ConnectionInfo::new(
            self.config.host.clone(),
            self.config.effective_port(Method::Legacy),
        )
    }

    async fn connect_and_identify(&self) -> Result<Framed<TcpStream, LegacyCodec>, RemoteError> {
        let limit = self.config.timeout();
        let endpoint = self.endpoint();

        info!(%endpoint, "connecting (legacy)");
        let stream = endpoint.connect(limit).await?;
        let mut framed = Framed::new(stream, LegacyCodec);
        identify(&mut framed, &self.config, limit).await?;
        Ok(framed)
    }
}

#[async_trait]
impl Protocol for LegacyProtocol {
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
        KEY_INTERVAL
    }

    async fn open(&mut self, cancel: &CancellationToken) -> Result<(), RemoteError> {
        self.phase.begin_handshake()?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RemoteError::ConnectionClosed),
            r = self.connect_and_identify() => r,
        };

        match result {
            Ok(framed) => {
                self.framed = Some(framed);
                self.phase.become_ready()?;
                info!("legacy connection ready");
                Ok(())
            }
            Err(e) => {
                self.phase.close();
                Err(e)
            }
        }
    }

    async fn send_key(&mut self, key: &KeyIdentifier) -> Result<(), RemoteError> {
        let framed = match (&self.phase, self.framed.as_mut()) {
            (ConnectionPhase::Ready { .. }, Some(framed)) => framed,
            _ => return Err(RemoteError::NotConnected),
        };
        info!(key = %key, "sending key");
        send_command(framed, key, self.config.timeout()).await
    }

    async fn close(&mut self) -> Result<(), RemoteError> {
        if let Some(mut framed) = self.framed.take() {
            if let Err(e) = framed.get_mut().shutdown().await {
                debug!("shutdown after close: {e}");
            }
            debug!(uptime = ?self.phase.ready_duration(), "legacy connection closed");
        }
        self.phase.close();
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyCodec;
    use tokio_test::io::Builder;

    fn config() -> Config {
        Config {
            description: "PC".into(),
            id: "tv1".into(),
            name: "tvctl".into(),
            ..Config::new("192.168.0.10", Method::Legacy)
        }
    }

    fn wire(frame: LegacyFrame) -> Vec<u8> {
        let mut buf = bytes::BytesMut::new();
        tokio_util::codec::Encoder::encode(&mut LegacyCodec, frame, &mut buf).unwrap();
        buf.to_vec()
    }

    fn reply(payload: &[u8]) -> Vec<u8> {
        let mut v = vec![0x00, 0x02, 0x00, b't', b'v'];
        v.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        v.extend_from_slice(payload);
        v
    }

    #[tokio::test]
    async fn identify_granted() {
        let mock = Builder::new()
            .write(&wire(LegacyFrame::identification(&config()).unwrap()))
            .read(&reply(&[0x64, 0x00, 0x01, 0x00]))
            .build();
        let mut framed = Framed::new(mock, LegacyCodec);
        identify(&mut framed, &config(), None).await.unwrap();
    }

    #[tokio::test]
    async fn identify_waits_through_prompt() {
        let mock = Builder::new()
            .write(&wire(LegacyFrame::identification(&config()).unwrap()))
            .read(&reply(&[0x0a, 0x00, 0x02, 0x00, 0x00, 0x00]))
            .read(&reply(&[0x0a, 0x00, 0x01, 0x00, 0x00, 0x00]))
            .read(&reply(&[0x64, 0x00, 0x01, 0x00]))
            .build();
        let mut framed = Framed::new(mock, LegacyCodec);
        identify(&mut framed, &config(), None).await.unwrap();
    }

    #[tokio::test]
    async fn identify_rejected() {
        let mock = Builder::new()
            .write(&wire(LegacyFrame::identification(&config()).unwrap()))
            .read(&reply(&[0x64, 0x00, 0x00, 0x00]))
            .build();
        let mut framed = Framed::new(mock, LegacyCodec);
        let err = identify(&mut framed, &config(), None).await.unwrap_err();
        assert!(matches!(err, RemoteError::AccessDenied(Denial::Rejected)));
    }

    #[tokio::test]
    async fn identify_cancelled_on_tv() {
        let mock = Builder::new()
            .write(&wire(LegacyFrame::identification(&config()).unwrap()))
            .read(&reply(&[0x0a, 0x00]))
            .read(&reply(&[0x65, 0x00]))
            .build();
        let mut framed = Framed::new(mock, LegacyCodec);
        let err = identify(&mut framed, &config(), None).await.unwrap_err();
        assert!(matches!(err, RemoteError::AccessDenied(Denial::Cancelled)));
    }

    #[tokio::test]
    async fn identify_unknown_reply() {
        let mock = Builder::new()
            .write(&wire(LegacyFrame::identification(&config()).unwrap()))
            .read(&reply(&[0x42, 0x42]))
            .build();
        let mut framed = Framed::new(mock, LegacyCodec);
        let err = identify(&mut framed, &config(), None).await.unwrap_err();
        assert!(matches!(err, RemoteError::UnhandledResponse(ref s) if s == "42 42"));
    }

    #[tokio::test]
    async fn identify_eof_is_connection_closed() {
        let mock = Builder::new()
            .write(&wire(LegacyFrame::identification(&config()).unwrap()))
            .build();
        let mut framed = Framed::new(mock, LegacyCodec);
        let err = identify(&mut framed, &config(), None).await.unwrap_err();
        assert!(matches!(err, RemoteError::ConnectionClosed));
    }

    #[tokio::test]
    async fn identify_truncated_reply_is_connection_closed() {
        let mock = Builder::new()
            .write(&wire(LegacyFrame::identification(&config()).unwrap()))
            .read(&[0x00, 0x02, 0x00, b't', b'v', 0x04, 0x00, 0x64, 0x00])
            .build();
        let mut framed = Framed::new(mock, LegacyCodec);
        let err = identify(&mut framed, &config(), None).await.unwrap_err();
        assert!(matches!(err, RemoteError::ConnectionClosed));
    }

    #[tokio::test]
    async fn identify_empty_payload_is_connection_closed() {
        let mock = Builder::new()
            .write(&wire(LegacyFrame::identification(&config()).unwrap()))
            .read(&reply(&[]))
            .build();
        let mut framed = Framed::new(mock, LegacyCodec);
        let err = identify(&mut framed, &config(), None).await.unwrap_err();
        assert!(matches!(err, RemoteError::ConnectionClosed));
    }

    #[tokio::test]
    async fn command_is_written_without_waiting_for_reply() {
        let key = KeyCodec::new(Method::Legacy).encode("KEY_VOLUP").unwrap();
        let mock = Builder::new().write(&wire(LegacyFrame::command(&key).unwrap())).build();
        let mut framed = Framed::new(mock, LegacyCodec);
        send_command(&mut framed, &key, None).await.unwrap();
    }

    #[tokio::test]
    async fn broken_pipe_on_command_is_connection_closed() {
        let key = KeyCodec::new(Method::Legacy).encode("KEY_VOLUP").unwrap();
        let mock = Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "reset"))
            .build();
        let mut framed = Framed::new(mock, LegacyCodec);
        let err = send_command(&mut framed, &key, None).await.unwrap_err();
        assert!(matches!(err, RemoteError::ConnectionClosed));
    }

    #[tokio::test]
    async fn send_before_open_is_not_connected() {
        let mut proto = LegacyProtocol::new(config());
        let key = KeyCodec::new(Method::Legacy).encode("KEY_MENU").unwrap();
        assert!(matches!(proto.send_key(&key).await, Err(RemoteError::NotConnected)));
    }

    #[tokio::test]
    async fn close_is_idempotent_before_open() {
        let mut proto = LegacyProtocol::new(config());
        proto.close().await.unwrap();
        proto.close().await.unwrap();
        assert!(proto.phase().is_closed());
    }
}
