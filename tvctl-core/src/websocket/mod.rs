//! Websocket (2016+) remote-control protocol.
//!
//! The controller opens `…/api/v2/channels/samsung.remote.control`,
//! preferring the TLS endpoint and falling back once to the plain one.
//! Without a token the TV shows an allow/deny prompt and answers with
//! `ms.channel.connect` carrying a fresh token once the user accepts.

pub mod message;
pub mod tls;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use futures::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, Method};
use crate::error::{Denial, RemoteError};
use crate::key::KeyIdentifier;
use crate::network::with_deadline;
use crate::protocol::Protocol;
use crate::state::ConnectionPhase;
use crate::token::{Token, TokenStore};

pub use message::{Event, control_message};

/// Channel path on both endpoints.
pub const CHANNEL_PATH: &str = "/api/v2/channels/samsung.remote.control";

/// Pause between key presses that websocket sets keep up with.
pub const KEY_INTERVAL: Duration = Duration::from_millis(500);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Which endpoint a connection ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Secure,
    Insecure,
}

/// Build the channel URL. The remote name travels base64-encoded.
pub fn channel_url(secure: bool, host: &str, port: u16, name: &str, token: Option<&Token>) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    let mut url = format!(
        "{scheme}://{host}:{port}{CHANNEL_PATH}?name={}",
        B64.encode(name.as_bytes())
    );
    if let Some(token) = token {
        url.push_str("&token=");
        url.push_str(token.as_str());
    }
    url
}

// ── Handshake ────────────────────────────────────────────────────

/// TLS first, then exactly one plain attempt.
async fn connect_transport(
    config: &Config,
    token: Option<&Token>,
) -> Result<(WsStream, Endpoint), RemoteError> {
    let limit = config.timeout();

    let secure_url = channel_url(true, &config.host, config.secure_port, &config.name, token);
    info!(host = %config.host, port = config.secure_port, "connecting (websocket, tls)");
    let tls = tls::client_config()?;
    let secure = with_deadline(limit, async {
        tokio_tungstenite::connect_async_tls_with_config(
            secure_url,
            None,
            true,
            Some(Connector::Rustls(tls)),
        )
        .await
        .map(|(ws, _)| ws)
        .map_err(|e| RemoteError::from_ws(e, limit))
    })
    .await;

    match secure {
        Ok(ws) => return Ok((ws, Endpoint::Secure)),
        Err(e) => warn!("secure endpoint unavailable ({e}); trying insecure endpoint"),
    }

    let port = config.effective_port(Method::WebSocket);
    let plain_url = channel_url(false, &config.host, port, &config.name, token);
    info!(host = %config.host, port, "connecting (websocket)");
    let ws = with_deadline(limit, async {
        tokio_tungstenite::connect_async(plain_url)
            .await
            .map(|(ws, _)| ws)
            .map_err(|e| RemoteError::from_ws(e, limit))
    })
    .await?;
    Ok((ws, Endpoint::Insecure))
}

/// Read events until the TV decides.
///
/// Returns the token the TV issued, if it differs from `presented`.
/// The caller bounds the wait.
pub async fn await_authorization<S>(
    events: &mut S,
    presented: Option<&Token>,
) -> Result<Option<Token>, RemoteError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let message = match events.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => return Err(RemoteError::from_ws(e, None)),
            None => return Err(RemoteError::ConnectionClosed),
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => return Err(RemoteError::ConnectionClosed),
            Message::Binary(_) => {
                return Err(RemoteError::UnhandledResponse(
                    "binary frame during handshake".into(),
                ));
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };

        match Event::parse(&text)? {
            Event::Connect { token } => {
                debug!("channel connected");
                return Ok(token.filter(|t| Some(t) != presented));
            }
            Event::Unauthorized => {
                let denial = match presented {
                    Some(_) => Denial::TokenRevoked,
                    None => Denial::Rejected,
                };
                return Err(RemoteError::AccessDenied(denial));
            }
            Event::TimedOut => return Err(RemoteError::AccessDenied(Denial::PairingTimedOut)),
            Event::Informational(name) => debug!(event = %name, "ignoring event during handshake"),
            Event::Other(_) => return Err(RemoteError::UnhandledResponse(text.to_string())),
        }
    }
}

// ── WebSocketProtocol ────────────────────────────────────────────

/// Websocket protocol with pairing and token persistence.
pub struct WebSocketProtocol {
    config: Config,
    store: Arc<dyn TokenStore>,
    phase: ConnectionPhase,
    socket: Option<WsStream>,
    endpoint: Option<Endpoint>,
}

impl WebSocketProtocol {
    pub fn new(config: Config, store: Arc<dyn TokenStore>) -> Self {
        Self {
            config,
            store,
            phase: ConnectionPhase::Unopened,
            socket: None,
            endpoint: None,
        }
    }

    /// The endpoint the last open reached.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.endpoint
    }

    async fn handshake(&mut self, presented: Option<Token>) -> Result<(), RemoteError> {
        let limit = self.config.timeout();
        let (mut socket, endpoint) = connect_transport(&self.config, presented.as_ref()).await?;
        self.endpoint = Some(endpoint);

        if presented.is_none() {
            self.phase.await_pairing()?;
            warn!("no token yet: allow the pairing request on the TV");
        }

        let verdict = with_deadline(limit, await_authorization(&mut socket, presented.as_ref())).await;
        let issued = match verdict {
            Ok(issued) => issued,
            Err(e) => {
                release(&mut socket).await;
                return Err(e);
            }
        };

        match (issued, presented) {
            (Some(token), _) => {
                info!("TV issued a new token");
                if let Err(e) = self.store.save(&token) {
                    release(&mut socket).await;
                    return Err(e);
                }
                self.config.token = Some(token.into_string());
                self.config.paired = true;
            }
            (None, Some(token)) => {
                self.config.token = Some(token.into_string());
                self.config.paired = true;
            }
            (None, None) => debug!("TV accepted the controller without issuing a token"),
        }

        self.socket = Some(socket);
        self.phase.become_ready()
    }
}

async fn release(socket: &mut WsStream) {
    if let Err(e) = socket.close(None).await {
        debug!("closing websocket: {e}");
    }
}

#[async_trait]
impl Protocol for WebSocketProtocol {
    fn method(&self) -> Method {
        Method::WebSocket
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
        let presented = self
            .config
            .token
            .clone()
            .map(Token::new)
            .or_else(|| self.store.load());

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RemoteError::ConnectionClosed),
            r = self.handshake(presented) => r,
        };

        if let Err(e) = result {
            self.socket = None;
            self.phase.close();
            return Err(e);
        }
        info!(endpoint = ?self.endpoint, "websocket connection ready");
        Ok(())
    }

    async fn send_key(&mut self, key: &KeyIdentifier) -> Result<(), RemoteError> {
        let socket = match (&self.phase, self.socket.as_mut()) {
            (ConnectionPhase::Ready { .. }, Some(socket)) => socket,
            _ => return Err(RemoteError::NotConnected),
        };
        let limit = self.config.timeout();
        let text = control_message(key)?;

        info!(key = %key, "sending key");
        with_deadline(limit, async {
            socket
                .send(Message::Text(text.into()))
                .await
                .map_err(|e| RemoteError::from_ws(e, limit))
        })
        .await
    }

    async fn close(&mut self) -> Result<(), RemoteError> {
        if let Some(mut socket) = self.socket.take() {
            release(&mut socket).await;
            debug!(uptime = ?self.phase.ready_duration(), "websocket connection closed");
        }
        self.phase.close();
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
