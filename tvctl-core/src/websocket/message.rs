//! JSON messages exchanged on the remote-control channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;
use crate::key::KeyIdentifier;
use crate::token::Token;

/// Method name of key press commands.
pub const CONTROL_METHOD: &str = "ms.remote.control";

/// Envelope of every message the controller sends.
#[derive(Debug, Serialize)]
pub struct Envelope<P> {
    pub method: &'static str,
    pub params: P,
}

/// Parameters of a key press.
#[derive(Debug, Serialize)]
pub struct ControlParams<'a> {
    #[serde(rename = "Cmd")]
    pub cmd: &'static str,
    #[serde(rename = "DataOfCmd")]
    pub data_of_cmd: &'a str,
    #[serde(rename = "Option")]
    pub option: &'static str,
    #[serde(rename = "TypeOfRemote")]
    pub type_of_remote: &'static str,
}

/// Serialize a single "Click" of `key`.
pub fn control_message(key: &KeyIdentifier) -> Result<String, RemoteError> {
    let envelope = Envelope {
        method: CONTROL_METHOD,
        params: ControlParams {
            cmd: "Click",
            data_of_cmd: key.as_str(),
            option: "false",
            type_of_remote: "SendRemoteKey",
        },
    };
    Ok(serde_json::to_string(&envelope)?)
}

// ── Events ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    data: Option<Value>,
}

/// A server-pushed event, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The channel is open; may carry a token.
    Connect { token: Option<Token> },
    /// The TV refused the controller or its token.
    Unauthorized,
    /// The pairing prompt expired on the TV.
    TimedOut,
    /// Chatter that does not affect the handshake.
    Informational(String),
    /// An event we have no handling for.
    Other(String),
}

const INFORMATIONAL: &[&str] = &[
    "ms.channel.ready",
    "ms.channel.clientConnect",
    "ms.channel.clientDisconnect",
    "ms.remote.touchEnable",
    "ms.remote.touchDisable",
];

impl Event {
    /// Parse a text frame. Non-JSON or event-less text is an
    /// [`RemoteError::UnhandledResponse`].
    pub fn parse(text: &str) -> Result<Self, RemoteError> {
        let raw: RawEvent = serde_json::from_str(text)
            .map_err(|_| RemoteError::UnhandledResponse(text.to_string()))?;

        Ok(match raw.event.as_str() {
            "ms.channel.connect" => Event::Connect {
                token: raw.data.as_ref().and_then(token_of),
            },
            "ms.channel.unauthorized" => Event::Unauthorized,
            "ms.channel.timeOut" => Event::TimedOut,
            name if INFORMATIONAL.contains(&name) => Event::Informational(raw.event),
            _ => Event::Other(raw.event),
        })
    }
}

/// Some firmwares send the token as a number.
fn token_of(data: &Value) -> Option<Token> {
    match data.get("token")? {
        Value::String(s) if !s.is_empty() => Some(Token::new(s.clone())),
        Value::Number(n) => Some(Token::new(n.to_string())),
        _ => None,
    }
}

// ── Tests ────────────────────────────────────────────────────────
