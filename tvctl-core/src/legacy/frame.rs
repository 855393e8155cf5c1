//! Legacy frame layout and payload builders.
//!
//! ## Wire format
//!
//! Every frame, in both directions (integers little-endian):
//!
//! ```text
//! kind:        u8           0x00 on frames sent by the controller
//! origin_len:  u16
//! origin:      [u8]         empty when sent; the TV's name in replies
//! payload_len: u16
//! payload:     [u8]
//! ```
//!
//! A field inside a payload is `u16 length + bytes`; string fields are
//! base64-encoded first.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use bytes::{BufMut, Bytes, BytesMut};

use crate::config::Config;
use crate::error::RemoteError;
use crate::key::KeyIdentifier;

/// Frame kind used for everything the controller sends.
pub const KIND_OUTGOING: u8 = 0x00;

/// Marker opening the identification payload.
const IDENTIFY_MAGIC: [u8; 2] = [0x64, 0x00];
/// Marker opening a key command payload.
const COMMAND_MAGIC: [u8; 3] = [0x00, 0x00, 0x00];

const GRANTED: [u8; 4] = [0x64, 0x00, 0x01, 0x00];
const DENIED: [u8; 4] = [0x64, 0x00, 0x00, 0x00];
const ACCEPTED: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
const AWAITING_APPROVAL: u8 = 0x0a;
const CANCELLED: u8 = 0x65;

// ── LegacyFrame ──────────────────────────────────────────────────

/// One length-prefixed legacy frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFrame {
    pub kind: u8,
    pub origin: Bytes,
    pub payload: Bytes,
}

impl LegacyFrame {
    /// A controller-to-TV frame carrying `payload`.
    pub fn outgoing(payload: Bytes) -> Self {
        Self {
            kind: KIND_OUTGOING,
            origin: Bytes::new(),
            payload,
        }
    }

    /// The identification frame sent at the start of the handshake.
    pub fn identification(config: &Config) -> Result<Self, RemoteError> {
        let mut payload = BytesMut::new();
        payload.put_slice(&IDENTIFY_MAGIC);
        put_b64_field(&mut payload, "description", config.description.as_bytes())?;
        put_b64_field(&mut payload, "id", config.id.as_bytes())?;
        put_b64_field(&mut payload, "name", config.name.as_bytes())?;
        Ok(Self::outgoing(payload.freeze()))
    }

    /// A key press command.
    pub fn command(key: &KeyIdentifier) -> Result<Self, RemoteError> {
        let mut payload = BytesMut::new();
        payload.put_slice(&COMMAND_MAGIC);
        put_b64_field(&mut payload, "key", key.as_str().as_bytes())?;
        Ok(Self::outgoing(payload.freeze()))
    }

    /// The TV's self-reported name, for logging.
    pub fn origin_lossy(&self) -> String {
        String::from_utf8_lossy(&self.origin).into_owned()
    }
}

/// Write `u16 LE length + base64(data)`.
fn put_b64_field(buf: &mut BytesMut, field: &str, data: &[u8]) -> Result<(), RemoteError> {
    let encoded = B64.encode(data);
    let len = u16::try_from(encoded.len()).map_err(|_| {
        RemoteError::InvalidConfig(format!("{field} is too long for a legacy frame"))
    })?;
    buf.put_u16_le(len);
    buf.put_slice(encoded.as_bytes());
    Ok(())
}

// ── Reply ────────────────────────────────────────────────────────

/// What a reply payload means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Identification accepted.
    Granted,
    /// Identification refused.
    Denied,
    /// The TV is showing an allow/deny prompt; another reply follows.
    AwaitingApproval,
    /// The user dismissed the prompt.
    Cancelled,
    /// A key command was accepted.
    Accepted,
    /// Zero-length payload: the TV is hanging up.
    Empty,
    /// Nothing we recognize.
    Unknown(Bytes),
}

impl Reply {
    pub fn classify(payload: &Bytes) -> Self {
        match payload.as_ref() {
            [] => Reply::Empty,
            p if p == GRANTED => Reply::Granted,
            p if p == DENIED => Reply::Denied,
            p if p == ACCEPTED => Reply::Accepted,
            [AWAITING_APPROVAL, ..] => Reply::AwaitingApproval,
            [CANCELLED, ..] => Reply::Cancelled,
            _ => Reply::Unknown(payload.clone()),
        }
    }
}

/// Render bytes as space-separated hex for error messages.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ────────────────────────────────────────────────────────
