//! Key names and their wire identifiers.
//!
//! A [`KeyCodec`] resolves a human key name (`"KEY_VOLUP"`, `"volup"`)
//! against a [`KeyTable`] and yields the identifier the active protocol
//! puts on the wire. The same logical key may differ between TV
//! generations, so the codec is bound to a [`Method`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::config::Method;
use crate::error::RemoteError;

/// Key names understood by Samsung sets of both generations.
pub const DEFAULT_KEYS: &[&str] = &[
    // Power
    "KEY_POWER", "KEY_POWEROFF", "KEY_POWERON", "KEY_SLEEP", "KEY_WAKEUP",
    // Volume
    "KEY_VOLUP", "KEY_VOLDOWN", "KEY_MUTE",
    // Channel
    "KEY_CHUP", "KEY_CHDOWN", "KEY_CH_LIST", "KEY_PRECH", "KEY_FAVCH",
    // Navigation
    "KEY_UP", "KEY_DOWN", "KEY_LEFT", "KEY_RIGHT", "KEY_ENTER", "KEY_RETURN", "KEY_EXIT",
    // Menus
    "KEY_MENU", "KEY_HOME", "KEY_GUIDE", "KEY_INFO", "KEY_TOOLS", "KEY_MORE", "KEY_APPS",
    "KEY_W_LINK", "KEY_CONTENTS", "KEY_SEARCH", "KEY_VOICE", "KEY_TOPMENU",
    // Digits
    "KEY_0", "KEY_1", "KEY_2", "KEY_3", "KEY_4", "KEY_5", "KEY_6", "KEY_7", "KEY_8", "KEY_9",
    "KEY_11", "KEY_12", "KEY_PLUS100", "KEY_DASH",
    // Colour keys
    "KEY_RED", "KEY_GREEN", "KEY_YELLOW", "KEY_BLUE", "KEY_CYAN", "KEY_MAGENTA",
    // Media
    "KEY_PLAY", "KEY_PAUSE", "KEY_STOP", "KEY_REWIND", "KEY_FF", "KEY_REC",
    "KEY_REPEAT", "KEY_SUBTITLE", "KEY_AD", "KEY_3D",
    // Sources
    "KEY_SOURCE", "KEY_TV", "KEY_HDMI", "KEY_HDMI1", "KEY_HDMI2", "KEY_HDMI3", "KEY_HDMI4",
    "KEY_COMPONENT1", "KEY_COMPONENT2", "KEY_AV1", "KEY_AV2", "KEY_AV3",
    "KEY_SVIDEO1", "KEY_SVIDEO2", "KEY_PC", "KEY_DVI", "KEY_DVR", "KEY_DVR_MENU",
    "KEY_ANTENA",
    // Picture / sound
    "KEY_ASPECT", "KEY_PICTURE_SIZE", "KEY_PMODE", "KEY_PSIZE", "KEY_SOUND_MODE",
    "KEY_MAGIC_CHANNEL", "KEY_MAGIC_INFO", "KEY_MAGIC_PICTURE", "KEY_MAGIC_SOUND",
    "KEY_CAPTION", "KEY_CLOCK_DISPLAY", "KEY_SETUP_CLOCK_TIMER",
    // Picture in picture
    "KEY_PIP_ONOFF", "KEY_PIP_SWAP", "KEY_PIP_CHUP", "KEY_PIP_CHDOWN", "KEY_PIP_SIZE",
    "KEY_PIP_SCAN",
    // Teletext
    "KEY_TTX_MIX", "KEY_TTX_SUBFACE",
];

// ── KeyCommand / KeyIdentifier ───────────────────────────────────

/// A key press requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCommand {
    name: String,
}

impl KeyCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for KeyCommand {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for KeyCommand {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// The protocol-specific identifier sent to the TV.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyIdentifier(String);

impl KeyIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── KeyTable ─────────────────────────────────────────────────────

/// The set of key names a codec accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTable {
    names: BTreeSet<String>,
}

impl KeyTable {
    /// The built-in table ([`DEFAULT_KEYS`]).
    pub fn builtin() -> Self {
        Self::from_names(DEFAULT_KEYS.iter().copied())
    }

    /// Build a table from canonical names. Names are normalized the
    /// same way lookups are.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .filter_map(|n| normalize(n.as_ref()))
                .collect(),
        }
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.names.contains(canonical)
    }

    /// Canonical names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Upper-case, add the `KEY_` prefix if missing, and reject anything
/// that is not `[A-Z0-9_]`.
fn normalize(name: &str) -> Option<String> {
    let upper = name.trim().to_ascii_uppercase();
    if upper.is_empty() || !upper.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return None;
    }
    if upper.starts_with("KEY_") {
        Some(upper)
    } else {
        Some(format!("KEY_{upper}"))
    }
}

// ── KeyCodec ─────────────────────────────────────────────────────

/// Resolves key names to wire identifiers for one protocol variant.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    method: Method,
    table: Arc<KeyTable>,
}

impl KeyCodec {
    /// Codec over the built-in table.
    pub fn new(method: Method) -> Self {
        Self::with_table(method, KeyTable::builtin())
    }

    pub fn with_table(method: Method, table: KeyTable) -> Self {
        Self {
            method,
            table: Arc::new(table),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn table(&self) -> &KeyTable {
        &self.table
    }

    /// Resolve `name` to the identifier for this codec's protocol.
    pub fn encode(&self, name: &str) -> Result<KeyIdentifier, RemoteError> {
        let canonical = normalize(name)
            .filter(|c| self.table.contains(c))
            .ok_or_else(|| RemoteError::UnknownKey(name.to_string()))?;

        let wire = match (self.method, canonical.as_str()) {
            // 2016+ sets only have the power toggle.
            (Method::WebSocket, "KEY_POWEROFF") => "KEY_POWER".to_string(),
            _ => canonical,
        };
        Ok(KeyIdentifier(wire))
    }
}

// ── Tests ────────────────────────────────────────────────────────
