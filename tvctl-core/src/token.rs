//! Persistence seam for the websocket authentication token.
//!
//! The engine decides *when* a token is needed and *when* a fresh one
//! must be written back; a [`TokenStore`] decides *where*.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::RemoteError;

/// Opaque credential issued by a TV during pairing.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<{} chars>)", self.0.len())
    }
}

/// Load/save capability backed by whatever holds the configuration.
pub trait TokenStore: Send + Sync {
    /// The persisted token, if any.
    fn load(&self) -> Option<Token>;

    /// Persist a freshly issued token and mark the remote as paired.
    fn save(&self, token: &Token) -> Result<(), RemoteError>;
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn load(&self) -> Option<Token> {
        (**self).load()
    }

    fn save(&self, token: &Token) -> Result<(), RemoteError> {
        (**self).save(token)
    }
}

// ── MemoryTokenStore ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct Slot {
    token: Option<Token>,
    saves: usize,
}

/// In-process store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Slot>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `token`.
    pub fn with_token(token: Token) -> Self {
        let store = Self::default();
        if let Ok(mut slot) = store.slot.lock() {
            slot.token = Some(token);
        }
        store
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.slot.lock().map(|s| s.saves).unwrap_or_default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<Token> {
        self.slot.lock().ok().and_then(|s| s.token.clone())
    }

    fn save(&self, token: &Token) -> Result<(), RemoteError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| RemoteError::TokenStore("token slot poisoned".into()))?;
        slot.token = Some(token.clone());
        slot.saves += 1;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
