//! Token persistence in the client's TOML config file.

use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::{debug, info};
use tvctl_core::{RemoteError, Token, TokenStore};

/// Stores the pairing token under `[remote]` in a TOML file, leaving
/// every other key as it was.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<Table, RemoteError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => text.parse::<Table>().map_err(|e| {
                RemoteError::TokenStore(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Table::new()),
            Err(e) => Err(RemoteError::TokenStore(format!("{}: {e}", self.path.display()))),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<Token> {
        let table = match self.read_table() {
            Ok(table) => table,
            Err(e) => {
                debug!("no stored token: {e}");
                return None;
            }
        };
        table
            .get("remote")?
            .get("token")?
            .as_str()
            .filter(|t| !t.is_empty())
            .map(Token::new)
    }

    fn save(&self, token: &Token) -> Result<(), RemoteError> {
        let mut table = self.read_table()?;
        let remote = table
            .entry("remote")
            .or_insert_with(|| Value::Table(Table::new()));
        let Value::Table(remote) = remote else {
            return Err(RemoteError::TokenStore(format!(
                "{}: `remote` is not a table",
                self.path.display()
            )));
        };
        remote.insert("token".into(), Value::String(token.as_str().into()));
        remote.insert("paired".into(), Value::Boolean(true));

        let text = toml::to_string_pretty(&table)
            .map_err(|e| RemoteError::TokenStore(e.to_string()))?;

        // Write-then-rename so a crash never leaves a truncated config.
        let staging = self.path.with_extension("toml.tmp");
        std::fs::write(&staging, text)
            .and_then(|()| std::fs::rename(&staging, &self.path))
            .map_err(|e| RemoteError::TokenStore(format!("{}: {e}", self.path.display())))?;

        info!(path = %self.path.display(), "saved pairing token");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tvctl.toml"));
        assert_eq!(store.load(), None);

        store.save(&Token::new("31415926")).unwrap();
        assert_eq!(store.load(), Some(Token::new("31415926")));
    }

    #[test]
    fn save_preserves_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tvctl.toml");
        std::fs::write(
            &path,
            "[remote]\nhost = \"192.168.1.40\"\nmethod = \"websocket\"\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        FileTokenStore::new(&path).save(&Token::new("abc")).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.remote.host, "192.168.1.40");
        assert_eq!(config.remote.method, "websocket");
        assert_eq!(config.remote.token.as_deref(), Some("abc"));
        assert!(config.remote.paired);
        assert_eq!(config.logging.level, "debug");
        assert!(!dir.path().join("tvctl.toml.tmp").exists());
    }

    #[test]
    fn save_overwrites_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tvctl.toml"));
        store.save(&Token::new("old")).unwrap();
        store.save(&Token::new("new")).unwrap();
        assert_eq!(store.load(), Some(Token::new("new")));
    }

    #[test]
    fn malformed_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tvctl.toml");
        std::fs::write(&path, "remote = 3").unwrap();
        let store = FileTokenStore::new(&path);

        assert_eq!(store.load(), None);
        let err = store.save(&Token::new("x")).unwrap_err();
        assert!(matches!(err, RemoteError::TokenStore(_)));
    }
}
