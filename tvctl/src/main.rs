//! tvctl: send remote-control keys to a Samsung TV.
//!
//! ```text
//! tvctl KEY_VOLUP KEY_VOLUP        Press keys using tvctl.toml
//! tvctl --host 10.0.0.5 --method websocket KEY_HOME
//! tvctl --config <path>            Use custom config TOML
//! tvctl --gen-config               Dump default config and exit
//! tvctl --list-keys                Print known key names and exit
//! ```

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tvctl::config::AppConfig;
use tvctl::store::FileTokenStore;
use tvctl_core::{CancellationToken, DEFAULT_KEYS, Denial, Remote, RemoteError};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tvctl", version, about = "Samsung TV remote control")]
struct Cli {
    /// Path to configuration TOML file. A pairing token is saved here.
    #[arg(short, long, default_value = "tvctl.toml")]
    config: PathBuf,

    /// TV address (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// TV port (overrides config). 0 picks the protocol default.
    #[arg(short, long)]
    port: Option<u16>,

    /// Protocol: "legacy" or "websocket" (overrides config).
    #[arg(short, long)]
    method: Option<String>,

    /// Controller name shown on the TV (overrides config).
    #[arg(short, long)]
    name: Option<String>,

    /// Seconds per blocking operation, 0 for none (overrides config).
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Milliseconds between key presses. Defaults to the protocol's pacing.
    #[arg(short, long)]
    interval: Option<u64>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Print the built-in key names and exit.
    #[arg(long)]
    list_keys: bool,

    /// Keys to press, in order. With none, only connect (and pair).
    keys: Vec<String>,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        let remote = &mut config.remote;
        if let Some(host) = &self.host {
            remote.host = host.clone();
        }
        if let Some(port) = self.port {
            remote.port = port;
        }
        if let Some(method) = &self.method {
            remote.method = method.clone();
        }
        if let Some(name) = &self.name {
            remote.name = name.clone();
        }
        if let Some(timeout) = self.timeout {
            remote.timeout = timeout;
        }
    }
}

fn init_tracing(config: &AppConfig) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.file.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

async fn press_all(remote: &mut Remote, keys: &[String], interval: Duration) -> Result<(), RemoteError> {
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(interval).await;
        }
        remote.control(key.as_str()).await?;
    }
    Ok(())
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", AppConfig::default_toml()?);
        return Ok(());
    }
    if cli.list_keys {
        for key in DEFAULT_KEYS {
            println!("{key}");
        }
        return Ok(());
    }

    let mut config = AppConfig::load(&cli.config)?;
    cli.apply(&mut config);
    init_tracing(&config)?;

    info!("tvctl v{}", env!("CARGO_PKG_VERSION"));

    // Ctrl-C aborts a pending pairing prompt.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted");
            on_interrupt.cancel();
        }
    });

    let store = FileTokenStore::new(&cli.config);
    let mut remote = match Remote::open_with_cancel(config.remote, store, cancel).await {
        Ok(remote) => remote,
        Err(e) => {
            if let RemoteError::AccessDenied(Denial::TokenRevoked) = e {
                error!(
                    "the TV no longer accepts the saved token; remove `token` from {} and pair again",
                    cli.config.display()
                );
            }
            return Err(e.into());
        }
    };
    info!(method = %remote.method(), "connected to {}", remote.config().host);

    let interval = cli
        .interval
        .map(Duration::from_millis)
        .unwrap_or_else(|| remote.key_interval());
    let pressed = press_all(&mut remote, &cli.keys, interval).await;
    let closed = remote.close().await;

    pressed?;
    closed?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_settings() {
        let cli = Cli::try_parse_from([
            "tvctl", "--host", "10.0.0.5", "-m", "websocket", "-t", "3", "KEY_HOME", "KEY_OK",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        config.remote.name = "den".into();
        cli.apply(&mut config);

        assert_eq!(config.remote.host, "10.0.0.5");
        assert_eq!(config.remote.method, "websocket");
        assert_eq!(config.remote.timeout, 3);
        assert_eq!(config.remote.name, "den");
        assert_eq!(cli.keys, ["KEY_HOME", "KEY_OK"]);
        assert_eq!(cli.config, PathBuf::from("tvctl.toml"));
    }

    #[tokio::test]
    async fn press_all_with_no_keys_is_a_no_op() {
        let mut remote = Remote::new(
            tvctl_core::Config::new("tv", tvctl_core::Method::Legacy),
            tvctl_core::MemoryTokenStore::new(),
        )
        .unwrap();
        press_all(&mut remote, &[], Duration::ZERO).await.unwrap();
        let err = press_all(&mut remote, &["KEY_MENU".into()], Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotConnected));
    }
}
