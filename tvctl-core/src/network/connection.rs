use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::RemoteError;

/// Run `fut` under an optional deadline.
///
/// `None` waits forever; an elapsed deadline yields [`RemoteError::Timeout`].
pub async fn with_deadline<T, F>(limit: Option<Duration>, fut: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| RemoteError::Timeout(limit))?,
        None => fut.await,
    }
}

/// Where a TV listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Open a TCP stream with Nagle disabled; key presses are tiny.
    pub async fn connect(&self, limit: Option<Duration>) -> Result<TcpStream, RemoteError> {
        let stream = with_deadline(limit, async {
            TcpStream::connect((self.host.as_str(), self.port))
                .await
                .map_err(|e| RemoteError::from_io(e, limit))
        })
        .await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
