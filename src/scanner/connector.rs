//! TCP Connectors
//!
//! The engine never touches sockets directly. It asks a `Connector` to
//! attempt a single connection, which keeps the probing logic testable with
//! instrumented fakes.

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;

/// Opens (and immediately closes) one TCP connection
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Attempt a connection to `host:port` within `timeout`
    ///
    /// `Ok(())` means the remote end accepted the connection. Any error,
    /// including the timeout itself, means the port is not open.
    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> io::Result<()>;
}

/// Connector backed by `tokio::net::TcpStream`
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> io::Result<()> {
        // Name resolution counts against the per-port budget.
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timeout"))??;
        drop(stream);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = TcpConnector
            .connect("127.0.0.1", port, Duration::from_secs(1))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpConnector
            .connect("127.0.0.1", port, Duration::from_secs(1))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unresolvable_host() {
        let result = TcpConnector
            .connect("host.invalid", 80, Duration::from_secs(2))
            .await;
        assert!(result.is_err());
    }
}
