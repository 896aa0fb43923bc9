//! Newline-delimited TCP transport
//!
//! Each line received on the socket is one message. URLs are
//! `tcp://host:port[/path]` or a bare `host:port`; the path is ignored.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use super::{Transport, TransportEvent};

/// TCP transport configuration
#[derive(Debug, Clone)]
pub struct TcpTransportConfig {
    /// Connect must complete within this time
    pub connect_timeout: Duration,

    /// Enable TCP_NODELAY
    pub tcp_nodelay: bool,

    /// Longest accepted line in bytes; longer lines fail the connection
    pub max_line_length: usize,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            tcp_nodelay: true,
            max_line_length: 1024 * 1024, // 1MB
        }
    }
}

impl TcpTransportConfig {
    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set maximum line length
    pub fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }
}

/// Transport reading newline-delimited messages from TCP sockets
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    config: TcpTransportConfig,
}

impl TcpTransport {
    /// Create a transport with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport with custom configuration
    pub fn with_config(config: TcpTransportConfig) -> Self {
        Self { config }
    }
}

impl Transport for TcpTransport {
    fn open(&self, url: &str, buffer: usize) -> mpsc::Receiver<TransportEvent> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let url = url.to_string();
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(reason) = run_connection(&url, &config, &tx).await {
                tracing::debug!(url = %url, error = %reason, "TCP stream failed");
                let _ = tx.send(TransportEvent::Error(reason)).await;
            }
        });

        rx
    }
}

/// Extract `host:port` from a stream URL
pub fn endpoint(url: &str) -> Result<&str, String> {
    let rest = match url.split_once("://") {
        Some(("tcp", rest)) => rest,
        Some((scheme, _)) => return Err(format!("unsupported scheme: {}", scheme)),
        None => url,
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() {
        return Err(format!("missing host in url: {}", url));
    }
    Ok(authority)
}

/// Connect and forward lines until EOF, error, or receiver drop
///
/// Returns `Err` for failures that should reach the consumer as an error.
async fn run_connection(
    url: &str,
    config: &TcpTransportConfig,
    tx: &mpsc::Sender<TransportEvent>,
) -> Result<(), String> {
    let addr = endpoint(url)?;

    let socket = tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| format!("connect timed out after {:?}", config.connect_timeout))?
        .map_err(|e| format!("connect failed: {}", e))?;

    if config.tcp_nodelay {
        socket
            .set_nodelay(true)
            .map_err(|e| format!("set_nodelay failed: {}", e))?;
    }

    tracing::debug!(url = %url, "TCP stream connected");
    if tx.send(TransportEvent::Open).await.is_err() {
        return Ok(());
    }

    let mut reader = BufReader::new(socket);
    let mut line = Vec::new();
    let limit = (config.max_line_length as u64).saturating_add(1);

    loop {
        line.clear();
        let mut limited = (&mut reader).take(limit);

        let read = tokio::select! {
            _ = tx.closed() => {
                tracing::debug!(url = %url, "Receiver dropped, closing TCP stream");
                return Ok(());
            }
            read = limited.read_until(b'\n', &mut line) => read,
        };

        let n = read.map_err(|e| format!("read failed: {}", e))?;
        if n == 0 {
            let _ = tx.send(TransportEvent::Closed).await;
            return Ok(());
        }

        let terminated = line.last() == Some(&b'\n');
        let body = trim_line(&line);
        if !terminated && line.len() as u64 >= limit {
            return Err(format!("line exceeds {} bytes", config.max_line_length));
        }
        if body.is_empty() {
            continue;
        }

        let event = TransportEvent::Message(Bytes::copy_from_slice(body));
        if tx.send(event).await.is_err() {
            return Ok(());
        }
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_endpoint_parsing() {
        assert_eq!(endpoint("tcp://127.0.0.1:9000").unwrap(), "127.0.0.1:9000");
        assert_eq!(endpoint("tcp://logs:9000/tail?q=x").unwrap(), "logs:9000");
        assert_eq!(endpoint("tcp://logs:9000?q=x").unwrap(), "logs:9000");
        assert_eq!(endpoint("tcp://logs:9000#tail").unwrap(), "logs:9000");
        assert_eq!(endpoint("localhost:9000").unwrap(), "localhost:9000");
        assert!(endpoint("ws://localhost:9000").is_err());
        assert!(endpoint("tcp://").is_err());
    }

    #[test]
    fn test_trim_line() {
        assert_eq!(trim_line(b"abc\r\n"), b"abc");
        assert_eq!(trim_line(b"abc\n"), b"abc");
        assert_eq!(trim_line(b"abc"), b"abc");
    }

    #[tokio::test]
    async fn test_reads_lines_then_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"first\r\n\nsecond\nthird").await.unwrap();
        });

        let transport = TcpTransport::new();
        let mut rx = transport.open(&format!("tcp://{}", addr), 16);

        assert_eq!(rx.recv().await, Some(TransportEvent::Open));
        assert_eq!(
            rx.recv().await,
            Some(TransportEvent::Message(Bytes::from_static(b"first")))
        );
        assert_eq!(
            rx.recv().await,
            Some(TransportEvent::Message(Bytes::from_static(b"second")))
        );
        assert_eq!(
            rx.recv().await,
            Some(TransportEvent::Message(Bytes::from_static(b"third")))
        );
        assert_eq!(rx.recv().await, Some(TransportEvent::Closed));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_oversized_line_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(&[b'x'; 64]).await.unwrap();
            socket.write_all(b"\n").await.unwrap();
            // Keep the socket open so EOF does not race the error
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let transport = TcpTransport::with_config(TcpTransportConfig::default().max_line_length(16));
        let mut rx = transport.open(&addr.to_string(), 16);

        assert_eq!(rx.recv().await, Some(TransportEvent::Open));
        assert!(matches!(rx.recv().await, Some(TransportEvent::Error(_))));
    }

    #[tokio::test]
    async fn test_unbounded_line_length() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"hi\n").await.unwrap();
        });

        let config = TcpTransportConfig::default().max_line_length(usize::MAX);
        let transport = TcpTransport::with_config(config);
        let mut rx = transport.open(&addr.to_string(), 16);

        assert_eq!(rx.recv().await, Some(TransportEvent::Open));
        assert_eq!(
            rx.recv().await,
            Some(TransportEvent::Message(Bytes::from_static(b"hi")))
        );
        assert_eq!(rx.recv().await, Some(TransportEvent::Closed));
    }

    #[tokio::test]
    async fn test_connect_failure_is_an_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = TcpTransport::new();
        let mut rx = transport.open(&addr.to_string(), 4);

        assert!(matches!(rx.recv().await, Some(TransportEvent::Error(_))));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_an_error() {
        let transport = TcpTransport::new();
        let mut rx = transport.open("ws://localhost:1", 4);

        match rx.recv().await {
            Some(TransportEvent::Error(reason)) => assert!(reason.contains("unsupported scheme")),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
