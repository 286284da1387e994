use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::error::{PushError, Result};

/// Persistent byte stream to a binary provider gateway.
#[async_trait]
pub trait SocketTransport: Send + Sync + 'static {
    async fn connect(&mut self) -> Result<()>;

    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `max_length` bytes. `None` when nothing arrived in time.
    async fn read(&mut self, max_length: usize) -> Result<Option<Bytes>>;

    /// Read until the peer closes the stream.
    async fn read_to_end(&mut self) -> Result<Bytes>;

    fn is_alive(&self) -> bool;

    async fn disconnect(&mut self);
}

/// TLS socket with client certificate authentication.
pub struct TlsSocket {
    host: String,
    port: u16,
    connector: TlsConnector,
    connect_timeout: Duration,
    read_timeout: Duration,
    stream: Option<TlsStream<TcpStream>>,
}

impl TlsSocket {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        tls: Arc<ClientConfig>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            connector: TlsConnector::from(tls),
            connect_timeout,
            read_timeout,
            stream: None,
        }
    }

    fn stream(&mut self) -> Result<&mut TlsStream<TcpStream>> {
        self.stream
            .as_mut()
            .ok_or_else(|| PushError::Client(format!("Not connected to {}:{}", self.host, self.port)))
    }
}

#[async_trait]
impl SocketTransport for TlsSocket {
    async fn connect(&mut self) -> Result<()> {
        let address = format!("{}:{}", self.host, self.port);
        let server_name = ServerName::try_from(self.host.clone())
            .map_err(|e| PushError::configuration(format!("Invalid host '{}': {}", self.host, e)))?;

        let handshake = async {
            let tcp = TcpStream::connect(&address).await?;
            tcp.set_nodelay(true)?;
            self.connector.connect(server_name, tcp).await
        };
        let stream = timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| PushError::Client(format!("Timed out connecting to {}", address)))??;

        tracing::debug!(address = %address, "Socket connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream()?;
        let written = async {
            stream.write_all(data).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = written {
            self.stream = None;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read(&mut self, max_length: usize) -> Result<Option<Bytes>> {
        let read_timeout = self.read_timeout;
        let stream = self.stream()?;
        let mut buffer = BytesMut::zeroed(max_length);

        match timeout(read_timeout, stream.read(&mut buffer)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => {
                self.stream = None;
                Ok(None)
            }
            Ok(Ok(n)) => {
                buffer.truncate(n);
                Ok(Some(buffer.freeze()))
            }
            Ok(Err(e)) => {
                self.stream = None;
                Err(e.into())
            }
        }
    }

    async fn read_to_end(&mut self) -> Result<Bytes> {
        let read_timeout = self.connect_timeout;
        let stream = self.stream()?;
        let mut data = BytesMut::new();
        let mut chunk = [0u8; 4096];

        loop {
            match timeout(read_timeout, stream.read(&mut chunk)).await {
                Err(_) => {
                    tracing::debug!(received = data.len(), "Read timed out before end of stream");
                    break;
                }
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => data.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => {
                    self.stream = None;
                    return Err(e.into());
                }
            }
        }
        Ok(data.freeze())
    }

    fn is_alive(&self) -> bool {
        self.stream.is_some()
    }

    async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(error = %e, host = %self.host, "Socket shutdown failed");
            }
        }
    }
}
