//! TCP Connection Management
//!
//! Each plug gets one long-lived TCP connection that is reused across
//! refreshes. The connection is opened lazily, dropped on any I/O error so the
//! next request reconnects, and closed explicitly on disconnect. Plugs hang up
//! idle connections, so a pooled stream that turns out to be closed is
//! replaced once within the same query.

use crate::error::{ExporterError, Result};
use crate::kasa::protocol;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Manages a persistent TCP connection to one plug
pub struct ConnectionManager {
    addr: String,
    timeout: Duration,
    connection: Mutex<Option<TcpStream>>,
}

impl ConnectionManager {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            connection: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<TcpStream> {
        debug!("Connecting to {}", self.addr);
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ExporterError::Timeout(format!("connecting to {}", self.addr)))??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    async fn round_trip(stream: &mut TcpStream, frame: &[u8]) -> Result<Vec<u8>> {
        stream.write_all(frame).await?;

        let mut header = [0u8; 4];
        stream.read_exact(&mut header).await?;
        let len = protocol::frame_len(header)?;

        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await?;
        Ok(protocol::decrypt(&body))
    }

    async fn timed_round_trip(&self, stream: &mut TcpStream, frame: &[u8]) -> Result<Vec<u8>> {
        tokio::time::timeout(self.timeout, Self::round_trip(stream, frame))
            .await
            .map_err(|_| ExporterError::Timeout(format!("query to {}", self.addr)))?
    }

    /// Peer closed the socket before or while we used it
    fn is_stale(error: &ExporterError) -> bool {
        matches!(
            error,
            ExporterError::Io(e) if matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::BrokenPipe
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
            )
        )
    }

    /// Send a JSON command and decode the JSON reply
    pub async fn execute_query<T>(&self, request: &serde_json::Value) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let frame = protocol::encode_frame(&serde_json::to_vec(request)?);
        let mut conn_guard = self.connection.lock().await;

        // Take ownership of the connection; it is only put back after a clean round trip
        let (mut stream, pooled) = match conn_guard.take() {
            Some(stream) => (stream, true),
            None => (self.connect().await?, false),
        };

        let plain = match self.timed_round_trip(&mut stream, &frame).await {
            Ok(plain) => plain,
            Err(e) if pooled && Self::is_stale(&e) => {
                debug!("Pooled connection to {} was closed ({}), reconnecting", self.addr, e);
                stream = self.connect().await?;
                self.timed_round_trip(&mut stream, &frame).await?
            }
            Err(e) => return Err(e),
        };

        *conn_guard = Some(stream);

        serde_json::from_slice(&plain).map_err(ExporterError::Json)
    }

    /// Close the connection
    pub async fn close(&self) -> Result<()> {
        let mut conn_guard = self.connection.lock().await;
        if let Some(mut stream) = conn_guard.take() {
            stream.shutdown().await?;
            info!("Connection to {} closed", self.addr);
        }
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }
}
