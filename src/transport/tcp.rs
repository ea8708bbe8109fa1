//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! TCP transport for Kodi's persistent socket channel.
//!
//! Kodi's TCP JSON-RPC service (conventionally port 9090) keeps a single
//! long-lived connection per client and is the only channel on which the
//! server pushes notifications.

use crate::transport::{Connector, Transport, TransportError, TransportReader, TransportWriter};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Read buffer size for inbound chunks.
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// A connected TCP transport.
///
/// Created by [`TcpConnector`]; usually consumed by the supervisor via
/// [`Transport::split`] rather than used directly.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Wraps an already-connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Splits into concrete read and write halves.
    #[must_use]
    pub fn into_split(self) -> (TcpReader, TcpWriter) {
        let (read_half, write_half) = self.stream.into_split();
        (
            TcpReader {
                read_half,
                buf: vec![0u8; READ_BUFFER_SIZE],
            },
            TcpWriter {
                write_half: Some(write_half),
            },
        )
    }
}

impl Transport for TcpTransport {
    fn split(self: Box<Self>) -> (Box<dyn TransportReader>, Box<dyn TransportWriter>) {
        let (reader, writer) = (*self).into_split();
        (Box::new(reader), Box::new(writer))
    }
}

/// Read half of a [`TcpTransport`].
pub struct TcpReader {
    read_half: OwnedReadHalf,
    buf: Vec<u8>,
}

#[async_trait]
impl TransportReader for TcpReader {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let n = self
            .read_half
            .read(&mut self.buf)
            .await
            .map_err(|source| TransportError::RecvFailed { source })?;
        if n == 0 {
            debug!("peer closed the TCP stream");
            return Ok(None);
        }
        Ok(Some(self.buf[..n].to_vec()))
    }
}

/// Write half of a [`TcpTransport`].
pub struct TcpWriter {
    write_half: Option<OwnedWriteHalf>,
}

#[async_trait]
impl TransportWriter for TcpWriter {
    async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let write_half = self.write_half.as_mut().ok_or(TransportError::Closed)?;
        write_half
            .write_all(payload)
            .await
            .map_err(|source| TransportError::SendFailed { source })?;
        write_half
            .flush()
            .await
            .map_err(|source| TransportError::SendFailed { source })
    }

    async fn shutdown(&mut self) -> Result<(), TransportError> {
        if let Some(mut write_half) = self.write_half.take() {
            write_half
                .shutdown()
                .await
                .map_err(|source| TransportError::SendFailed { source })?;
        }
        Ok(())
    }
}

/// Connector dialing a Kodi TCP endpoint.
///
/// # Example
///
/// ```rust,no_run
/// use kodi_control::transport::{Connector, TcpConnector};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let connector = TcpConnector::new("192.168.1.50:9090", Duration::from_secs(5));
/// let transport = connector.connect().await?;
/// # Ok(())
/// # }
/// ```
pub struct TcpConnector {
    address: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Creates a connector for `address` (`host:port`).
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        let connect = TcpStream::connect(&self.address);
        let stream = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(TransportError::ConnectionFailed {
                    address: self.address.clone(),
                    source,
                });
            }
            Err(_) => {
                return Err(TransportError::Timeout {
                    duration: self.connect_timeout,
                });
            }
        };

        info!(address = %self.address, "TCP connection established");
        Ok(Box::new(TcpTransport::from_stream(stream)))
    }

    fn endpoint(&self) -> String {
        format!("tcp://{}", self.address)
    }
}
