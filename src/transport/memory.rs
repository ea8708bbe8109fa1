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

//! In-memory transport for testing.
//!
//! [`MemoryTransport::pair`] creates two connected ends; bytes sent on one
//! arrive on the other. One end plays the client, the other the fake Kodi
//! server. [`MemoryConnector`] hands out queued transports one per dial,
//! which makes reconnection sequences scriptable: queue two ends, kill the
//! first, and the supervisor's retry picks up the second.

use crate::transport::{Connector, Transport, TransportError, TransportReader, TransportWriter};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryTransport {
    /// Creates a connected pair of transports.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kodi_control::transport::{MemoryTransport, Transport};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let (client_end, server_end) = MemoryTransport::pair();
    /// let (mut server_rx, mut server_tx) = Box::new(server_end).split();
    /// let (mut client_rx, mut client_tx) = Box::new(client_end).split();
    ///
    /// client_tx.send(b"hello").await.unwrap();
    /// assert_eq!(server_rx.recv().await.unwrap().unwrap(), b"hello");
    /// # }
    /// ```
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        (
            Self { tx: tx_a, rx: rx_b },
            Self { tx: tx_b, rx: rx_a },
        )
    }

    /// Splits into concrete halves.
    #[must_use]
    pub fn into_split(self) -> (MemoryReader, MemoryWriter) {
        (
            MemoryReader { rx: self.rx },
            MemoryWriter { tx: Some(self.tx) },
        )
    }
}

impl Transport for MemoryTransport {
    fn split(self: Box<Self>) -> (Box<dyn TransportReader>, Box<dyn TransportWriter>) {
        let (reader, writer) = (*self).into_split();
        (Box::new(reader), Box::new(writer))
    }
}

/// Read half of a [`MemoryTransport`].
pub struct MemoryReader {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

#[async_trait]
impl TransportReader for MemoryReader {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

/// Write half of a [`MemoryTransport`].
pub struct MemoryWriter {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

#[async_trait]
impl TransportWriter for MemoryWriter {
    async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(payload.to_vec())
            .map_err(|_| TransportError::ConnectionLost {
                reason: "peer dropped".to_string(),
                source: None,
            })
    }

    async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }
}

/// A connector backed by a queue of pre-created transports.
///
/// Each call to [`connect`](Connector::connect) pops the next queued
/// transport; an empty queue fails the attempt like a refused connection.
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    queue: Arc<Mutex<VecDeque<MemoryTransport>>>,
}

impl MemoryConnector {
    /// Creates a connector with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a transport to be handed out by a future dial.
    pub fn push(&self, transport: MemoryTransport) {
        self.queue.lock().push_back(transport);
    }

    /// Number of dials that can currently succeed.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        match self.queue.lock().pop_front() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(TransportError::ConnectionFailed {
                address: "memory".to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "no transport queued"),
            }),
        }
    }

    fn endpoint(&self) -> String {
        "memory".to_string()
    }
}
