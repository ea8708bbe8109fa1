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

//! Transport abstraction: a single connection to a Kodi endpoint.
//!
//! A [`Transport`] owns one network connection and splits into independent
//! read and write halves so the client can pump both directions
//! concurrently. A [`Connector`] is the factory the connection supervisor
//! uses to dial — and re-dial — an endpoint.
//!
//! The underlying socket is owned by the halves; dropping them releases it
//! on every exit path, including panics and task aborts.

use crate::transport::TransportError;
use async_trait::async_trait;

/// A single established connection, ready to be split.
pub trait Transport: Send + std::fmt::Debug {
    /// Splits the transport into independently-owned read and write
    /// halves.
    fn split(self: Box<Self>) -> (Box<dyn TransportReader>, Box<dyn TransportWriter>);
}

/// The inbound half of a transport.
///
/// Yields the connection's byte stream as a lazy sequence of chunks. Chunk
/// boundaries carry no meaning; reassembly into messages is the protocol
/// layer's job.
#[async_trait]
pub trait TransportReader: Send {
    /// Waits for the next inbound chunk.
    ///
    /// Returns `Ok(None)` when the peer closes the connection in an
    /// orderly fashion — closure is signaled, not raised.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on mid-flight I/O failure.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

/// The outbound half of a transport.
#[async_trait]
pub trait TransportWriter: Send {
    /// Writes one complete message payload.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the channel is closed or the write
    /// fails.
    async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Gracefully shuts down the connection.
    ///
    /// After shutdown, `send` fails with [`TransportError::Closed`].
    /// Dropping the writer without calling this still releases the socket.
    async fn shutdown(&mut self) -> Result<(), TransportError>;
}

/// Factory for establishing connections to a fixed endpoint.
///
/// The supervisor holds one connector for the lifetime of the client and
/// calls [`connect`](Connector::connect) for the initial dial and every
/// reconnect attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes a fresh connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionFailed`] on refusal and
    /// [`TransportError::Timeout`] when the endpoint does not answer
    /// within the configured connect timeout.
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError>;

    /// Human-readable endpoint description for logging.
    fn endpoint(&self) -> String;
}
