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

//! HTTP transport for Kodi's `POST /jsonrpc` endpoint.
//!
//! The HTTP channel is request/response only: each outbound message is one
//! POST, and the response body is delivered back through the same inbound
//! path the socket transport uses, so the dispatcher is transport
//! agnostic. HTTP has no server push, so notifications never arrive on
//! this transport; subscriptions simply do not fire.
//!
//! Connections are keep-alive pooled by the underlying client, so
//! consecutive calls reuse the same socket.

use crate::transport::{Connector, Transport, TransportError, TransportReader, TransportWriter};
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Probe request sent by [`HttpConnector::connect`] to verify the endpoint
/// is reachable. Id 0 is reserved and never allocated to a real call.
const PING_PROBE: &[u8] = br#"{"jsonrpc":"2.0","id":0,"method":"JSONRPC.Ping"}"#;

/// An HTTP transport bound to a `/jsonrpc` URL.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

impl Transport for HttpTransport {
    fn split(self: Box<Self>) -> (Box<dyn TransportReader>, Box<dyn TransportWriter>) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        (
            Box::new(HttpReader { inbound_rx }),
            Box::new(HttpWriter {
                client: Some(self.client),
                url: self.url,
                inbound_tx,
            }),
        )
    }
}

/// Read half of an [`HttpTransport`]: yields queued response bodies.
pub struct HttpReader {
    inbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

#[async_trait]
impl TransportReader for HttpReader {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        // The writer dropping its sender is the orderly-close signal.
        Ok(self.inbound_rx.recv().await)
    }
}

/// Write half of an [`HttpTransport`]: POSTs payloads and queues the
/// response bodies for the reader.
pub struct HttpWriter {
    client: Option<reqwest::Client>,
    url: String,
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl TransportWriter for HttpWriter {
    async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::Closed)?;
        let response = client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await
            .map_err(classify_request_error(&self.url))?;

        let response = response
            .error_for_status()
            .map_err(|source| TransportError::Http { source })?;

        let body = response
            .bytes()
            .await
            .map_err(|source| TransportError::Http { source })?;

        debug!(bytes = body.len(), "queued HTTP response body");
        // The reader half being gone means the connection is mid-teardown;
        // the payload has nowhere to go and is dropped.
        let _ = self.inbound_tx.send(body.to_vec());
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.client = None;
        Ok(())
    }
}

fn classify_request_error(url: &str) -> impl FnOnce(reqwest::Error) -> TransportError + '_ {
    move |error| {
        if error.is_connect() {
            TransportError::ConnectionFailed {
                address: url.to_string(),
                source: io::Error::other(error),
            }
        } else {
            TransportError::Http { source: error }
        }
    }
}

/// Connector for the HTTP transport.
///
/// `connect` issues a `JSONRPC.Ping` probe so that unreachable endpoints
/// fail the connection attempt instead of failing the first real call.
pub struct HttpConnector {
    client: reqwest::Client,
    url: String,
    connect_timeout: Duration,
}

impl HttpConnector {
    /// Creates a connector for `url` (e.g. `http://host:8080/jsonrpc`).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfiguration`] if the underlying
    /// HTTP client cannot be built.
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|error| TransportError::InvalidConfiguration {
                reason: error.to_string(),
            })?;
        Ok(Self {
            client,
            url: url.into(),
            connect_timeout,
        })
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        let probe = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(PING_PROBE)
            .send();

        match tokio::time::timeout(self.connect_timeout, probe).await {
            Ok(Ok(response)) => {
                response
                    .error_for_status()
                    .map_err(|source| TransportError::Http { source })?;
            }
            Ok(Err(error)) => return Err(classify_request_error(&self.url)(error)),
            Err(_) => {
                return Err(TransportError::Timeout {
                    duration: self.connect_timeout,
                });
            }
        }

        info!(url = %self.url, "HTTP endpoint reachable");
        Ok(Box::new(HttpTransport::new(
            self.client.clone(),
            self.url.clone(),
        )))
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused() {
        // Port 9 (discard) is a safe never-listening target on loopback.
        let connector =
            HttpConnector::new("http://127.0.0.1:9/jsonrpc", Duration::from_millis(500)).unwrap();
        let error = connector.connect().await.unwrap_err();
        assert!(
            matches!(
                error,
                TransportError::ConnectionFailed { .. } | TransportError::Timeout { .. }
            ),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn test_endpoint_description() {
        let connector =
            HttpConnector::new("http://kodi.local:8080/jsonrpc", Duration::from_secs(5)).unwrap();
        assert_eq!(connector.endpoint(), "http://kodi.local:8080/jsonrpc");
    }

    #[tokio::test]
    async fn test_send_after_shutdown_fails() {
        let transport = Box::new(HttpTransport::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/jsonrpc".to_string(),
        ));
        let (_reader, mut writer) = Transport::split(transport);
        writer.shutdown().await.unwrap();
        let error = writer.send(b"{}").await.unwrap_err();
        assert!(matches!(error, TransportError::Closed));
    }

    #[tokio::test]
    async fn test_reader_sees_eof_when_writer_dropped() {
        let transport = Box::new(HttpTransport::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/jsonrpc".to_string(),
        ));
        let (mut reader, writer) = Transport::split(transport);
        drop(writer);
        assert!(reader.recv().await.unwrap().is_none());
    }
}
