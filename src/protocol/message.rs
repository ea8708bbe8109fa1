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

//! JSON-RPC 2.0 message model for the Kodi remote-control protocol.
//!
//! Kodi speaks JSON-RPC 2.0 in both directions. Outbound we only ever send
//! requests; inbound we receive two shapes that share a wire format:
//!
//! - **Responses** carry an `id` referencing a request we sent, plus either
//!   a `result` or an `error` object.
//! - **Notifications** carry a `method` and `params` but **no id**. The
//!   absence of `id` is the sole discriminator between the two.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Protocol version string sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// An outbound JSON-RPC request.
///
/// Requests are owned by the dispatcher until resolved or abandoned. The
/// `id` is unique for the lifetime of the client and allocated
/// monotonically, which makes stale responses from a previous connection
/// unambiguous.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    /// Always [`JSONRPC_VERSION`].
    pub jsonrpc: String,
    /// Correlation id linking this request to its eventual response.
    pub id: u64,
    /// Fully-qualified Kodi method name, e.g. `"Player.GetActivePlayers"`.
    pub method: String,
    /// Method parameters. `Null` params are omitted from the wire form.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Request {
    /// Builds a request for the given method and parameters.
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// An application-level failure reported by the remote endpoint.
///
/// This is the JSON-RPC `error` object: the call reached the server and the
/// server rejected it. Distinct from transport failures, which mean the
/// call may not have reached the server at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteError {
    /// JSON-RPC error code (e.g. `-32601` for "method not found").
    pub code: i64,
    /// Human-readable description supplied by the server.
    pub message: String,
    /// Optional structured detail. Kodi attaches parameter-validation
    /// specifics here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote error {}: {}", self.code, self.message)
    }
}

/// An inbound response correlated to a request by `id`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Response {
    /// Correlation id of the request this response answers.
    pub id: u64,
    /// Success payload. Mutually exclusive with `error` on a conforming
    /// server.
    #[serde(default)]
    pub result: Option<Value>,
    /// Failure payload. If a non-conforming server sends both fields, the
    /// error wins.
    #[serde(default)]
    pub error: Option<RemoteError>,
}

impl Response {
    /// Collapses the `result` XOR `error` pair into a single outcome.
    ///
    /// The error field takes precedence over the result field; a response
    /// with neither resolves to `Null` (Kodi sends `"result": "OK"` or an
    /// explicit value for every method, but the protocol does not require
    /// it).
    pub fn into_outcome(self) -> Result<Value, RemoteError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A server-initiated event with no corresponding request.
///
/// Kodi pushes these over the persistent socket transport only; HTTP has
/// no server-push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Event name, e.g. `"Player.OnPlay"`.
    pub method: String,
    /// Event payload.
    #[serde(default)]
    pub params: Value,
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A response to one of our requests.
    Response(Response),
    /// A server-pushed notification.
    Notification(Notification),
}

/// Why an inbound byte sequence could not be classified.
#[derive(Debug, Error)]
pub enum InboundError {
    /// The payload was not valid JSON at all.
    #[error("invalid JSON: {source}")]
    Json {
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The payload carried an `id` but did not conform to the response
    /// shape. The id is surfaced so the matching pending call can be
    /// failed rather than left to time out.
    #[error("malformed response for id {id}: {source}")]
    MalformedResponse {
        /// Correlation id extracted before the shape check failed.
        id: u64,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The payload had no usable `id` and did not conform to the
    /// notification shape either.
    #[error("malformed notification: {source}")]
    MalformedNotification {
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

impl Inbound {
    /// Parses one inbound message, discriminating response from
    /// notification solely by the presence of an `id` field.
    ///
    /// A message with `"id": null` (which conforming servers send when they
    /// could not parse a request) has no usable correlation id and is
    /// classified down the notification path, where it will fail the shape
    /// check and be reported as malformed.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, InboundError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|source| InboundError::Json { source })?;

        match value.get("id").and_then(Value::as_u64) {
            Some(id) => serde_json::from_value::<Response>(value)
                .map(Inbound::Response)
                .map_err(|source| InboundError::MalformedResponse { id, source }),
            None => serde_json::from_value::<Notification>(value)
                .map(Inbound::Notification)
                .map_err(|source| InboundError::MalformedNotification { source }),
        }
    }
}
