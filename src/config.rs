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

//! Client configuration.
//!
//! [`ClientConfig`] is a plain injected struct — there is no ambient
//! singleton. It deserializes from the conventional option names
//! (`timeout_seconds`, `use_persistent_connection`,
//! `reconnect_backoff_min`, ...) so an external configuration loader can
//! supply it directly, and offers `with_*` builders for in-code setup.

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Which of Kodi's two JSON-RPC channels to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Persistent socket (conventionally port 9090). Required for
    /// server-pushed notifications.
    Tcp,
    /// Keep-alive HTTP (`POST /jsonrpc`, conventionally port 8080).
    /// Request/response only.
    Http,
}

/// Configuration for a [`KodiClient`](crate::KodiClient).
///
/// # Examples
///
/// ```rust
/// use kodi_control::{ClientConfig, TransportKind};
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_host("192.168.1.50")
///     .with_transport_kind(TransportKind::Tcp)
///     .with_call_timeout(Duration::from_secs(5));
/// assert_eq!(config.socket_address(), "192.168.1.50:9090");
/// ```
///
/// Deserializing from loader-supplied options:
///
/// ```rust
/// use kodi_control::{ClientConfig, TransportKind};
///
/// let config: ClientConfig = serde_json::from_str(
///     r#"{"host": "10.0.0.7", "port": 8080, "use_persistent_connection": false,
///         "timeout_seconds": 3.0}"#,
/// ).unwrap();
/// assert_eq!(config.kind, TransportKind::Http);
/// assert_eq!(config.http_url(), "http://10.0.0.7:8080/jsonrpc");
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Hostname or address of the Kodi instance.
    pub host: String,

    /// Port of the selected channel. Kodi defaults: 9090 for the socket,
    /// 8080 for HTTP.
    pub port: u16,

    /// Selected channel. Wire form is the boolean
    /// `use_persistent_connection`.
    #[serde(
        rename = "use_persistent_connection",
        deserialize_with = "kind_from_bool"
    )]
    pub kind: TransportKind,

    /// Per-call response deadline. Wire form is `timeout_seconds`.
    #[serde(rename = "timeout_seconds", deserialize_with = "duration_from_seconds")]
    pub call_timeout: Duration,

    /// Deadline for establishing a connection. Wire form is
    /// `connect_timeout_seconds`.
    #[serde(
        rename = "connect_timeout_seconds",
        deserialize_with = "duration_from_seconds"
    )]
    pub connect_timeout: Duration,

    /// Initial delay of the reconnect backoff schedule, in seconds on the
    /// wire.
    #[serde(deserialize_with = "duration_from_seconds")]
    pub reconnect_backoff_min: Duration,

    /// Cap of the reconnect backoff schedule, in seconds on the wire.
    #[serde(deserialize_with = "duration_from_seconds")]
    pub reconnect_backoff_max: Duration,

    /// Whether [`connect`](crate::KodiClient::connect) should fail if the
    /// first connection attempt does, instead of returning immediately
    /// and reconnecting in the background.
    pub fail_fast_connect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9090,
            kind: TransportKind::Tcp,
            call_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            reconnect_backoff_min: Duration::from_millis(250),
            reconnect_backoff_max: Duration::from_secs(30),
            fail_fast_connect: true,
        }
    }
}

impl ClientConfig {
    /// Sets the host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Selects the transport channel.
    #[must_use]
    pub fn with_transport_kind(mut self, kind: TransportKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the per-call response deadline.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sets the connection-establishment deadline.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the reconnect backoff bounds.
    #[must_use]
    pub fn with_reconnect_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.reconnect_backoff_min = min;
        self.reconnect_backoff_max = max;
        self
    }

    /// Sets whether the initial connect failure is surfaced to the caller.
    #[must_use]
    pub fn with_fail_fast_connect(mut self, fail_fast: bool) -> Self {
        self.fail_fast_connect = fail_fast;
        self
    }

    /// `host:port` form used by the socket transport.
    #[must_use]
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL of the HTTP JSON-RPC endpoint.
    #[must_use]
    pub fn http_url(&self) -> String {
        format!("http://{}:{}/jsonrpc", self.host, self.port)
    }
}

fn duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = f64::deserialize(deserializer)?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(serde::de::Error::custom(
            "duration must be a non-negative number of seconds",
        ));
    }
    Ok(Duration::from_secs_f64(seconds))
}

fn kind_from_bool<'de, D>(deserializer: D) -> Result<TransportKind, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(if bool::deserialize(deserializer)? {
        TransportKind::Tcp
    } else {
        TransportKind::Http
    })
}
