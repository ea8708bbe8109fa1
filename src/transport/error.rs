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

//! Transport layer error types.
//!
//! Transport errors are the lowest layer of the error hierarchy and
//! describe failures of the connection itself rather than of any
//! individual call. The supervisor reacts to them: recoverable errors
//! trigger reconnection with backoff, non-recoverable ones do not.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the transport layer.
///
/// # Examples
///
/// ```rust
/// use kodi_control::transport::TransportError;
/// use std::io;
///
/// let error = TransportError::ConnectionFailed {
///     address: "192.168.1.50:9090".to_string(),
///     source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
/// };
/// assert!(error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to establish a connection to the remote endpoint.
    ///
    /// Raised on refusal or unreachable host during connection
    /// establishment; the supervisor retries with backoff.
    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        /// The address that failed to connect.
        address: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An established connection became unusable mid-flight.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// Description of why the connection was lost.
        reason: String,
        /// The underlying I/O error, if available.
        #[source]
        source: Option<io::Error>,
    },

    /// Failed to write a message to the channel.
    #[error("send failed: {source}")]
    SendFailed {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to read from the channel.
    #[error("receive failed: {source}")]
    RecvFailed {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An operation exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// The duration that was exceeded.
        duration: Duration,
    },

    /// The transport was configured with invalid parameters.
    ///
    /// Not recoverable; retrying with the same configuration cannot
    /// succeed.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error.
        reason: String,
    },

    /// The transport has been explicitly shut down.
    #[error("transport is closed")]
    Closed,

    /// No connection is currently established.
    #[error("transport is not connected")]
    NotConnected,

    /// An HTTP-level failure on the HTTP transport.
    ///
    /// Covers non-success status codes and request plumbing failures that
    /// are not plain connection refusals.
    #[error("HTTP request failed: {source}")]
    Http {
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    /// Returns `true` if reconnecting may succeed after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. }
            | Self::ConnectionLost { .. }
            | Self::Timeout { .. }
            | Self::NotConnected
            | Self::Http { .. } => true,

            Self::SendFailed { source } | Self::RecvFailed { source } => matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),

            Self::InvalidConfiguration { .. } | Self::Closed => false,
        }
    }

    /// Returns `true` if this error means the current connection must be
    /// torn down.
    pub fn should_close_transport(&self) -> bool {
        match self {
            Self::ConnectionLost { .. } | Self::Closed | Self::Timeout { .. } => true,

            // These happen before a connection exists.
            Self::ConnectionFailed { .. }
            | Self::NotConnected
            | Self::InvalidConfiguration { .. } => false,

            Self::SendFailed { source } | Self::RecvFailed { source } => !matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),

            Self::Http { .. } => true,
        }
    }

    /// Create a connection lost error for testing.
    #[cfg(test)]
    pub(crate) fn connection_lost(reason: impl Into<String>) -> Self {
        Self::ConnectionLost {
            reason: reason.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failed_is_recoverable() {
        let error = TransportError::ConnectionFailed {
            address: "127.0.0.1:9090".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(error.is_recoverable());
        assert!(!error.should_close_transport());
    }

    #[test]
    fn test_connection_lost_closes_transport() {
        let error = TransportError::connection_lost("peer closed");
        assert!(error.is_recoverable());
        assert!(error.should_close_transport());
    }

    #[test]
    fn test_invalid_configuration_not_recoverable() {
        let error = TransportError::InvalidConfiguration {
            reason: "bad url".to_string(),
        };
        assert!(!error.is_recoverable());
        assert!(!error.should_close_transport());
    }

    #[test]
    fn test_transient_io_error_is_recoverable() {
        let error = TransportError::RecvFailed {
            source: io::Error::new(io::ErrorKind::Interrupted, "interrupted"),
        };
        assert!(error.is_recoverable());
        assert!(!error.should_close_transport());
    }

    #[test]
    fn test_broken_pipe_closes_transport() {
        let error = TransportError::SendFailed {
            source: io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
        };
        assert!(!error.is_recoverable());
        assert!(error.should_close_transport());
    }

    #[test]
    fn test_closed_is_terminal() {
        let error = TransportError::Closed;
        assert!(!error.is_recoverable());
        assert!(error.should_close_transport());
    }
}
