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

//! Error types for the call dispatch layer.

use crate::transport::TransportError;
use std::fmt;
use std::time::Duration;

/// Errors surfaced to a caller of [`Dispatcher::call`](super::Dispatcher::call).
#[derive(Debug)]
pub enum RpcError {
    /// The client is not currently connected; the call was not sent.
    NotConnected,

    /// No response with the call's id arrived within the deadline.
    ///
    /// The call is abandoned; a response arriving later is discarded.
    Timeout {
        /// The deadline that elapsed.
        duration: Duration,
    },

    /// The server reported an application-level failure for this call.
    Remote {
        /// JSON-RPC error code.
        code: i64,
        /// Server-supplied description.
        message: String,
    },

    /// The connection dropped while the call was outstanding.
    ///
    /// The call may or may not have executed remotely; it is never
    /// resent automatically.
    ConnectionLost,

    /// The call could not be encoded, or its response could not be
    /// decoded.
    Protocol {
        /// Description of the violation.
        reason: String,
    },

    /// A transport-layer failure outside the connection-lost case.
    Transport(TransportError),
}

impl RpcError {
    /// Returns `true` if retrying the call later may succeed.
    ///
    /// Remote and protocol errors are deterministic for the same input and
    /// are not considered retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotConnected | Self::Timeout { .. } | Self::ConnectionLost => true,
            Self::Remote { .. } | Self::Protocol { .. } => false,
            Self::Transport(error) => error.is_recoverable(),
        }
    }

    /// Returns `true` if this is a server-reported application error.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Returns `true` if this call timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Timeout { duration } => {
                write!(f, "no response within {duration:?}")
            }
            Self::Remote { code, message } => {
                write!(f, "remote error {code}: {message}")
            }
            Self::ConnectionLost => write!(f, "connection lost while call was outstanding"),
            Self::Protocol { reason } => write!(f, "protocol error: {reason}"),
            Self::Transport(error) => write!(f, "transport error: {error}"),
        }
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(error) => Some(error),
            _ => None,
        }
    }
}

impl From<TransportError> for RpcError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}
