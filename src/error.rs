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

//! Top-level error type.
//!
//! The crate uses a two-layer error hierarchy:
//!
//! 1. **Transport layer**: connection-level failures
//!    ([`TransportError`]) — handled by the supervisor via reconnection.
//! 2. **Call layer**: per-call failures ([`RpcError`]) — surfaced to the
//!    caller of that one call, leaving the connection alone.
//!
//! [`ClientError`] composes both for operations, like the initial
//! connect, that can fail either way.

use crate::dispatch::RpcError;
use crate::transport::TransportError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level error for client lifecycle operations.
#[derive(Debug)]
pub enum ClientError {
    /// A transport-layer failure.
    Transport(TransportError),

    /// A call-layer failure.
    Rpc(RpcError),

    /// The first connection attempt failed and the configuration asked
    /// for that to be fatal.
    ConnectFailed {
        /// The endpoint that could not be reached.
        endpoint: String,
    },
}

impl ClientError {
    /// Returns `true` if this is a transport-layer error.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if this is a call-layer error.
    #[must_use]
    pub const fn is_rpc_error(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }

    /// Returns `true` if the operation may succeed when retried.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(error) => error.is_recoverable(),
            Self::Rpc(error) => error.is_retryable(),
            Self::ConnectFailed { .. } => true,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(error) => write!(f, "transport error: {error}"),
            Self::Rpc(error) => write!(f, "rpc error: {error}"),
            Self::ConnectFailed { endpoint } => {
                write!(f, "failed to connect to {endpoint}")
            }
        }
    }
}

impl StdError for ClientError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transport(error) => Some(error),
            Self::Rpc(error) => Some(error),
            Self::ConnectFailed { .. } => None,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<RpcError> for ClientError {
    fn from(error: RpcError) -> Self {
        Self::Rpc(error)
    }
}
