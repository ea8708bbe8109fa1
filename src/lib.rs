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

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! The crate is organized into layers, leaf first:
//!
//! - **[`protocol`]**: JSON-RPC 2.0 message model and the stream decoder
//!   that splits Kodi's unframed socket stream into messages.
//! - **[`transport`]**: one owned connection — TCP socket, keep-alive
//!   HTTP, or in-memory for tests — behind the [`Transport`] seam.
//! - **[`dispatch`]**: the [`Dispatcher`] correlates calls with responses
//!   by id and routes notifications out of the response path.
//! - **[`notify`]**: the [`NotificationRouter`] fans events out to
//!   subscribers with isolated failures.
//! - **[`supervisor`]**: the connection state machine with
//!   reconnect-and-backoff, wrapping the transport transparently.
//! - **[`KodiClient`]**: the assembled facade.
//!
//! All concurrency is handled through Tokio; the crate is 100% safe Rust.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod notify;
pub mod protocol;
pub mod supervisor;
pub mod transport;

mod client;

pub use client::KodiClient;
pub use config::{ClientConfig, TransportKind};
pub use dispatch::{Dispatcher, RpcError};
pub use error::ClientError;
pub use notify::{EventFilter, NotificationRouter, SubscriptionId};
pub use protocol::{Notification, RemoteError, Request, Response};
pub use supervisor::{ConnectionState, ExponentialBackoff};
pub use transport::{Connector, Transport, TransportError};
