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

//! Transport layer: one owned connection to a Kodi endpoint.
//!
//! Two real transports are provided, matching the two channels Kodi
//! exposes:
//!
//! - [`TcpConnector`] / [`TcpTransport`]: the persistent socket (port
//!   9090), required for server-pushed notifications.
//! - [`HttpConnector`] / [`HttpTransport`]: keep-alive `POST /jsonrpc`,
//!   request/response only.
//!
//! [`MemoryTransport`] is an in-process pair for tests.

mod error;
mod http;
mod memory;
mod tcp;
mod traits;

pub use error::TransportError;
pub use http::{HttpConnector, HttpReader, HttpTransport, HttpWriter};
pub use memory::{MemoryConnector, MemoryReader, MemoryTransport, MemoryWriter};
pub use tcp::{TcpConnector, TcpReader, TcpTransport, TcpWriter};
pub use traits::{Connector, Transport, TransportReader, TransportWriter};
