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

//! The call dispatcher: encodes requests, correlates responses, and routes
//! notifications.
//!
//! Outbound, the dispatcher allocates an id, registers a pending call, and
//! hands the encoded request to the connection's write queue; the caller
//! suspends on its own oneshot until resolution, timeout, or connection
//! loss. Inbound, [`Dispatcher::on_message`] is driven by the single
//! per-connection read task, in arrival order — but resolution is keyed by
//! id only, so out-of-order responses and concurrent callers compose
//! freely with no head-of-line blocking.

use crate::dispatch::{CallOutcome, PendingCalls, Resolution, RequestIdSequence, RpcError};
use crate::protocol::{Inbound, InboundError, Notification, Request};
use parking_lot::Mutex;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Correlates calls with responses over whatever connection is current.
///
/// The dispatcher itself is connection-agnostic: the supervisor [`bind`]s
/// it to a live connection's write queue and [`unbind`]s it on teardown,
/// failing everything outstanding with [`RpcError::ConnectionLost`].
/// While unbound, calls fail fast with [`RpcError::NotConnected`].
///
/// [`bind`]: Dispatcher::bind
/// [`unbind`]: Dispatcher::unbind
#[derive(Debug)]
pub struct Dispatcher {
    ids: RequestIdSequence,
    pending: PendingCalls,
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl Dispatcher {
    /// Creates a dispatcher that forwards notifications into `notifications`.
    ///
    /// The receiving end is drained by the notification router's dispatch
    /// task, keeping subscriber fan-out off the response path.
    #[must_use]
    pub fn new(notifications: mpsc::UnboundedSender<Notification>) -> Self {
        Self {
            ids: RequestIdSequence::new(),
            pending: PendingCalls::new(),
            outbound: Mutex::new(None),
            notifications,
        }
    }

    /// Attaches the dispatcher to a live connection's write queue.
    pub fn bind(&self, outbound: mpsc::UnboundedSender<Vec<u8>>) {
        *self.outbound.lock() = Some(outbound);
    }

    /// Detaches from the current connection and fails every outstanding
    /// call with [`RpcError::ConnectionLost`], in one pass.
    pub fn unbind(&self) {
        *self.outbound.lock() = None;
        self.pending.fail_all(CallOutcome::ConnectionLost);
    }

    /// Returns `true` if a connection is currently bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.outbound.lock().is_some()
    }

    /// Number of calls currently awaiting responses.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Invokes `method` and suspends until resolution or `timeout`.
    ///
    /// Concurrent calls are independent: each gets its own id and its own
    /// resolution slot. Cancelling (dropping this future) abandons the
    /// call, and a response arriving afterwards is discarded silently.
    ///
    /// # Errors
    ///
    /// - [`RpcError::NotConnected`] if no connection is bound; the call is
    ///   never partially sent.
    /// - [`RpcError::Timeout`] if no response arrives within `timeout`.
    /// - [`RpcError::Remote`] if the server reports an application error.
    /// - [`RpcError::ConnectionLost`] if the connection drops while the
    ///   call is outstanding.
    /// - [`RpcError::Protocol`] if the request cannot be encoded or the
    ///   response for this id cannot be decoded.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let outbound = self
            .outbound
            .lock()
            .clone()
            .ok_or(RpcError::NotConnected)?;

        let id = self.ids.next();
        let request = Request::new(id, method, params);
        let payload = serde_json::to_vec(&request).map_err(|error| RpcError::Protocol {
            reason: error.to_string(),
        })?;

        let (slot, rx) = self.pending.register(id);

        if outbound.send(payload).is_err() {
            // The write task is gone: the connection died between the
            // fail-fast check and the enqueue.
            slot.abandon();
            return Err(RpcError::ConnectionLost);
        }

        debug!(id, method, "call dispatched");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(CallOutcome::Success(value))) => Ok(value),
            Ok(Ok(CallOutcome::Remote { code, message })) => Err(RpcError::Remote { code, message }),
            Ok(Ok(CallOutcome::Protocol { reason })) => Err(RpcError::Protocol { reason }),
            Ok(Ok(CallOutcome::ConnectionLost)) => Err(RpcError::ConnectionLost),
            // The sender side vanished without resolving; only teardown
            // does that.
            Ok(Err(_)) => Err(RpcError::ConnectionLost),
            Err(_) => {
                slot.abandon();
                Err(RpcError::Timeout { duration: timeout })
            }
        }
    }

    /// Processes one inbound message.
    ///
    /// Responses resolve their pending call exactly once; notifications
    /// are forwarded to the router queue. Malformed input is dropped with
    /// a diagnostic — nothing inbound can crash the dispatcher.
    pub fn on_message(&self, bytes: &[u8]) {
        match Inbound::from_slice(bytes) {
            Ok(Inbound::Response(response)) => {
                let id = response.id;
                let outcome = match response.into_outcome() {
                    Ok(value) => CallOutcome::Success(value),
                    Err(error) => CallOutcome::Remote {
                        code: error.code,
                        message: error.message,
                    },
                };
                self.resolve(id, outcome);
            }
            Ok(Inbound::Notification(notification)) => {
                debug!(method = %notification.method, "notification received");
                // The router task outliving the dispatcher is a shutdown
                // ordering detail; drops here are harmless.
                let _ = self.notifications.send(notification);
            }
            Err(InboundError::MalformedResponse { id, source }) => {
                // Decode failure outranks whatever the response claimed;
                // the waiting caller gets a protocol failure instead of
                // hanging until its deadline.
                self.resolve(
                    id,
                    CallOutcome::Protocol {
                        reason: source.to_string(),
                    },
                );
            }
            Err(error) => {
                warn!(error = %error, "discarding unparseable message");
            }
        }
    }

    fn resolve(&self, id: u64, outcome: CallOutcome) {
        match self.pending.resolve(id, outcome) {
            Resolution::Resolved => {}
            Resolution::Abandoned => {
                debug!(id, "discarding response for abandoned call");
            }
            Resolution::Unknown => {
                warn!(id, "discarding response with unknown id");
            }
        }
    }
}


// Made with Bob
