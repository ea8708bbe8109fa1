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

//! Tracking of in-flight calls awaiting responses.
//!
//! The pending-call table is the dispatcher's only shared mutable state.
//! Two paths mutate it: callers register new calls, and the single inbound
//! task resolves them by id. Each call resolves exactly once, to exactly
//! one of success, remote failure, protocol failure, or connection loss —
//! or is abandoned by its caller, in which case a late response is
//! discarded silently.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Terminal outcome of a pending call, as delivered to the waiting caller.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The server answered with a result.
    Success(Value),
    /// The server answered with an application-level error.
    Remote {
        /// JSON-RPC error code.
        code: i64,
        /// Server-supplied description.
        message: String,
    },
    /// A response arrived for this id but could not be decoded.
    Protocol {
        /// Description of the decode failure.
        reason: String,
    },
    /// The connection dropped while the call was outstanding.
    ConnectionLost,
}

/// What [`PendingCalls::resolve`] found for an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A waiting caller was resolved.
    Resolved,
    /// The caller abandoned the call; the outcome was discarded silently.
    Abandoned,
    /// No call with this id was ever registered (or it resolved already).
    Unknown,
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<u64, oneshot::Sender<CallOutcome>>,
    abandoned: HashSet<u64>,
}

/// The table of in-flight calls.
///
/// # Example
///
/// ```rust
/// use kodi_control::dispatch::{CallOutcome, PendingCalls, Resolution};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pending = PendingCalls::new();
/// let (_slot, rx) = pending.register(42);
///
/// let resolution = pending.resolve(42, CallOutcome::Success(json!([])));
/// assert_eq!(resolution, Resolution::Resolved);
/// assert_eq!(rx.await.unwrap(), CallOutcome::Success(json!([])));
/// # }
/// ```
#[derive(Debug, Default)]
pub struct PendingCalls {
    inner: Arc<Mutex<Inner>>,
}

impl PendingCalls {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call and returns its guard and outcome receiver.
    ///
    /// The [`CallSlot`] guard ties the table entry to the caller: dropping
    /// it before resolution marks the id abandoned, so a response arriving
    /// afterwards is discarded without noise. This is what makes caller
    /// cancellation (dropping the future, or a timeout) safe.
    #[must_use]
    pub fn register(&self, id: u64) -> (CallSlot, oneshot::Receiver<CallOutcome>) {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().slots.insert(id, tx);
        (
            CallSlot {
                id,
                inner: Arc::clone(&self.inner),
            },
            rx,
        )
    }

    /// Resolves the call registered under `id`, if any.
    ///
    /// The returned [`Resolution`] tells the inbound path which diagnostic
    /// applies: abandoned ids are expected traffic, unknown ids are not.
    pub fn resolve(&self, id: u64, outcome: CallOutcome) -> Resolution {
        let mut inner = self.inner.lock();
        if let Some(tx) = inner.slots.remove(&id) {
            if tx.send(outcome).is_ok() {
                Resolution::Resolved
            } else {
                // Receiver dropped in the window before its slot guard ran.
                Resolution::Abandoned
            }
        } else if inner.abandoned.remove(&id) {
            Resolution::Abandoned
        } else {
            Resolution::Unknown
        }
    }

    /// Resolves every outstanding call with `outcome` in a single pass and
    /// forgets all abandoned ids.
    ///
    /// Called on connection teardown so that no caller is left hanging.
    pub fn fail_all(&self, outcome: CallOutcome) {
        let drained: Vec<oneshot::Sender<CallOutcome>> = {
            let mut inner = self.inner.lock();
            inner.abandoned.clear();
            inner.slots.drain().map(|(_, tx)| tx).collect()
        };
        for tx in drained {
            let _ = tx.send(outcome.clone());
        }
    }

    /// Number of calls currently awaiting resolution.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Returns `true` if no calls are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().slots.is_empty()
    }
}

/// Guard tying a registered call to its caller.
///
/// Dropping the guard before the call resolves marks the id abandoned.
/// Once the call has resolved, dropping the guard is a no-op.
#[derive(Debug)]
pub struct CallSlot {
    id: u64,
    inner: Arc<Mutex<Inner>>,
}

impl CallSlot {
    /// The correlation id this guard covers.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Explicitly abandons the call.
    ///
    /// Equivalent to dropping the guard; provided so timeout paths read as
    /// what they do.
    pub fn abandon(self) {
        drop(self);
    }
}

impl Drop for CallSlot {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        if inner.slots.remove(&self.id).is_some() {
            inner.abandoned.insert(self.id);
        }
    }
}


// Made with Bob
