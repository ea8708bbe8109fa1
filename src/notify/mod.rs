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

//! Notification routing: fan-out of server-pushed events to subscribers.
//!
//! The dispatcher never invokes handlers itself; it pushes notifications
//! into a queue drained by the task spawned with [`spawn_dispatch_task`].
//! A slow or failing subscriber therefore cannot delay response
//! correlation, and a handler's failure is isolated: it is logged and the
//! remaining handlers still run.

use crate::protocol::Notification;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Error type handlers may return; failures are logged, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A notification handler.
pub type Handler = dyn Fn(&Notification) -> Result<(), HandlerError> + Send + Sync;

/// Opaque handle identifying a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription({})", self.0)
    }
}

/// Which event names a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    /// Every notification (`"*"`).
    All,
    /// Names under a namespace prefix (`"Player.*"` matches
    /// `"Player.OnPlay"`).
    Prefix(String),
    /// One exact name (`"Player.OnPlay"`).
    Exact(String),
}

impl EventFilter {
    /// Parses a filter pattern.
    ///
    /// `"*"` subscribes to everything, a trailing `".*"` subscribes to a
    /// namespace, anything else matches exactly.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kodi_control::notify::EventFilter;
    ///
    /// assert!(EventFilter::parse("*").matches("Application.OnVolumeChanged"));
    /// assert!(EventFilter::parse("Player.*").matches("Player.OnPause"));
    /// assert!(!EventFilter::parse("Player.OnPlay").matches("Player.OnPause"));
    /// ```
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            Self::All
        } else if let Some(prefix) = pattern.strip_suffix(".*") {
            Self::Prefix(format!("{prefix}."))
        } else {
            Self::Exact(pattern.to_string())
        }
    }

    /// Returns `true` if `method` falls under this filter.
    #[must_use]
    pub fn matches(&self, method: &str) -> bool {
        match self {
            Self::All => true,
            Self::Prefix(prefix) => method.starts_with(prefix.as_str()),
            Self::Exact(exact) => method == exact,
        }
    }
}

struct Subscriber {
    id: SubscriptionId,
    filter: EventFilter,
    handler: Arc<Handler>,
}

struct Registry {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

/// Delivers server-initiated events to registered subscribers.
pub struct NotificationRouter {
    registry: Mutex<Registry>,
}

impl NotificationRouter {
    /// Creates a router with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 1,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Registers `handler` for events matching `filter`.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(&Notification) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.subscribers.push(Subscriber {
            id,
            filter,
            handler: Arc::new(handler),
        });
        id
    }

    /// Removes a subscription. Returns `false` if the handle was already
    /// gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.subscribers.len();
        registry.subscribers.retain(|sub| sub.id != id);
        registry.subscribers.len() != before
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    /// Invokes every matching handler and returns how many were invoked.
    ///
    /// Handler failures are logged and do not stop delivery to the rest.
    /// The registry lock is not held during handler execution, so handlers
    /// may subscribe and unsubscribe freely.
    pub fn dispatch(&self, notification: &Notification) -> usize {
        let matching: Vec<(SubscriptionId, Arc<Handler>)> = {
            let registry = self.registry.lock();
            registry
                .subscribers
                .iter()
                .filter(|sub| sub.filter.matches(&notification.method))
                .map(|sub| (sub.id, Arc::clone(&sub.handler)))
                .collect()
        };

        for (id, handler) in &matching {
            if let Err(error) = handler(notification) {
                warn!(
                    subscription = %id,
                    method = %notification.method,
                    error = %error,
                    "notification handler failed"
                );
            }
        }

        if matching.is_empty() {
            debug!(method = %notification.method, "notification had no subscribers");
        }
        matching.len()
    }
}

impl Default for NotificationRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the task that drains the dispatcher's notification queue into
/// the router.
///
/// Dispatch is best-effort and runs entirely on this task, outside the
/// critical path that resolves pending calls.
pub fn spawn_dispatch_task(
    router: Arc<NotificationRouter>,
    mut queue: mpsc::UnboundedReceiver<Notification>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notification) = queue.recv().await {
            router.dispatch(&notification);
        }
        debug!("notification queue closed, dispatch task exiting");
    })
}


// Made with Bob
