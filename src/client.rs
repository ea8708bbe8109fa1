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

//! The high-level client: one supervised connection, calls, and
//! subscriptions.

use crate::config::{ClientConfig, TransportKind};
use crate::dispatch::{Dispatcher, RpcError};
use crate::error::ClientError;
use crate::notify::{
    spawn_dispatch_task, EventFilter, HandlerError, NotificationRouter, SubscriptionId,
};
use crate::protocol::Notification;
use crate::supervisor::{ConnectionState, ExponentialBackoff, Supervisor, SupervisorHandle};
use crate::transport::{Connector, HttpConnector, TcpConnector};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// A client controlling one Kodi instance over one supervised connection.
///
/// Calls may be issued concurrently from any number of tasks; each
/// suspends independently and resolves independently. Dropping the client
/// tears everything down; [`close`](KodiClient::close) does so
/// deterministically.
///
/// # Example
///
/// ```rust,no_run
/// use kodi_control::{ClientConfig, KodiClient};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = KodiClient::connect(ClientConfig::default()).await?;
/// let players = client.call("Player.GetActivePlayers", json!({})).await?;
/// println!("{players}");
/// client.close().await;
/// # Ok(())
/// # }
/// ```
pub struct KodiClient {
    dispatcher: Arc<Dispatcher>,
    router: Arc<NotificationRouter>,
    supervisor: SupervisorHandle,
    router_task: JoinHandle<()>,
    call_timeout: Duration,
}

impl std::fmt::Debug for KodiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KodiClient")
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl KodiClient {
    /// Connects to the endpoint described by `config`.
    ///
    /// With `fail_fast_connect` (the default) this resolves once the first
    /// connection attempt does, and surfaces its failure; otherwise it
    /// returns immediately and the supervisor brings the connection up in
    /// the background.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] for invalid configuration and
    /// [`ClientError::ConnectFailed`] when the fail-fast first attempt
    /// does not reach the endpoint.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let connector: Box<dyn Connector> = match config.kind {
            TransportKind::Tcp => Box::new(TcpConnector::new(
                config.socket_address(),
                config.connect_timeout,
            )),
            TransportKind::Http => {
                Box::new(HttpConnector::new(config.http_url(), config.connect_timeout)?)
            }
        };
        Self::with_connector(connector, &config).await
    }

    /// Connects through an explicit [`Connector`].
    ///
    /// This is the seam tests use to drive the full client over an
    /// in-memory transport.
    pub async fn with_connector(
        connector: Box<dyn Connector>,
        config: &ClientConfig,
    ) -> Result<Self, ClientError> {
        let endpoint = connector.endpoint();

        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(Dispatcher::new(notify_tx));
        let router = Arc::new(NotificationRouter::new());
        let router_task = spawn_dispatch_task(Arc::clone(&router), notify_rx);

        let backoff = ExponentialBackoff::between(
            config.reconnect_backoff_min,
            config.reconnect_backoff_max,
        );
        let supervisor = Supervisor::spawn(connector, Arc::clone(&dispatcher), backoff);

        let client = Self {
            dispatcher,
            router,
            supervisor,
            router_task,
            call_timeout: config.call_timeout,
        };

        if config.fail_fast_connect && !client.await_first_attempt().await {
            client.close().await;
            return Err(ClientError::ConnectFailed { endpoint });
        }
        Ok(client)
    }

    /// Waits for the first connection attempt to resolve either way.
    async fn await_first_attempt(&self) -> bool {
        let mut states = self.supervisor.state_changes();
        loop {
            match *states.borrow_and_update() {
                ConnectionState::Connected => return true,
                ConnectionState::Disconnected | ConnectionState::Closing => return false,
                ConnectionState::Connecting => {}
            }
            if states.changed().await.is_err() {
                return false;
            }
        }
    }

    /// Invokes a Kodi method with the configured default timeout.
    ///
    /// # Errors
    ///
    /// See [`RpcError`] for the failure taxonomy; notably
    /// [`RpcError::NotConnected`] while disconnected and
    /// [`RpcError::ConnectionLost`] if the connection drops mid-call.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.dispatcher.call(method, params, self.call_timeout).await
    }

    /// Invokes a Kodi method with an explicit per-call deadline.
    ///
    /// # Errors
    ///
    /// See [`RpcError`].
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        self.dispatcher.call(method, params, timeout).await
    }

    /// Probes the endpoint with `JSONRPC.Ping`.
    ///
    /// Returns `true` if the instance answered within the call timeout.
    pub async fn ping(&self) -> bool {
        self.call("JSONRPC.Ping", Value::Null).await.is_ok()
    }

    /// Subscribes `handler` to notifications matching `pattern`.
    ///
    /// Patterns are `"*"`, a namespace like `"Player.*"`, or an exact
    /// event name like `"Player.OnPlay"`. Handlers run on the router's
    /// dispatch task; failures are logged and isolated from other
    /// handlers. On the HTTP transport notifications never arrive, so
    /// subscriptions never fire.
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Notification) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.router.subscribe(EventFilter::parse(pattern), handler)
    }

    /// Cancels a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.router.unsubscribe(id)
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    /// A receiver observing connection state transitions.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.state_changes()
    }

    /// Number of calls currently awaiting responses.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.dispatcher.pending_count()
    }

    /// Signals close without waiting for teardown to finish.
    ///
    /// Outstanding calls resolve with [`RpcError::ConnectionLost`] as the
    /// supervisor winds down. Useful when the client is shared behind an
    /// [`Arc`]; [`close`](Self::close) is the waiting form.
    pub fn shutdown(&self) {
        self.supervisor.request_close();
    }

    /// Closes the connection and stops reconnecting.
    ///
    /// Outstanding calls resolve with [`RpcError::ConnectionLost`];
    /// nothing hangs.
    pub async fn close(self) {
        self.supervisor.close().await;
        self.router_task.abort();
        let _ = self.router_task.await;
    }
}
