//! Connection supervision: state machine, reconnection, and the
//! per-connection read/write loops.
//!
//! The supervisor owns the [`Connector`] and wraps the transport's whole
//! lifecycle: it dials, binds the dispatcher to the live connection,
//! pumps inbound bytes through the stream decoder into
//! [`Dispatcher::on_message`], and on any failure fails all outstanding
//! calls, then redials with exponential backoff. Reconnection continues
//! until [`SupervisorHandle::close`] is called; calls outstanding at the
//! moment of failure are surfaced as connection-lost, never replayed.

mod backoff;

pub use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use crate::dispatch::Dispatcher;
use crate::protocol::JsonStreamDecoder;
use crate::transport::{Connector, Transport, TransportError};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Connection lifecycle state, observable through
/// [`SupervisorHandle::state_changes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection, and none being attempted.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// A connection is established; calls can be dispatched.
    Connected,
    /// An explicit close is in progress; reconnection is suppressed.
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

/// Why an established connection ended.
enum DisconnectReason {
    ShutdownRequested,
    PeerClosed,
    Failed(TransportError),
}

/// Monitors transport health and restarts the connection transparently.
pub struct Supervisor {
    connector: Box<dyn Connector>,
    dispatcher: Arc<Dispatcher>,
    backoff: ExponentialBackoff,
    state_tx: watch::Sender<ConnectionState>,
    shutdown: watch::Receiver<bool>,
}

/// Owner-side handle to a running [`Supervisor`].
pub struct SupervisorHandle {
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// A receiver observing every state transition.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Signals shutdown without waiting for it to complete.
    ///
    /// Useful when the handle is shared; [`close`](Self::close) is the
    /// waiting form.
    pub fn request_close(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Requests shutdown and waits for the supervisor to wind down.
    ///
    /// Outstanding calls resolve with connection-lost; no reconnection is
    /// attempted afterwards.
    pub async fn close(self) {
        self.request_close();
        let _ = self.task.await;
    }
}

impl Supervisor {
    /// Spawns a supervisor driving `connector` on behalf of `dispatcher`.
    ///
    /// Spawning is the connect request: the supervisor starts dialing
    /// immediately and the observable state begins at
    /// [`ConnectionState::Connecting`], so the first `Disconnected` an
    /// observer sees always means a failed or ended connection.
    pub fn spawn(
        connector: Box<dyn Connector>,
        dispatcher: Arc<Dispatcher>,
        backoff: ExponentialBackoff,
    ) -> SupervisorHandle {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let supervisor = Self {
            connector,
            dispatcher,
            backoff,
            state_tx,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(supervisor.run());

        SupervisorHandle {
            state_rx,
            shutdown_tx,
            task,
        }
    }

    async fn run(self) {
        let Self {
            connector,
            dispatcher,
            backoff,
            state_tx,
            mut shutdown,
        } = self;
        let endpoint = connector.endpoint();
        let mut attempt: u32 = 0;

        loop {
            if stop_requested(&shutdown) {
                break;
            }
            let _ = state_tx.send(ConnectionState::Connecting);

            let connected = tokio::select! {
                result = connector.connect() => result,
                _ = wait_stop(&mut shutdown) => break,
            };

            match connected {
                Ok(transport) => {
                    attempt = 0;
                    info!(endpoint = %endpoint, "connected");

                    let reason =
                        drive_connection(&dispatcher, transport, &state_tx, &mut shutdown).await;
                    match reason {
                        DisconnectReason::ShutdownRequested => break,
                        DisconnectReason::PeerClosed => {
                            warn!(endpoint = %endpoint, "connection closed by peer");
                        }
                        DisconnectReason::Failed(error) => {
                            warn!(endpoint = %endpoint, error = %error, "connection failed");
                        }
                    }
                    let _ = state_tx.send(ConnectionState::Disconnected);
                }
                Err(error) => {
                    warn!(endpoint = %endpoint, attempt, error = %error, "connect attempt failed");
                    let _ = state_tx.send(ConnectionState::Disconnected);
                    if !error.is_recoverable() {
                        warn!(endpoint = %endpoint, "error is not recoverable, giving up");
                        break;
                    }
                }
            }

            if stop_requested(&shutdown) {
                break;
            }
            let delay = backoff.delay(attempt);
            attempt = attempt.saturating_add(1);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_stop(&mut shutdown) => break,
            }
        }

        if stop_requested(&shutdown) {
            let _ = state_tx.send(ConnectionState::Closing);
        }
        dispatcher.unbind();
        let _ = state_tx.send(ConnectionState::Disconnected);
        debug!(endpoint = %endpoint, "supervisor stopped");
    }
}

/// Pumps one established connection until it ends.
///
/// The write loop runs as its own task draining the dispatcher's outbound
/// queue; the read loop runs here, feeding chunks through the stream
/// decoder into the dispatcher in arrival order. The `Connected` state is
/// published only after the dispatcher is bound, so an observer seeing
/// `Connected` can dispatch immediately. On exit the dispatcher is
/// unbound — failing all outstanding calls — and the writer is torn
/// down, which releases the socket.
async fn drive_connection(
    dispatcher: &Arc<Dispatcher>,
    transport: Box<dyn Transport>,
    state_tx: &watch::Sender<ConnectionState>,
    shutdown: &mut watch::Receiver<bool>,
) -> DisconnectReason {
    let (mut reader, mut writer) = transport.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    dispatcher.bind(outbound_tx);
    let _ = state_tx.send(ConnectionState::Connected);

    let write_task = tokio::spawn(async move {
        while let Some(payload) = outbound_rx.recv().await {
            if let Err(error) = writer.send(&payload).await {
                warn!(error = %error, "outbound write failed");
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let mut decoder = JsonStreamDecoder::new();
    let reason = loop {
        tokio::select! {
            _ = wait_stop(shutdown) => break DisconnectReason::ShutdownRequested,
            chunk = reader.recv() => match chunk {
                Ok(Some(bytes)) => match decoder.feed(&bytes) {
                    Ok(messages) => {
                        for message in messages {
                            dispatcher.on_message(&message);
                        }
                    }
                    Err(error) => {
                        break DisconnectReason::Failed(TransportError::ConnectionLost {
                            reason: error.to_string(),
                            source: None,
                        });
                    }
                },
                Ok(None) => break DisconnectReason::PeerClosed,
                Err(error) => break DisconnectReason::Failed(error),
            },
        }
    };

    // Unbind before tearing down the writer so no call can enqueue into a
    // dead queue and hang.
    dispatcher.unbind();
    write_task.abort();
    let _ = write_task.await;
    reason
}

fn stop_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

/// Resolves when shutdown is requested or the handle is gone.
async fn wait_stop(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
