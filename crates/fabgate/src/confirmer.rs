//! Commit confirmation on a single peer event stream.
//!
//! An [`EventConfirmer`] turns a pushed commit notification into one
//! awaitable outcome:
//!
//! ```text
//! Idle -> Armed -> { Confirmed | Invalidated | Failed | TimedOut }
//! ```
//!
//! Arming registers interest, starts the deadline and connects the stream.
//! Every terminal transition disconnects the stream it owns, and the
//! deadline timer lives inside the awaited future, so it is gone as soon as
//! the confirmer stops waiting.

use std::sync::Arc;
use std::time::Duration;

use fabgate_channel::{ChannelError, EventStream, Registration, RegistrationOptions};
use fabgate_core::{ChaincodeEvent, CommitNotice, ConfirmError, TxEvent, TxnCustomEvent};
use futures::future::join_all;
use tokio::time::Instant;

use crate::config::GatewayConfig;

/// Lifecycle of one confirmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmerState {
    Idle,
    Armed,
    Confirmed,
    Invalidated,
    Failed,
    TimedOut,
}

impl ConfirmerState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmerState::Idle | ConfirmerState::Armed)
    }
}

/// Deadlines and the valid sentinel a confirmer checks against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmerSettings {
    pub timeout: Duration,
    pub listener_timeout: Duration,
    pub valid_code: String,
}

impl From<&GatewayConfig> for ConfirmerSettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            timeout: config.event_timeout,
            listener_timeout: config.listener_timeout,
            valid_code: config.valid_code.clone(),
        }
    }
}

/// Disconnects the stream when dropped, including when the waiting future
/// is abandoned by its caller.
struct ConnectionGuard {
    stream: Arc<dyn EventStream>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.stream.disconnect();
    }
}

/// Waits for one commit notification on one event stream.
pub struct EventConfirmer {
    stream: Arc<dyn EventStream>,
    settings: ConfirmerSettings,
    state: ConfirmerState,
    /// Whether this confirmer connects and disconnects the stream itself.
    owns_connection: bool,
}

impl EventConfirmer {
    /// A confirmer that owns the stream's connection for its whole wait.
    pub fn new(stream: Arc<dyn EventStream>, settings: ConfirmerSettings) -> Self {
        Self {
            stream,
            settings,
            state: ConfirmerState::Idle,
            owns_connection: true,
        }
    }

    /// A confirmer on a stream that someone else keeps connected.
    fn on_shared_stream(stream: Arc<dyn EventStream>, settings: ConfirmerSettings) -> Self {
        Self {
            stream,
            settings,
            state: ConfirmerState::Idle,
            owns_connection: false,
        }
    }

    pub fn state(&self) -> ConfirmerState {
        self.state
    }

    pub fn peer_address(&self) -> String {
        self.stream.peer_address()
    }

    /// Wait for `tx_id` to be committed on this peer.
    pub async fn confirm_transaction(&mut self, tx_id: &str) -> Result<TxEvent, ConfirmError> {
        self.confirm_transaction_with_listeners(tx_id, "", &[]).await
    }

    /// Wait for `tx_id` to be committed, then hand each listener the named
    /// chaincode event from the same stream.
    ///
    /// Listeners run in the background after a valid commit and never delay
    /// the returned outcome. The stream stays connected until all of them
    /// have resolved. On any other outcome they are never called.
    pub async fn confirm_transaction_with_listeners(
        &mut self,
        tx_id: &str,
        chaincode_id: &str,
        listeners: &[TxnCustomEvent],
    ) -> Result<TxEvent, ConfirmError> {
        let peer = self.peer_address();
        self.arm(&peer)?;

        let keep_open = !listeners.is_empty() || !self.owns_connection;
        let options = if keep_open {
            RegistrationOptions::keep_connected()
        } else {
            RegistrationOptions::default()
        };

        let registration = match self.stream.register_tx_event(tx_id, options) {
            Ok(registration) => registration,
            Err(err) => return Err(self.fail(&peer, err)),
        };
        let guard = self.guard();

        let event = self.await_notice(&peer, registration).await?;
        tracing::info!(
            peer = %peer,
            tx_id = %event.tx_id,
            block = event.block_number,
            "transaction committed and valid"
        );

        if !listeners.is_empty() {
            self.spawn_listeners(chaincode_id, listeners, guard);
        }
        Ok(event)
    }

    /// Wait for a named chaincode event on this peer.
    pub async fn confirm_chaincode_event(
        &mut self,
        chaincode_id: &str,
        event_name: &str,
    ) -> Result<ChaincodeEvent, ConfirmError> {
        let peer = self.peer_address();
        self.arm(&peer)?;

        let options = if self.owns_connection {
            RegistrationOptions::default()
        } else {
            RegistrationOptions::keep_connected()
        };
        let registered = self
            .stream
            .register_chaincode_event(chaincode_id, event_name, options);
        let registration = match registered {
            Ok(registration) => registration,
            Err(err) => return Err(self.fail(&peer, err)),
        };
        let _guard = self.guard();

        let event = self.await_notice(&peer, registration).await?;
        tracing::info!(
            peer = %peer,
            event = %event.event_name,
            payload = %event.payload_text(),
            "chaincode event received"
        );
        Ok(event)
    }

    fn arm(&mut self, peer: &str) -> Result<(), ConfirmError> {
        if self.state != ConfirmerState::Idle {
            return Err(ConfirmError::AlreadyArmed {
                peer: peer.to_string(),
            });
        }
        self.transition(ConfirmerState::Armed);
        Ok(())
    }

    fn guard(&self) -> Option<ConnectionGuard> {
        self.owns_connection.then(|| ConnectionGuard {
            stream: Arc::clone(&self.stream),
        })
    }

    fn transition(&mut self, next: ConfirmerState) {
        tracing::debug!(
            peer = %self.stream.peer_address(),
            from = ?self.state,
            to = ?next,
            "confirmer transition"
        );
        self.state = next;
    }

    fn fail(&mut self, peer: &str, err: ChannelError) -> ConfirmError {
        tracing::error!(peer = %peer, error = %err, "event stream failure");
        self.transition(ConfirmerState::Failed);
        ConfirmError::StreamFailure {
            peer: peer.to_string(),
            message: err.to_string(),
        }
    }

    /// Start the deadline, connect, and wait for the registration to resolve.
    async fn await_notice<T: CommitNotice>(
        &mut self,
        peer: &str,
        registration: Registration<T>,
    ) -> Result<T, ConfirmError> {
        let id = registration.id();
        let deadline = Instant::now() + self.settings.timeout;

        let stream = Arc::clone(&self.stream);
        let connect = self.owns_connection;
        let wait = async move {
            if connect {
                stream.connect().await?;
            }
            registration.delivered().await
        };

        match tokio::time::timeout_at(deadline, wait).await {
            Err(_) => {
                tracing::error!("REQUEST_TIMEOUT:{}", peer);
                self.stream.unregister(id);
                if self.owns_connection {
                    self.stream.disconnect();
                }
                self.transition(ConfirmerState::TimedOut);
                Err(ConfirmError::Timeout {
                    peer: peer.to_string(),
                })
            }
            Ok(Err(err)) => {
                self.stream.unregister(id);
                Err(self.fail(peer, err))
            }
            Ok(Ok(notice)) if notice.is_valid(&self.settings.valid_code) => {
                self.transition(ConfirmerState::Confirmed);
                Ok(notice)
            }
            Ok(Ok(notice)) => {
                let code = notice.validation_code().to_string();
                tracing::error!(
                    peer = %peer,
                    tx_id = %notice.tx_id(),
                    block = notice.block_number(),
                    "the invoke chaincode transaction was invalid, code:{}",
                    code
                );
                self.transition(ConfirmerState::Invalidated);
                Err(ConfirmError::Invalidated {
                    peer: peer.to_string(),
                    code,
                })
            }
        }
    }

    /// Resolve each listener on its own shared-stream confirmer, then
    /// release the connection.
    fn spawn_listeners(
        &self,
        chaincode_id: &str,
        listeners: &[TxnCustomEvent],
        guard: Option<ConnectionGuard>,
    ) {
        let settings = ConfirmerSettings {
            timeout: self.settings.listener_timeout,
            ..self.settings.clone()
        };
        let deliveries: Vec<_> = listeners
            .iter()
            .cloned()
            .map(|listener| {
                let mut confirmer =
                    EventConfirmer::on_shared_stream(Arc::clone(&self.stream), settings.clone());
                let chaincode_id = chaincode_id.to_string();
                async move {
                    let result = confirmer
                        .confirm_chaincode_event(&chaincode_id, &listener.event_name)
                        .await;
                    (listener.callback)(result);
                }
            })
            .collect();

        tokio::spawn(async move {
            join_all(deliveries).await;
            drop(guard);
        });
    }
}
