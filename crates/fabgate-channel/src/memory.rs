//! A scripted in-memory channel for testing.
//!
//! Peers, event streams and the ordering service are simulated with tokio
//! timers, so tests can run under paused time and assert on exact
//! deadlines. Every call is recorded for side-effect assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use fabgate_core::{ChaincodeEvent, PeerResponse, ProposalResponse, TxEvent};

use crate::channel::{Channel, EventStream};
use crate::error::{ChannelError, Result};
use crate::events::{Delivery, Registration, RegistrationId, RegistrationOptions};
use crate::request::{
    InstallRequest, LifecycleProposalRequest, OrdererRequest, OrdererResponse, PeerTarget,
    ProposalOutcome, ProposalRef, ProposalRequest, QueryRequest,
};

/// What a stream does with a commit registration once connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventScript {
    /// Deliver a commit notification after `delay`.
    Commit {
        code: String,
        block_number: u64,
        delay: Duration,
    },
    /// Fail the stream after `delay`.
    Fail { message: String, delay: Duration },
    /// Never deliver anything.
    Silent,
}

#[derive(Debug, Clone)]
struct ChaincodeScript {
    payload: Bytes,
    code: String,
    block_number: u64,
    delay: Duration,
}

struct PendingTx {
    id: RegistrationId,
    tx_id: String,
    options: RegistrationOptions,
    delivery: Delivery<TxEvent>,
    dispatched: bool,
}

struct PendingChaincode {
    id: RegistrationId,
    chaincode_id: String,
    event_name: String,
    options: RegistrationOptions,
    delivery: Delivery<ChaincodeEvent>,
    dispatched: bool,
}

#[derive(Default)]
struct StreamState {
    connected: bool,
    connects: usize,
    disconnects: usize,
    next_id: u64,
    connect_failure: Option<String>,
    tx_scripts: HashMap<String, EventScript>,
    default_tx_script: Option<EventScript>,
    chaincode_scripts: HashMap<String, ChaincodeScript>,
    pending_tx: Vec<PendingTx>,
    pending_chaincode: Vec<PendingChaincode>,
    registered_tx_ids: Vec<String>,
    registered_events: Vec<String>,
    unregistered: Vec<RegistrationId>,
    last_tx_id: Option<String>,
}

impl StreamState {
    fn tx_script(&self, tx_id: &str) -> EventScript {
        self.tx_scripts
            .get(tx_id)
            .or(self.default_tx_script.as_ref())
            .cloned()
            .unwrap_or(EventScript::Silent)
    }

    fn drop_connection(&mut self) {
        if self.connected {
            self.connected = false;
            self.disconnects += 1;
        }
        // Dropping the delivery halves closes every outstanding registration.
        self.pending_tx.clear();
        self.pending_chaincode.clear();
    }
}

type Shared = Arc<Mutex<StreamState>>;

/// In-memory event stream for one simulated peer.
pub struct MemoryEventStream {
    peer: String,
    state: Shared,
}

impl MemoryEventStream {
    pub fn new(peer: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            peer: peer.into(),
            state: Arc::new(Mutex::new(StreamState::default())),
        })
    }

    /// Script the outcome for every commit registration without a
    /// tx-specific script.
    pub fn script_default(&self, script: EventScript) {
        self.state.lock().unwrap().default_tx_script = Some(script);
    }

    /// Deliver `code` for every commit registration after `delay`.
    pub fn script_commit(&self, code: &str, block_number: u64, delay: Duration) {
        self.script_default(EventScript::Commit {
            code: code.to_string(),
            block_number,
            delay,
        });
    }

    /// Fail every commit registration with a stream error after `delay`.
    pub fn script_failure(&self, message: &str, delay: Duration) {
        self.script_default(EventScript::Fail {
            message: message.to_string(),
            delay,
        });
    }

    /// Script the outcome for one transaction id.
    pub fn script_tx(&self, tx_id: &str, script: EventScript) {
        self.state
            .lock()
            .unwrap()
            .tx_scripts
            .insert(tx_id.to_string(), script);
    }

    /// Deliver a chaincode event named `event_name` after `delay` once
    /// registered and connected.
    pub fn script_chaincode_event(
        &self,
        event_name: &str,
        payload: &[u8],
        code: &str,
        delay: Duration,
    ) {
        self.state.lock().unwrap().chaincode_scripts.insert(
            event_name.to_string(),
            ChaincodeScript {
                payload: Bytes::copy_from_slice(payload),
                code: code.to_string(),
                block_number: 1,
                delay,
            },
        );
    }

    /// Make `connect` fail.
    pub fn script_connect_failure(&self, message: &str) {
        self.state.lock().unwrap().connect_failure = Some(message.to_string());
    }

    pub fn registered_tx_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().registered_tx_ids.clone()
    }

    pub fn registered_event_names(&self) -> Vec<String> {
        self.state.lock().unwrap().registered_events.clone()
    }

    pub fn unregistered(&self) -> Vec<RegistrationId> {
        self.state.lock().unwrap().unregistered.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn disconnect_count(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    /// Registrations that have neither delivered nor been dropped.
    pub fn pending_registrations(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.pending_tx.len() + state.pending_chaincode.len()
    }

    fn next_id(state: &mut StreamState) -> RegistrationId {
        state.next_id += 1;
        RegistrationId(state.next_id)
    }

    /// Spawn delivery tasks for every scripted registration not yet
    /// dispatched. Must be called with the stream connected.
    fn dispatch(shared: &Shared, state: &mut StreamState) {
        for idx in 0..state.pending_tx.len() {
            if state.pending_tx[idx].dispatched {
                continue;
            }
            let script = state.tx_script(&state.pending_tx[idx].tx_id);
            let pending = &mut state.pending_tx[idx];
            match script {
                EventScript::Silent => {}
                EventScript::Commit {
                    code,
                    block_number,
                    delay,
                } => {
                    pending.dispatched = true;
                    let id = pending.id;
                    let shared = Arc::clone(shared);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let mut state = shared.lock().unwrap();
                        let Some(pos) = state.pending_tx.iter().position(|p| p.id == id) else {
                            return;
                        };
                        let pending = state.pending_tx.remove(pos);
                        let event = TxEvent {
                            tx_id: pending.tx_id,
                            validation_code: code,
                            block_number,
                        };
                        let _ = pending.delivery.send(Ok(event));
                        if pending.options.disconnect {
                            state.drop_connection();
                        }
                    });
                }
                EventScript::Fail { message, delay } => {
                    pending.dispatched = true;
                    let id = pending.id;
                    let shared = Arc::clone(shared);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let mut state = shared.lock().unwrap();
                        let Some(pos) = state.pending_tx.iter().position(|p| p.id == id) else {
                            return;
                        };
                        let pending = state.pending_tx.remove(pos);
                        let _ = pending
                            .delivery
                            .send(Err(ChannelError::Transport(message)));
                        state.drop_connection();
                    });
                }
            }
        }

        for idx in 0..state.pending_chaincode.len() {
            if state.pending_chaincode[idx].dispatched {
                continue;
            }
            let Some(script) = state
                .chaincode_scripts
                .get(&state.pending_chaincode[idx].event_name)
                .cloned()
            else {
                continue;
            };
            let pending = &mut state.pending_chaincode[idx];
            pending.dispatched = true;
            let id = pending.id;
            let shared = Arc::clone(shared);
            tokio::spawn(async move {
                tokio::time::sleep(script.delay).await;
                let mut state = shared.lock().unwrap();
                let Some(pos) = state.pending_chaincode.iter().position(|p| p.id == id) else {
                    return;
                };
                let pending = state.pending_chaincode.remove(pos);
                let event = ChaincodeEvent {
                    chaincode_id: pending.chaincode_id,
                    event_name: pending.event_name,
                    tx_id: state.last_tx_id.clone().unwrap_or_default(),
                    payload: script.payload,
                    block_number: script.block_number,
                    validation_code: script.code,
                };
                let _ = pending.delivery.send(Ok(event));
                if pending.options.disconnect {
                    state.drop_connection();
                }
            });
        }
    }
}

#[async_trait]
impl EventStream for MemoryEventStream {
    fn peer_address(&self) -> String {
        self.peer.clone()
    }

    fn register_tx_event(
        &self,
        tx_id: &str,
        options: RegistrationOptions,
    ) -> Result<Registration<TxEvent>> {
        let mut state = self.state.lock().unwrap();
        let id = Self::next_id(&mut state);
        let (delivery, registration) = Registration::pair(id);
        state.pending_tx.push(PendingTx {
            id,
            tx_id: tx_id.to_string(),
            options,
            delivery,
            dispatched: false,
        });
        state.registered_tx_ids.push(tx_id.to_string());
        state.last_tx_id = Some(tx_id.to_string());
        if state.connected {
            Self::dispatch(&self.state, &mut state);
        }
        Ok(registration)
    }

    fn register_chaincode_event(
        &self,
        chaincode_id: &str,
        event_name: &str,
        options: RegistrationOptions,
    ) -> Result<Registration<ChaincodeEvent>> {
        let mut state = self.state.lock().unwrap();
        let id = Self::next_id(&mut state);
        let (delivery, registration) = Registration::pair(id);
        state.pending_chaincode.push(PendingChaincode {
            id,
            chaincode_id: chaincode_id.to_string(),
            event_name: event_name.to_string(),
            options,
            delivery,
            dispatched: false,
        });
        state.registered_events.push(event_name.to_string());
        if state.connected {
            Self::dispatch(&self.state, &mut state);
        }
        Ok(registration)
    }

    fn unregister(&self, id: RegistrationId) {
        let mut state = self.state.lock().unwrap();
        state.pending_tx.retain(|p| p.id != id);
        state.pending_chaincode.retain(|p| p.id != id);
        state.unregistered.push(id);
    }

    async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.connect_failure.clone() {
            tracing::debug!(peer = %self.peer, "scripted connect failure");
            return Err(ChannelError::Transport(message));
        }
        if state.connected {
            return Ok(());
        }
        state.connected = true;
        state.connects += 1;
        tracing::trace!(peer = %self.peer, "event stream connected");
        Self::dispatch(&self.state, &mut state);
        Ok(())
    }

    fn disconnect(&self) {
        tracing::trace!(peer = %self.peer, "event stream disconnected");
        self.state.lock().unwrap().drop_connection();
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }
}

struct Scripted<T> {
    result: Result<T>,
    delay: Duration,
}

#[derive(Default)]
struct ChannelState {
    proposal: Option<Scripted<Vec<PeerResponse>>>,
    orderer: Option<Scripted<OrdererResponse>>,
    query: Option<Result<Option<Vec<Bytes>>>>,
    install: Option<Result<Vec<PeerResponse>>>,
    proposals: Vec<ProposalRequest>,
    lifecycle_proposals: Vec<LifecycleProposalRequest>,
    orderer_requests: Vec<OrdererRequest>,
    queries: Vec<QueryRequest>,
    installs: Vec<InstallRequest>,
    stream_enumerations: usize,
}

/// In-memory channel with scripted peers and ordering service.
///
/// Unscripted calls succeed: every peer endorses with status 200, the
/// orderer acknowledges immediately and queries return no rows.
pub struct MemoryChannel {
    name: String,
    peers: Vec<PeerTarget>,
    streams: Vec<Arc<MemoryEventStream>>,
    state: Mutex<ChannelState>,
}

impl MemoryChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            peers: Vec::new(),
            streams: Vec::new(),
            state: Mutex::new(ChannelState::default()),
        }
    }

    pub fn with_peer(mut self, name: &str, url: &str) -> Self {
        self.peers.push(PeerTarget::new(name, url));
        self
    }

    pub fn with_event_stream(mut self, stream: Arc<MemoryEventStream>) -> Self {
        self.streams.push(stream);
        self
    }

    /// Script the endorsement responses returned after `delay`.
    pub fn script_proposal(&self, responses: Vec<PeerResponse>, delay: Duration) {
        self.state.lock().unwrap().proposal = Some(Scripted {
            result: Ok(responses),
            delay,
        });
    }

    /// Make the proposal call itself fail.
    pub fn script_proposal_error(&self, error: ChannelError) {
        self.state.lock().unwrap().proposal = Some(Scripted {
            result: Err(error),
            delay: Duration::ZERO,
        });
    }

    pub fn script_orderer(&self, response: OrdererResponse, delay: Duration) {
        self.state.lock().unwrap().orderer = Some(Scripted {
            result: Ok(response),
            delay,
        });
    }

    pub fn script_orderer_error(&self, error: ChannelError, delay: Duration) {
        self.state.lock().unwrap().orderer = Some(Scripted {
            result: Err(error),
            delay,
        });
    }

    pub fn script_query(&self, result: Result<Option<Vec<Bytes>>>) {
        self.state.lock().unwrap().query = Some(result);
    }

    pub fn script_install(&self, result: Result<Vec<PeerResponse>>) {
        self.state.lock().unwrap().install = Some(result);
    }

    pub fn event_streams(&self) -> &[Arc<MemoryEventStream>] {
        &self.streams
    }

    pub fn proposals(&self) -> Vec<ProposalRequest> {
        self.state.lock().unwrap().proposals.clone()
    }

    pub fn lifecycle_proposals(&self) -> Vec<LifecycleProposalRequest> {
        self.state.lock().unwrap().lifecycle_proposals.clone()
    }

    pub fn orderer_requests(&self) -> Vec<OrdererRequest> {
        self.state.lock().unwrap().orderer_requests.clone()
    }

    pub fn queries(&self) -> Vec<QueryRequest> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn installs(&self) -> Vec<InstallRequest> {
        self.state.lock().unwrap().installs.clone()
    }

    /// How many times the org event streams were requested.
    pub fn stream_enumerations(&self) -> usize {
        self.state.lock().unwrap().stream_enumerations
    }

    fn endorse_all(&self) -> Vec<PeerResponse> {
        if self.peers.is_empty() {
            return vec![Ok(ProposalResponse::new("peer0", 200, Bytes::new()))];
        }
        self.peers
            .iter()
            .map(|p| Ok(ProposalResponse::new(p.url.clone(), 200, Bytes::new())))
            .collect()
    }

    async fn endorse(&self, tx_id: &str) -> Result<ProposalOutcome> {
        let (result, delay) = {
            let state = self.state.lock().unwrap();
            match &state.proposal {
                Some(s) => (s.result.clone(), s.delay),
                None => (Ok(self.endorse_all()), Duration::ZERO),
            }
        };
        tokio::time::sleep(delay).await;
        let responses = result?;
        Ok(ProposalOutcome {
            responses,
            proposal: ProposalRef {
                tx_id: tx_id.to_string(),
                bytes: Bytes::from(format!("proposal:{tx_id}")),
            },
        })
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_transaction_proposal(
        &self,
        request: &ProposalRequest,
    ) -> Result<ProposalOutcome> {
        self.state.lock().unwrap().proposals.push(request.clone());
        self.endorse(request.tx_id.value()).await
    }

    async fn send_lifecycle_proposal(
        &self,
        request: &LifecycleProposalRequest,
    ) -> Result<ProposalOutcome> {
        self.state
            .lock()
            .unwrap()
            .lifecycle_proposals
            .push(request.clone());
        self.endorse(request.tx_id.value()).await
    }

    async fn send_transaction(&self, request: OrdererRequest) -> Result<OrdererResponse> {
        let (result, delay) = {
            let mut state = self.state.lock().unwrap();
            state.orderer_requests.push(request);
            match &state.orderer {
                Some(s) => (s.result.clone(), s.delay),
                None => (Ok(OrdererResponse::success()), Duration::ZERO),
            }
        };
        tokio::time::sleep(delay).await;
        result
    }

    async fn query_by_chaincode(&self, request: &QueryRequest) -> Result<Option<Vec<Bytes>>> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(request.clone());
        state.query.clone().unwrap_or(Ok(None))
    }

    async fn install_chaincode(&self, request: &InstallRequest) -> Result<Vec<PeerResponse>> {
        let mut state = self.state.lock().unwrap();
        state.installs.push(request.clone());
        match state.install.clone() {
            Some(result) => result,
            None => Ok(self.endorse_all()),
        }
    }

    fn event_streams_for_org(&self) -> Vec<Arc<dyn EventStream>> {
        self.state.lock().unwrap().stream_enumerations += 1;
        self.streams
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn EventStream>)
            .collect()
    }

    fn peers(&self) -> Vec<PeerTarget> {
        self.peers.clone()
    }
}
