//! Channel abstraction: the capability the client needs from a joined
//! ledger channel.
//!
//! Implementations wrap a concrete network client (any SDK generation);
//! the protocol in `fabgate` only ever sees these traits.

use std::sync::Arc;

use async_trait::async_trait;
use fabgate_core::{ChaincodeEvent, PeerResponse, TxEvent};

use crate::error::Result;
use crate::events::{Registration, RegistrationId, RegistrationOptions};
use crate::request::{
    InstallRequest, LifecycleProposalRequest, OrdererRequest, OrdererResponse, PeerTarget,
    ProposalOutcome, ProposalRequest, QueryRequest,
};

/// A joined communication channel to the ledger network.
///
/// Owned by the caller and borrowed per call. Implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name, for diagnostics.
    fn name(&self) -> &str;

    /// Send an invoke proposal to the endorsing peers.
    async fn send_transaction_proposal(&self, request: &ProposalRequest)
        -> Result<ProposalOutcome>;

    /// Send an instantiate or upgrade proposal through the lifecycle entry
    /// point, honouring `request.timeout`.
    async fn send_lifecycle_proposal(
        &self,
        request: &LifecycleProposalRequest,
    ) -> Result<ProposalOutcome>;

    /// Submit endorsed responses to the ordering service.
    async fn send_transaction(&self, request: OrdererRequest) -> Result<OrdererResponse>;

    /// Evaluate a read-only proposal.
    ///
    /// `Ok(None)` means the peers returned nothing.
    async fn query_by_chaincode(&self, request: &QueryRequest) -> Result<Option<Vec<bytes::Bytes>>>;

    /// Install a chaincode package on the request's target peers.
    async fn install_chaincode(&self, request: &InstallRequest) -> Result<Vec<PeerResponse>>;

    /// Event streams of the client's own organisation, one per peer, in a
    /// stable order.
    fn event_streams_for_org(&self) -> Vec<Arc<dyn EventStream>>;

    /// Peers joined to this channel.
    fn peers(&self) -> Vec<PeerTarget>;
}

/// A per-peer source of commit notifications.
///
/// Connected only for the duration of one confirmation wait, then
/// explicitly disconnected.
#[async_trait]
pub trait EventStream: Send + Sync {
    /// Address of the peer behind this stream.
    fn peer_address(&self) -> String;

    /// Register interest in the commit of `tx_id`.
    fn register_tx_event(
        &self,
        tx_id: &str,
        options: RegistrationOptions,
    ) -> Result<Registration<TxEvent>>;

    /// Register interest in a named event emitted by `chaincode_id`.
    fn register_chaincode_event(
        &self,
        chaincode_id: &str,
        event_name: &str,
        options: RegistrationOptions,
    ) -> Result<Registration<ChaincodeEvent>>;

    /// Drop a registration that has not delivered yet. Unknown ids are
    /// ignored.
    fn unregister(&self, id: RegistrationId);

    /// Start receiving events. Connecting an already connected stream is a
    /// no-op.
    async fn connect(&self) -> Result<()>;

    /// Stop receiving events. Idempotent.
    fn disconnect(&self);

    fn is_connected(&self) -> bool;
}
