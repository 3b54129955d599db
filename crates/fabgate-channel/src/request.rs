//! Request and acknowledgement values exchanged with the channel.
//!
//! The byte layout of proposals and the transport underneath belong to the
//! channel implementation; these are the in-memory shapes the client hands
//! across the boundary.

use std::time::Duration;

use bytes::Bytes;
use fabgate_core::{
    ChaincodeType, LifecycleKind, PeerResponse, ProposalResponse, TransactionId, TransientMap,
};

/// Status string the ordering service returns on acceptance.
pub const ORDERER_SUCCESS: &str = "SUCCESS";

/// A peer the client may target directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerTarget {
    pub name: String,
    pub url: String,
}

impl PeerTarget {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// An invoke proposal for endorsement.
#[derive(Debug, Clone)]
pub struct ProposalRequest {
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<String>,
    pub tx_id: TransactionId,
    pub transient_map: Option<TransientMap>,
}

/// An instantiate or upgrade proposal.
///
/// Carries chaincode type and version instead of transient data, and a
/// longer deadline than plain invokes.
#[derive(Debug, Clone)]
pub struct LifecycleProposalRequest {
    pub kind: LifecycleKind,
    pub chaincode_id: String,
    pub chaincode_type: ChaincodeType,
    pub chaincode_version: String,
    pub function: String,
    pub args: Vec<String>,
    pub tx_id: TransactionId,
    pub timeout: Duration,
}

/// Opaque reference to a sent proposal, needed to assemble the transaction
/// for the orderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalRef {
    pub tx_id: String,
    pub bytes: Bytes,
}

/// Endorsement responses plus the proposal they answer.
#[derive(Debug, Clone)]
pub struct ProposalOutcome {
    pub responses: Vec<PeerResponse>,
    pub proposal: ProposalRef,
}

/// Endorsed transaction handed to the ordering service.
#[derive(Debug, Clone)]
pub struct OrdererRequest {
    pub proposal: ProposalRef,
    pub responses: Vec<ProposalResponse>,
}

/// Ordering service acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdererResponse {
    pub status: String,
    pub info: String,
}

impl OrdererResponse {
    pub fn success() -> Self {
        Self {
            status: ORDERER_SUCCESS.to_string(),
            info: String::new(),
        }
    }

    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            info: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ORDERER_SUCCESS
    }
}

/// A read-only proposal. Never ordered.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<String>,
    pub tx_id: TransactionId,
    pub targets: Vec<PeerTarget>,
}

/// Install of a chaincode package on the given peers.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub chaincode_id: String,
    pub chaincode_version: String,
    pub package: Bytes,
    pub targets: Vec<PeerTarget>,
    pub tx_id: TransactionId,
}
