//! # fabgate core
//!
//! Pure data model for submitting transactions to a permissioned ledger
//! network: transaction ids, proposal responses, caller-facing outcomes and
//! endorsement validation.
//!
//! This crate performs no I/O. The network boundary lives in
//! `fabgate-channel`; the submission protocol in `fabgate`.
//!
//! ## Key Types
//!
//! - [`TransactionId`] - Correlates proposal, commit events and orderer submission
//! - [`PeerResponse`] - One peer's endorsement, or the error in its place
//! - [`ApiResponse`] - Success/Failure outcome returned to callers
//! - [`TxnOptions`] - Custom event subscriptions, transient data, operation kind
//!
//! ## Endorsement policy
//!
//! [`require_unanimous`] accepts a response set only when every peer
//! endorsed. See [`validation`].

pub mod error;
pub mod event;
pub mod options;
pub mod response;
pub mod types;
pub mod validation;

pub use error::{ConfirmError, Result, ValidationError};
pub use event::{ChaincodeEvent, CommitNotice, TxEvent, VALID_CODE};
pub use options::{EventCallback, OperationKind, TransientMap, TxnCustomEvent, TxnOptions};
pub use response::{
    ApiResponse, Payload, PeerError, PeerResponse, ProposalResponse, Status, STATUS_OK,
};
pub use types::{
    validate_transaction_name, ChaincodeSpec, ChaincodeType, LifecycleKind, TransactionId,
    UploadType, NONCE_LEN,
};
pub use validation::{partition_responses, require_unanimous, PartitionedResponses};
