//! # fabgate channel
//!
//! The boundary between the submission protocol and the network client.
//!
//! ## Overview
//!
//! A [`Channel`] is a joined ledger channel: it sends proposals, forwards
//! endorsed transactions to the ordering service, evaluates queries and
//! hands out one [`EventStream`] per peer of the client's organisation.
//! Concrete network clients (of any SDK generation) implement these traits;
//! the protocol never branches on which one it holds.
//!
//! Event interest is expressed as a [`Registration`], which resolves at
//! most once.
//!
//! ## Testing
//!
//! The [`memory`] module provides a scripted [`MemoryChannel`] and
//! [`MemoryEventStream`] driven by tokio timers.

pub mod channel;
pub mod error;
pub mod events;
pub mod memory;
pub mod request;

pub use channel::{Channel, EventStream};
pub use error::{ChannelError, Result};
pub use events::{Delivery, Registration, RegistrationId, RegistrationOptions};
pub use memory::{EventScript, MemoryChannel, MemoryEventStream};
pub use request::{
    InstallRequest, LifecycleProposalRequest, OrdererRequest, OrdererResponse, PeerTarget,
    ProposalOutcome, ProposalRef, ProposalRequest, QueryRequest, ORDERER_SUCCESS,
};
