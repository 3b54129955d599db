//! # fabgate
//!
//! Transaction submission and commit confirmation for permissioned ledger
//! networks.
//!
//! ## Overview
//!
//! A submission gathers endorsements from every target peer, then waits in
//! parallel for the ordering service to accept the transaction and for
//! every event stream of the client's organisations to report it committed
//! and valid. Only when all of them agree is the transaction reported as
//! successful.
//!
//! ```text
//! submit ─▶ proposal ─▶ require_unanimous ─┬─▶ EventConfirmer (per stream) ─┐
//!                                          └─▶ orderer ──────────────────────┴─▶ ApiResponse
//! ```
//!
//! ## Outcomes
//!
//! - Failures before anything is ordered (empty or partial endorsement,
//!   reusing a transaction, channel errors on the proposal) are returned as
//!   [`GatewayError`].
//! - Failures after that (orderer rejection, invalid commit, stream error,
//!   timeout) are returned as [`ApiResponse::Failure`] naming the peer or
//!   orderer status, since the transaction may already be on its way.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fabgate::{GatewayConfig, Network};
//! use fabgate::channel::MemoryChannel;
//!
//! async fn example() -> fabgate::Result<()> {
//!     let channel = Arc::new(MemoryChannel::new("mychannel"));
//!     let network = Network::new(channel, b"user1".to_vec(), GatewayConfig::default())?;
//!
//!     let contract = network.contract("fabcar")?;
//!     let response = contract
//!         .submit_transaction("createCar", &["CAR12".into(), "Honda".into()])
//!         .await?;
//!     println!("{:?}", response);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `fabgate::core` - Data model and endorsement validation
//! - `fabgate::channel` - Channel and event-stream traits, in-memory channel

pub mod config;
pub mod confirmer;
pub mod contract;
pub mod error;
pub mod lifecycle;
pub mod network;
pub mod package;
pub mod query;
pub mod submission;
pub mod transaction;

pub use fabgate_channel as channel;
pub use fabgate_core as core;

pub use config::{ConfigError, GatewayConfig, DEFAULT_EVENT_TIMEOUT, DEFAULT_LIFECYCLE_TIMEOUT};
pub use confirmer::{ConfirmerSettings, ConfirmerState, EventConfirmer};
pub use contract::Contract;
pub use error::{GatewayError, Result};
pub use lifecycle::{LifecycleCoordinator, INSTALL_SUCCESS};
pub use network::{Network, DEFAULT_INIT_FUNCTION};
pub use package::{package_chaincode, PackageError, PackageMetadata};
pub use query::QueryExecutor;
pub use submission::{PeerConfirmation, SubmissionCoordinator, SubmissionFault, SubmissionOutcome};
pub use transaction::Transaction;

pub use fabgate_core::{ApiResponse, ChaincodeSpec, ChaincodeType, Payload, Status, TxnOptions, UploadType};
