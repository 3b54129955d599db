//! Transaction submission.
//!
//! A submission sends the proposal, requires every peer to endorse, then
//! waits on two things at once: a commit confirmation from every event
//! stream of the client's organisations, and the ordering service
//! acknowledgement. The transaction counts as committed only when all of
//! them succeed.
//!
//! Failures before anything reaches the orderer are returned as `Err`.
//! Failures after that point are collected into a [`SubmissionOutcome`] and
//! surface as a failed [`ApiResponse`], since the transaction may already
//! be in flight and the caller needs a value to reconcile against.

use std::sync::Arc;

use fabgate_channel::{
    Channel, LifecycleProposalRequest, OrdererRequest, ProposalOutcome, ProposalRequest,
};
use fabgate_core::{
    require_unanimous, ApiResponse, ConfirmError, TransactionId, TxEvent, TxnOptions,
};
use futures::future::join_all;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::confirmer::{ConfirmerSettings, ConfirmerState, EventConfirmer};
use crate::error::{GatewayError, Result};

/// A post-endorsement failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionFault {
    /// The ordering service answered with a non-success status.
    #[error("Failed to order the transaction. Error code: {status}")]
    OrdererRejected { status: String, info: String },

    /// The ordering service could not be reached.
    #[error("failed to send the transaction to the orderer: {0}")]
    OrdererUnreachable(String),

    /// A peer did not confirm the commit.
    #[error(transparent)]
    Event(#[from] ConfirmError),
}

/// One event stream's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfirmation {
    pub peer: String,
    pub state: ConfirmerState,
    pub result: std::result::Result<TxEvent, ConfirmError>,
}

/// Everything observed after endorsement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub tx_id: String,
    /// Status the ordering service acknowledged with, if it answered.
    pub orderer_status: Option<String>,
    /// One entry per event stream, in enumeration order.
    pub confirmations: Vec<PeerConfirmation>,
    pub faults: Vec<SubmissionFault>,
}

impl SubmissionOutcome {
    pub fn is_committed(&self) -> bool {
        self.faults.is_empty()
    }

    /// Success carrying the transaction id, or failure carrying every fault
    /// message joined with `"; "`.
    pub fn into_response(self) -> ApiResponse {
        if self.is_committed() {
            return ApiResponse::success_text(self.tx_id);
        }
        let message = self
            .faults
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        ApiResponse::failure(message)
    }
}

/// Drives one submission with a fixed set of options.
#[derive(Debug, Clone)]
pub struct SubmissionCoordinator {
    config: Arc<GatewayConfig>,
    options: TxnOptions,
}

impl SubmissionCoordinator {
    pub fn new(config: Arc<GatewayConfig>, options: TxnOptions) -> Self {
        Self { config, options }
    }

    pub fn options(&self) -> &TxnOptions {
        &self.options
    }

    /// Submit a transaction and reduce the outcome to an [`ApiResponse`].
    pub async fn submit(
        &self,
        channel: &dyn Channel,
        tx_id: &TransactionId,
        function: &str,
        chaincode_id: &str,
        args: &[String],
    ) -> Result<ApiResponse> {
        let outcome = self
            .submit_detailed(channel, tx_id, function, chaincode_id, args)
            .await?;
        Ok(outcome.into_response())
    }

    /// Submit a transaction and report every peer's verdict.
    pub async fn submit_detailed(
        &self,
        channel: &dyn Channel,
        tx_id: &TransactionId,
        function: &str,
        chaincode_id: &str,
        args: &[String],
    ) -> Result<SubmissionOutcome> {
        let ProposalOutcome {
            responses,
            proposal,
        } = self
            .send_proposal(channel, tx_id, function, chaincode_id, args)
            .await?;

        // Nothing is registered or ordered unless every peer endorsed.
        let endorsed = require_unanimous(responses)?;
        tracing::info!(
            tx_id = %tx_id,
            endorsements = endorsed.len(),
            "proposal endorsed by all peers"
        );

        let streams = channel.event_streams_for_org();
        if streams.is_empty() {
            tracing::warn!(tx_id = %tx_id, "no event streams to confirm the commit on");
        }

        let settings = ConfirmerSettings::from(self.config.as_ref());
        let listeners = self.options.custom_events.as_slice();
        let confirmations = streams.into_iter().map(|stream| {
            let settings = settings.clone();
            async move {
                let mut confirmer = EventConfirmer::new(stream, settings);
                let result = confirmer
                    .confirm_transaction_with_listeners(tx_id.value(), chaincode_id, listeners)
                    .await;
                PeerConfirmation {
                    peer: confirmer.peer_address(),
                    state: confirmer.state(),
                    result,
                }
            }
        });

        let request = OrdererRequest {
            proposal,
            responses: endorsed,
        };
        let (confirmations, ordered) =
            tokio::join!(join_all(confirmations), channel.send_transaction(request));

        let mut faults = Vec::new();
        let orderer_status = match ordered {
            Ok(ack) if ack.is_success() => {
                tracing::info!(tx_id = %tx_id, "successfully sent transaction to the orderer");
                Some(ack.status)
            }
            Ok(ack) => {
                tracing::error!(
                    tx_id = %tx_id,
                    info = %ack.info,
                    "Failed to order the transaction. Error code: {}",
                    ack.status
                );
                faults.push(SubmissionFault::OrdererRejected {
                    status: ack.status.clone(),
                    info: ack.info,
                });
                Some(ack.status)
            }
            Err(err) => {
                tracing::error!(tx_id = %tx_id, error = %err, "orderer unreachable");
                faults.push(SubmissionFault::OrdererUnreachable(err.to_string()));
                None
            }
        };

        for confirmation in &confirmations {
            if let Err(err) = &confirmation.result {
                faults.push(SubmissionFault::Event(err.clone()));
            }
        }

        if faults.is_empty() {
            tracing::info!(tx_id = %tx_id, peers = confirmations.len(), "transaction committed");
        } else {
            tracing::warn!(tx_id = %tx_id, faults = faults.len(), "transaction not confirmed");
        }

        Ok(SubmissionOutcome {
            tx_id: tx_id.value().to_string(),
            orderer_status,
            confirmations,
            faults,
        })
    }

    /// Plain invokes go to the proposal entry point with any transient data;
    /// instantiate and upgrade go to the lifecycle entry point instead.
    async fn send_proposal(
        &self,
        channel: &dyn Channel,
        tx_id: &TransactionId,
        function: &str,
        chaincode_id: &str,
        args: &[String],
    ) -> Result<ProposalOutcome> {
        let outcome = match self.options.kind.lifecycle() {
            None => {
                let request = ProposalRequest {
                    chaincode_id: chaincode_id.to_string(),
                    function: function.to_string(),
                    args: args.to_vec(),
                    tx_id: tx_id.clone(),
                    transient_map: self.options.transient_map.clone(),
                };
                tracing::debug!(tx_id = %tx_id, function, "sending transaction proposal");
                channel.send_transaction_proposal(&request).await?
            }
            Some(kind) => {
                let spec = self
                    .options
                    .chaincode_spec
                    .as_ref()
                    .ok_or_else(|| GatewayError::MissingChaincodeSpec(kind.to_string()))?;
                let request = LifecycleProposalRequest {
                    kind,
                    chaincode_id: chaincode_id.to_string(),
                    chaincode_type: spec.language,
                    chaincode_version: spec.version.clone(),
                    function: function.to_string(),
                    args: args.to_vec(),
                    tx_id: tx_id.clone(),
                    timeout: self.config.lifecycle_timeout,
                };
                tracing::debug!(tx_id = %tx_id, %kind, "sending lifecycle proposal");
                channel.send_lifecycle_proposal(&request).await?
            }
        };
        Ok(outcome)
    }
}
