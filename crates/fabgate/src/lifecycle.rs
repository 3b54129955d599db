//! Chaincode lifecycle: install, instantiate and upgrade.
//!
//! Install sends a package to the target peers and requires every one of
//! them to accept it. Instantiate and upgrade are ordinary submissions
//! routed through the lifecycle proposal entry point.

use std::sync::Arc;

use bytes::Bytes;
use fabgate_channel::{Channel, InstallRequest, PeerTarget};
use fabgate_core::{
    require_unanimous, ApiResponse, ChaincodeSpec, LifecycleKind, OperationKind, TransactionId,
    TxnOptions, UploadType,
};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::package::package_chaincode;
use crate::submission::SubmissionCoordinator;

/// Payload of a successful install.
pub const INSTALL_SUCCESS: &str = "Successfully Installed chaincode";

/// Runs lifecycle operations against a fixed set of peers.
#[derive(Debug, Clone)]
pub struct LifecycleCoordinator {
    targets: Vec<PeerTarget>,
    config: Arc<GatewayConfig>,
}

impl LifecycleCoordinator {
    pub fn new(targets: Vec<PeerTarget>, config: Arc<GatewayConfig>) -> Self {
        Self { targets, config }
    }

    /// Install `chaincode` on every target peer.
    ///
    /// Archives are packaged locally first; CDS packages are sent as-is.
    /// Fails unless every peer accepts the install.
    pub async fn install_chaincode(
        &self,
        channel: &dyn Channel,
        tx_id: &TransactionId,
        chaincode_id: &str,
        chaincode: Bytes,
        spec: &ChaincodeSpec,
    ) -> Result<ApiResponse> {
        let package = match spec.upload_type {
            Some(UploadType::Cds) => chaincode,
            Some(UploadType::Archive) => {
                package_chaincode(&self.config.package_dir, chaincode_id, spec, chaincode).await?
            }
            None => return Err(GatewayError::MissingUploadType),
        };

        let request = InstallRequest {
            chaincode_id: chaincode_id.to_string(),
            chaincode_version: spec.version.clone(),
            package,
            targets: self.targets.clone(),
            tx_id: tx_id.clone(),
        };
        let responses = channel.install_chaincode(&request).await?;
        let accepted = require_unanimous(responses)?;

        tracing::info!(
            chaincode_id,
            version = %spec.version,
            peers = accepted.len(),
            "successfully sent install proposal and received responses"
        );
        Ok(ApiResponse::success_text(INSTALL_SUCCESS))
    }

    /// Instantiate or upgrade a chaincode through the submission path.
    pub async fn instantiate_or_upgrade(
        &self,
        kind: LifecycleKind,
        channel: &dyn Channel,
        tx_id: &TransactionId,
        chaincode_id: &str,
        spec: &ChaincodeSpec,
        function: &str,
        args: &[String],
    ) -> Result<ApiResponse> {
        let operation = match kind {
            LifecycleKind::Instantiate => OperationKind::Instantiate,
            LifecycleKind::Upgrade => OperationKind::Upgrade,
            LifecycleKind::Install => {
                return Err(GatewayError::InvalidOperation(
                    "install does not go through the submission path".into(),
                ))
            }
        };

        tracing::info!(chaincode_id, version = %spec.version, %kind, "submitting lifecycle transaction");
        SubmissionCoordinator::new(
            Arc::clone(&self.config),
            TxnOptions::lifecycle(operation, spec.clone()),
        )
        .submit(channel, tx_id, function, chaincode_id, args)
        .await
    }
}
