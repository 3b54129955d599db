//! The network: a joined channel plus the identity transactions are minted
//! for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use fabgate_channel::{Channel, PeerTarget};
use fabgate_core::{ApiResponse, ChaincodeSpec, LifecycleKind, TransactionId};

use crate::config::GatewayConfig;
use crate::contract::Contract;
use crate::error::{GatewayError, Result};
use crate::lifecycle::LifecycleCoordinator;

/// Init function used by instantiate and upgrade when none is given.
pub const DEFAULT_INIT_FUNCTION: &str = "init";

struct NetworkInner {
    channel: Arc<dyn Channel>,
    creator: Vec<u8>,
    config: Arc<GatewayConfig>,
    connected: AtomicBool,
}

/// Entry point for contracts and chaincode lifecycle on one channel.
///
/// Cheap to clone; clones share the connection flag.
#[derive(Clone)]
pub struct Network {
    inner: Arc<NetworkInner>,
}

impl Network {
    /// Wrap a connected channel. `creator` is the serialized identity that
    /// transaction ids are derived from.
    pub fn new(
        channel: Arc<dyn Channel>,
        creator: impl Into<Vec<u8>>,
        config: GatewayConfig,
    ) -> Result<Self> {
        config.validate()?;
        tracing::info!(channel = %channel.name(), "network connected");
        Ok(Self {
            inner: Arc::new(NetworkInner {
                channel,
                creator: creator.into(),
                config: Arc::new(config),
                connected: AtomicBool::new(true),
            }),
        })
    }

    pub fn channel(&self) -> &dyn Channel {
        self.inner.channel.as_ref()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub(crate) fn shared_config(&self) -> Arc<GatewayConfig> {
        Arc::clone(&self.inner.config)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Stop handing out contracts. Transactions already created still run.
    pub fn disconnect(&self) {
        if self.inner.connected.swap(false, Ordering::AcqRel) {
            tracing::info!(channel = %self.inner.channel.name(), "network disconnected");
        }
    }

    /// Peers of the channel, used as query and install targets.
    pub fn peers(&self) -> Vec<PeerTarget> {
        self.inner.channel.peers()
    }

    /// Mint a fresh transaction id for this network's identity.
    pub fn new_transaction_id(&self, admin: bool) -> TransactionId {
        TransactionId::generate(&self.inner.creator, admin)
    }

    /// A contract handle for `chaincode_id`.
    pub fn contract(&self, chaincode_id: &str) -> Result<Contract> {
        self.ensure_connected()?;
        Ok(Contract::new(self.clone(), chaincode_id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chaincode lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Install a chaincode on every channel peer with an admin transaction id.
    pub async fn install_contract(
        &self,
        chaincode_id: &str,
        chaincode: Bytes,
        spec: &ChaincodeSpec,
    ) -> Result<ApiResponse> {
        self.ensure_connected()?;
        if spec.upload_type.is_none() {
            tracing::error!(chaincode_id, "upload type is required for chaincode install");
            return Err(GatewayError::MissingUploadType);
        }
        self.lifecycle()
            .install_chaincode(
                self.channel(),
                &self.new_transaction_id(true),
                chaincode_id,
                chaincode,
                spec,
            )
            .await
    }

    /// Instantiate a chaincode. `function` defaults to `"init"`.
    pub async fn instantiate_contract(
        &self,
        chaincode_id: &str,
        spec: &ChaincodeSpec,
        function: Option<&str>,
        args: &[String],
    ) -> Result<ApiResponse> {
        self.instantiate_or_upgrade(LifecycleKind::Instantiate, chaincode_id, spec, function, args)
            .await
    }

    /// Upgrade a chaincode to `spec.version`. `function` defaults to `"init"`.
    pub async fn upgrade_contract(
        &self,
        chaincode_id: &str,
        spec: &ChaincodeSpec,
        function: Option<&str>,
        args: &[String],
    ) -> Result<ApiResponse> {
        self.instantiate_or_upgrade(LifecycleKind::Upgrade, chaincode_id, spec, function, args)
            .await
    }

    async fn instantiate_or_upgrade(
        &self,
        kind: LifecycleKind,
        chaincode_id: &str,
        spec: &ChaincodeSpec,
        function: Option<&str>,
        args: &[String],
    ) -> Result<ApiResponse> {
        self.ensure_connected()?;
        self.lifecycle()
            .instantiate_or_upgrade(
                kind,
                self.channel(),
                &self.new_transaction_id(true),
                chaincode_id,
                spec,
                function.unwrap_or(DEFAULT_INIT_FUNCTION),
                args,
            )
            .await
    }

    fn lifecycle(&self) -> LifecycleCoordinator {
        LifecycleCoordinator::new(self.peers(), self.shared_config())
    }

    fn ensure_connected(&self) -> Result<()> {
        if !self.is_connected() {
            tracing::error!("unable to return contract from disconnected network");
            return Err(GatewayError::Disconnected);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("channel", &self.inner.channel.name())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
