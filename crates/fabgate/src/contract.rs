//! Contract handles: one chaincode on one network.

use fabgate_core::{validate_transaction_name, ApiResponse, TxnOptions};

use crate::error::Result;
use crate::network::Network;
use crate::query::QueryExecutor;
use crate::submission::SubmissionCoordinator;
use crate::transaction::Transaction;

/// A chaincode deployed on a network.
///
/// Holds no per-call state: every submission and query builds its own
/// coordinator.
#[derive(Debug, Clone)]
pub struct Contract {
    network: Network,
    chaincode_id: String,
}

impl Contract {
    pub(crate) fn new(network: Network, chaincode_id: &str) -> Self {
        Self {
            network,
            chaincode_id: chaincode_id.to_string(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn chaincode_id(&self) -> &str {
        &self.chaincode_id
    }

    /// Create a single-use transaction invoking `name`.
    pub fn create_transaction(&self, name: &str) -> Result<Transaction> {
        validate_transaction_name(name)?;
        Ok(Transaction::new(self.clone(), name))
    }

    /// Submit `name(args)` and wait for it to be committed.
    pub async fn submit_transaction(&self, name: &str, args: &[String]) -> Result<ApiResponse> {
        self.create_transaction(name)?.submit(args).await
    }

    /// Evaluate `name(args)` without ordering it.
    pub async fn evaluate_transaction(&self, name: &str, args: &[String]) -> Result<ApiResponse> {
        self.create_transaction(name)?.evaluate(args).await
    }

    pub(crate) fn submission_coordinator(&self, options: TxnOptions) -> SubmissionCoordinator {
        SubmissionCoordinator::new(self.network.shared_config(), options)
    }

    pub(crate) fn query_executor(&self) -> QueryExecutor {
        QueryExecutor::new(self.network.peers())
    }
}
