//! Single-use transactions.

use fabgate_core::{ApiResponse, ChaincodeEvent, ConfirmError, TransactionId, TransientMap, TxnOptions};

use crate::contract::Contract;
use crate::error::{GatewayError, Result};

/// One invocation of a chaincode function.
///
/// A transaction is either submitted or evaluated, exactly once. Any
/// second attempt fails with [`GatewayError::AlreadyInvoked`] before any
/// I/O, whichever method was called first. Options are frozen from that
/// point on.
#[derive(Debug)]
pub struct Transaction {
    contract: Contract,
    name: String,
    tx_id: TransactionId,
    invoked: bool,
    options: TxnOptions,
}

impl Transaction {
    pub(crate) fn new(contract: Contract, name: &str) -> Self {
        let tx_id = contract.network().new_transaction_id(false);
        Self {
            contract,
            name: name.to_string(),
            tx_id,
            invoked: false,
            options: TxnOptions::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.tx_id
    }

    pub fn is_invoked(&self) -> bool {
        self.invoked
    }

    /// Call `callback` once the named chaincode event arrives after this
    /// transaction commits. Returns the number of listeners registered.
    pub fn add_event_listener<F>(&mut self, event_name: &str, callback: F) -> Result<usize>
    where
        F: Fn(std::result::Result<ChaincodeEvent, ConfirmError>) + Send + Sync + 'static,
    {
        self.ensure_not_invoked()?;
        self.options = std::mem::take(&mut self.options).with_event(event_name, callback);
        Ok(self.options.custom_events.len())
    }

    /// Attach private data to the proposal.
    pub fn set_transient(&mut self, transient: TransientMap) -> Result<()> {
        self.ensure_not_invoked()?;
        self.options.transient_map = Some(transient);
        Ok(())
    }

    /// Submit for endorsement and ordering, and wait for the commit.
    pub async fn submit(&mut self, args: &[String]) -> Result<ApiResponse> {
        self.set_invoked_or_err()?;
        let coordinator = self.contract.submission_coordinator(self.options.clone());
        coordinator
            .submit(
                self.contract.network().channel(),
                &self.tx_id,
                &self.name,
                self.contract.chaincode_id(),
                args,
            )
            .await
    }

    /// Evaluate on the channel peers. Nothing is ordered.
    pub async fn evaluate(&mut self, args: &[String]) -> Result<ApiResponse> {
        self.set_invoked_or_err()?;
        self.contract
            .query_executor()
            .query_chaincode(
                self.contract.chaincode_id(),
                self.contract.network().channel(),
                &self.tx_id,
                &self.name,
                args,
            )
            .await
    }

    fn ensure_not_invoked(&self) -> Result<()> {
        if self.invoked {
            tracing::error!(tx_id = %self.tx_id, "transaction has already been invoked");
            return Err(GatewayError::AlreadyInvoked);
        }
        Ok(())
    }

    fn set_invoked_or_err(&mut self) -> Result<()> {
        self.ensure_not_invoked()?;
        self.invoked = true;
        Ok(())
    }
}
