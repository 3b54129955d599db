//! Commit notifications delivered by peer event streams.

use bytes::Bytes;

/// Validation code peers report for a transaction written to the ledger.
pub const VALID_CODE: &str = "VALID";

/// A transaction-commit notification from one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxEvent {
    pub tx_id: String,
    pub validation_code: String,
    pub block_number: u64,
}

/// A custom event emitted by chaincode and delivered once its transaction
/// is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaincodeEvent {
    pub chaincode_id: String,
    pub event_name: String,
    pub tx_id: String,
    pub payload: Bytes,
    pub block_number: u64,
    pub validation_code: String,
}

impl ChaincodeEvent {
    /// Payload decoded as UTF-8, lossily.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Anything a peer reports as committed in a block.
pub trait CommitNotice {
    fn tx_id(&self) -> &str;
    fn validation_code(&self) -> &str;
    fn block_number(&self) -> u64;

    fn is_valid(&self, valid_code: &str) -> bool {
        self.validation_code() == valid_code
    }
}

impl CommitNotice for TxEvent {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn validation_code(&self) -> &str {
        &self.validation_code
    }

    fn block_number(&self) -> u64 {
        self.block_number
    }
}

impl CommitNotice for ChaincodeEvent {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn validation_code(&self) -> &str {
        &self.validation_code
    }

    fn block_number(&self) -> u64 {
        self.block_number
    }
}
