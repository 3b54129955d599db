//! Error types for the fabgate core.

use thiserror::Error;

/// Errors raised while checking proposal responses and caller input.
///
/// All of these are detected before anything is sent to the ordering
/// service, so the ledger is never affected when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no results were returned from the request")]
    EmptyResponseSet,

    #[error("did not receive all valid proposal responses ({invalid} invalid): {}", .messages.join("; "))]
    IncompleteEndorsement {
        invalid: usize,
        messages: Vec<String>,
    },

    #[error("transaction name must be a non-empty string: {0:?}")]
    InvalidTransactionName(String),
}

/// Per-peer commit confirmation failures.
///
/// These are aggregated into the submission outcome rather than raised,
/// and every variant names the peer it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmError {
    #[error("the invoke chaincode transaction was invalid on {peer}, code:{code}")]
    Invalidated { peer: String, code: String },

    #[error("event stream failure on {peer}: {message}")]
    StreamFailure { peer: String, message: String },

    #[error("REQUEST_TIMEOUT:{peer}")]
    Timeout { peer: String },

    #[error("confirmer for {peer} was already armed")]
    AlreadyArmed { peer: String },
}

impl ConfirmError {
    /// Address of the peer whose event stream produced this error.
    pub fn peer(&self) -> &str {
        match self {
            ConfirmError::Invalidated { peer, .. }
            | ConfirmError::StreamFailure { peer, .. }
            | ConfirmError::Timeout { peer }
            | ConfirmError::AlreadyArmed { peer } => peer,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, ValidationError>;
