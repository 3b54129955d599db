//! Error types for the gateway.

use fabgate_channel::ChannelError;
use fabgate_core::ValidationError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::package::PackageError;

/// Errors raised before a state-changing side effect is in flight.
///
/// Failures discovered after the proposal has been endorsed (orderer
/// rejection, commit confirmation failures) are not errors: they are
/// reported as a failed [`ApiResponse`](fabgate_core::ApiResponse).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Endorsement or input validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The channel could not send the proposal or query.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// A transaction object was used a second time.
    #[error("transaction has already been invoked")]
    AlreadyInvoked,

    /// The network was disconnected.
    #[error("unable to return contract from disconnected network")]
    Disconnected,

    /// Install was called without an upload type.
    #[error("upload type is required for chaincode install")]
    MissingUploadType,

    /// Instantiate or upgrade was called without a chaincode spec.
    #[error("chaincode spec is required for {0}")]
    MissingChaincodeSpec(String),

    /// The operation does not apply here.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Local chaincode packaging failed.
    #[error("packaging error: {0}")]
    Packaging(#[from] PackageError),

    /// Configuration was rejected.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
