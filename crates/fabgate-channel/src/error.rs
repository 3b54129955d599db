//! Error types reported by channel collaborators.

use thiserror::Error;

/// Errors raised by a [`Channel`](crate::Channel) or
/// [`EventStream`](crate::EventStream) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Transport-level failure talking to a peer or orderer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote side refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The event stream went away before delivering.
    #[error("event stream closed: {0}")]
    StreamClosed(String),

    /// Operation requires a connected stream.
    #[error("not connected: {0}")]
    NotConnected(String),

    /// The collaborator gave up waiting.
    #[error("timeout: {0}")]
    Timeout(String),
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
