//! Proposal responses from endorsing peers and the caller-facing outcome.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Status code a peer returns for a successful endorsement.
pub const STATUS_OK: i32 = 200;

/// One peer's endorsement of a proposal.
///
/// Never mutated after receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalResponse {
    /// Address or name of the endorsing peer.
    pub endorser: String,
    pub status: i32,
    pub message: String,
    pub payload: Bytes,
}

impl ProposalResponse {
    pub fn new(endorser: impl Into<String>, status: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            endorser: endorser.into(),
            status,
            message: String::new(),
            payload: payload.into(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Whether the peer endorsed the proposal.
    pub fn is_endorsed(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// An error a peer (or the client on its behalf) returned in place of a
/// proposal response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{peer}: {message}")]
pub struct PeerError {
    pub peer: String,
    pub message: String,
}

impl PeerError {
    pub fn new(peer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            message: message.into(),
        }
    }
}

/// A proposal response or the error that replaced it.
pub type PeerResponse = std::result::Result<ProposalResponse, PeerError>;

/// Discriminant of an [`ApiResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Failure,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => f.write_str("SUCCESS"),
            Status::Failure => f.write_str("FAILURE"),
        }
    }
}

/// Payload of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Committed transaction id, or a lifecycle confirmation message.
    Text(String),
    /// Decoded query results, in response order.
    Values(Vec<String>),
}

/// Outcome of a submit, evaluate or lifecycle call.
///
/// Status and payload shape are tied together by the enum: error text can
/// only ever travel with `Failure`.
///
/// Serializes as `{"status": "SUCCESS" | "FAILURE", "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiResponse {
    Success(Payload),
    /// Diagnostic text, or `None` when a query found nothing.
    Failure(Option<String>),
}

impl ApiResponse {
    pub fn success_text(text: impl Into<String>) -> Self {
        ApiResponse::Success(Payload::Text(text.into()))
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ApiResponse::Failure(Some(message.into()))
    }

    pub fn status(&self) -> Status {
        match self {
            ApiResponse::Success(_) => Status::Success,
            ApiResponse::Failure(_) => Status::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    /// The text payload of a success, e.g. the committed transaction id.
    pub fn text(&self) -> Option<&str> {
        match self {
            ApiResponse::Success(Payload::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn values(&self) -> Option<&[String]> {
        match self {
            ApiResponse::Success(Payload::Values(v)) => Some(v),
            _ => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            ApiResponse::Failure(msg) => msg.as_deref(),
            _ => None,
        }
    }
}
