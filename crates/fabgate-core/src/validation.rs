//! Endorsement validation: classify proposal responses and enforce the
//! all-or-nothing acceptance policy.

use crate::error::{Result, ValidationError};
use crate::response::{PeerResponse, ProposalResponse};

/// Proposal responses split into endorsements and failure messages, in
/// input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedResponses {
    pub valid: Vec<ProposalResponse>,
    /// One diagnostic message per invalid response.
    pub invalid: Vec<String>,
}

impl PartitionedResponses {
    pub fn is_unanimous(&self) -> bool {
        self.invalid.is_empty() && !self.valid.is_empty()
    }
}

/// Classify each response as valid (status 200) or invalid (an error value
/// or any other status).
///
/// Fails with [`ValidationError::EmptyResponseSet`] when there is nothing to
/// classify.
pub fn partition_responses(responses: Vec<PeerResponse>) -> Result<PartitionedResponses> {
    if responses.is_empty() {
        tracing::error!("no results were returned from the request");
        return Err(ValidationError::EmptyResponseSet);
    }

    let mut partitioned = PartitionedResponses::default();
    for response in responses {
        match response {
            Ok(resp) if resp.is_endorsed() => {
                tracing::debug!(peer = %resp.endorser, "valid response from peer");
                partitioned.valid.push(resp);
            }
            Ok(resp) => {
                tracing::warn!(
                    peer = %resp.endorser,
                    status = resp.status,
                    "peer returned non-success proposal status"
                );
                partitioned.invalid.push(format!(
                    "{}: status {}: {}",
                    resp.endorser, resp.status, resp.message
                ));
            }
            Err(err) => {
                tracing::warn!(peer = %err.peer, error = %err.message, "received error response from peer");
                partitioned.invalid.push(err.to_string());
            }
        }
    }

    Ok(partitioned)
}

/// Validate a response set and return the endorsements only if every peer
/// endorsed.
///
/// A single invalid response rejects the whole set with
/// [`ValidationError::IncompleteEndorsement`] carrying every invalid
/// message. Partially endorsed transactions are never forwarded.
pub fn require_unanimous(responses: Vec<PeerResponse>) -> Result<Vec<ProposalResponse>> {
    let PartitionedResponses { valid, invalid } = partition_responses(responses)?;

    if !invalid.is_empty() {
        tracing::error!(
            valid = valid.len(),
            invalid = invalid.len(),
            "did not receive all valid proposal responses"
        );
        return Err(ValidationError::IncompleteEndorsement {
            invalid: invalid.len(),
            messages: invalid,
        });
    }

    Ok(valid)
}
