//! Read-only chaincode queries.
//!
//! A query is a proposal that is never ordered: no endorsement policy, no
//! event confirmation. An empty result is an ordinary outcome, not an error.

use bytes::Bytes;
use fabgate_channel::{Channel, PeerTarget, QueryRequest};
use fabgate_core::{ApiResponse, Payload, TransactionId};

use crate::error::Result;

/// Evaluates queries against a fixed set of peers.
#[derive(Debug, Clone, Default)]
pub struct QueryExecutor {
    targets: Vec<PeerTarget>,
}

impl QueryExecutor {
    pub fn new(targets: Vec<PeerTarget>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[PeerTarget] {
        &self.targets
    }

    /// Evaluate `function` on `chaincode_id`.
    ///
    /// Returns the payloads decoded as text, in response order. A channel
    /// that answers with nothing yields `Failure(None)`; a channel error is
    /// propagated.
    pub async fn query_chaincode(
        &self,
        chaincode_id: &str,
        channel: &dyn Channel,
        tx_id: &TransactionId,
        function: &str,
        args: &[String],
    ) -> Result<ApiResponse> {
        let request = QueryRequest {
            chaincode_id: chaincode_id.to_string(),
            function: function.to_string(),
            args: args.to_vec(),
            tx_id: tx_id.clone(),
            targets: self.targets.clone(),
        };

        let payloads = match channel.query_by_chaincode(&request).await? {
            Some(payloads) if !payloads.is_empty() => payloads,
            _ => {
                tracing::debug!(chaincode_id, function, "query returned no results");
                return Ok(ApiResponse::Failure(None));
            }
        };

        tracing::debug!(
            chaincode_id,
            function,
            results = payloads.len(),
            "query has completed"
        );
        Ok(ApiResponse::Success(Payload::Values(decode_all(&payloads))))
    }
}

fn decode_all(payloads: &[Bytes]) -> Vec<String> {
    payloads
        .iter()
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .collect()
}
