//! Proptest generators for property-based testing.

use proptest::prelude::*;

use fabgate_core::{PeerResponse, VALID_CODE};

use crate::fixtures::{endorsed, peer_error, rejected};

/// Generate a peer address.
pub fn peer_address() -> impl Strategy<Value = String> {
    "peer[0-9]\\.org[1-9]\\.example\\.com:70[0-9]{2}".prop_map(String::from)
}

/// Generate a response payload.
pub fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=64)
}

/// Generate a status-200 endorsement.
pub fn endorsement() -> impl Strategy<Value = PeerResponse> {
    (peer_address(), payload()).prop_map(|(peer, payload)| endorsed(&peer, &payload))
}

/// Generate an invalid response: a non-200 status or an error value.
pub fn invalid_response() -> impl Strategy<Value = PeerResponse> {
    let status = prop_oneof![100i32..200, 201i32..600];
    prop_oneof![
        (peer_address(), status, "[a-z ]{0,24}")
            .prop_map(|(peer, status, message)| rejected(&peer, status, &message)),
        (peer_address(), "[a-z ]{1,24}").prop_map(|(peer, message)| peer_error(&peer, &message)),
    ]
}

/// Generate a validation code other than the valid sentinel.
pub fn invalid_validation_code() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("MVCC_READ_CONFLICT".to_string()),
        Just("ENDORSEMENT_POLICY_FAILURE".to_string()),
        Just("PHANTOM_READ_CONFLICT".to_string()),
        "[A-Z_]{1,24}".prop_filter("not the valid code", |c| c != VALID_CODE),
    ]
}

/// A response set with at least one invalid response somewhere in it.
///
/// Returns the set and how many of its responses are invalid.
pub fn tainted_response_set(max_len: usize) -> impl Strategy<Value = (Vec<PeerResponse>, usize)> {
    (
        prop::collection::vec(endorsement(), 0..max_len),
        prop::collection::vec(invalid_response(), 1..=max_len.max(1)),
    )
        .prop_flat_map(|(valid, invalid)| {
            let invalid_count = invalid.len();
            let mut all = valid;
            all.extend(invalid);
            Just(all)
                .prop_shuffle()
                .prop_map(move |set| (set, invalid_count))
        })
}

/// A non-empty response set in which every peer endorsed.
pub fn unanimous_response_set(max_len: usize) -> impl Strategy<Value = Vec<PeerResponse>> {
    prop::collection::vec(endorsement(), 1..=max_len.max(1))
}
