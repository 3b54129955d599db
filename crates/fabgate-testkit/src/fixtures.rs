//! Test fixtures and helpers.
//!
//! Common setup code for protocol and integration tests.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use fabgate_channel::{MemoryChannel, MemoryEventStream};
use fabgate_core::{PeerError, PeerResponse, ProposalResponse, STATUS_OK};
use flate2::write::GzEncoder;
use flate2::Compression;

/// Channel name used by every fixture.
pub const CHANNEL_NAME: &str = "mychannel";

/// A status-200 endorsement from `peer`.
pub fn endorsed(peer: &str, payload: &[u8]) -> PeerResponse {
    Ok(ProposalResponse::new(
        peer,
        STATUS_OK,
        Bytes::copy_from_slice(payload),
    ))
}

/// A well-formed response with a non-200 status.
pub fn rejected(peer: &str, status: i32, message: &str) -> PeerResponse {
    Ok(ProposalResponse::new(peer, status, Bytes::new()).with_message(message))
}

/// An error in place of a response.
pub fn peer_error(peer: &str, message: &str) -> PeerResponse {
    Err(PeerError::new(peer, message))
}

/// A scripted channel with one peer and one event stream per organisation.
pub struct NetworkFixture {
    pub channel: Arc<MemoryChannel>,
}

impl NetworkFixture {
    /// `orgs` organisations, named `org1..=orgN`. Streams are silent until
    /// scripted.
    pub fn new(orgs: usize) -> Self {
        let mut channel = MemoryChannel::new(CHANNEL_NAME);
        for org in 1..=orgs {
            channel = channel
                .with_peer(&peer_name(org), &peer_url(org))
                .with_event_stream(MemoryEventStream::new(event_address(org)));
        }
        Self {
            channel: Arc::new(channel),
        }
    }

    /// Event stream of organisation `org` (1-based).
    pub fn stream(&self, org: usize) -> &Arc<MemoryEventStream> {
        &self.channel.event_streams()[org - 1]
    }

    pub fn streams(&self) -> &[Arc<MemoryEventStream>] {
        self.channel.event_streams()
    }

    /// Script every stream to deliver `code`, stream `i` after `delays[i]`.
    pub fn commit_after(&self, code: &str, delays: &[Duration]) {
        for (i, (stream, delay)) in self.streams().iter().zip(delays).enumerate() {
            stream.script_commit(code, i as u64 + 1, *delay);
        }
    }

    /// Every peer endorses with the same payload.
    pub fn endorse_all(&self, payload: &[u8], delay: Duration) {
        let responses = (1..=self.streams().len())
            .map(|org| endorsed(&peer_url(org), payload))
            .collect();
        self.channel.script_proposal(responses, delay);
    }
}

pub fn peer_name(org: usize) -> String {
    format!("peer0.org{org}.example.com")
}

pub fn peer_url(org: usize) -> String {
    format!("grpcs://peer0.org{org}.example.com:7051")
}

/// Address an organisation's event stream reports in diagnostics.
pub fn event_address(org: usize) -> String {
    format!("peer0.org{org}.example.com:7053")
}

/// Gzip tarball with the given `(path, contents)` entries, as uploaded for
/// install.
pub fn source_archive(entries: &[(&str, &str)]) -> Bytes {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .expect("append to in-memory archive");
    }
    let encoder = builder.into_inner().expect("finish archive");
    Bytes::from(encoder.finish().expect("finish gzip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabgate_channel::{Channel, EventStream};
    use fabgate_core::require_unanimous;

    #[test]
    fn test_response_helpers() {
        assert!(require_unanimous(vec![endorsed("p0", b"x"), endorsed("p1", b"x")]).is_ok());
        assert!(require_unanimous(vec![endorsed("p0", b"x"), rejected("p1", 500, "boom")]).is_err());
        assert!(require_unanimous(vec![peer_error("p0", "down")]).is_err());
    }

    #[test]
    fn test_network_fixture_layout() {
        let fixture = NetworkFixture::new(2);
        assert_eq!(fixture.streams().len(), 2);
        assert_eq!(fixture.channel.peers().len(), 2);
        assert_eq!(fixture.stream(2).peer_address(), "peer0.org2.example.com:7053");
    }

    #[test]
    fn test_source_archive_is_gzip() {
        let archive = source_archive(&[("cc/main.go", "package main")]);
        assert_eq!(&archive[..2], &[0x1f, 0x8b]);
    }
}
