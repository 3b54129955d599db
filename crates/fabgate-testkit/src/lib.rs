//! # fabgate testkit
//!
//! Testing utilities for fabgate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: response builders and a scripted multi-organisation network
//! - **Generators**: Proptest strategies for endorsement response sets
//!
//! ## Test Fixtures
//!
//! ```rust
//! use std::time::Duration;
//! use fabgate_testkit::fixtures::NetworkFixture;
//!
//! let fixture = NetworkFixture::new(2);
//! fixture.commit_after("VALID", &[Duration::from_millis(50), Duration::from_millis(80)]);
//! assert_eq!(fixture.streams().len(), 2);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use fabgate_testkit::generators::tainted_response_set;
//!
//! proptest! {
//!     #[test]
//!     fn never_unanimous((set, _) in tainted_response_set(5)) {
//!         prop_assert!(fabgate_core::require_unanimous(set).is_err());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{endorsed, peer_error, rejected, source_archive, NetworkFixture};
pub use generators::{tainted_response_set, unanimous_response_set};
