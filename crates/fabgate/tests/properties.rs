//! Property tests for the endorsement gate and the commit verdict.

use std::sync::Arc;
use std::time::Duration;

use fabgate::channel::Channel;
use fabgate::core::{TransactionId, TxnOptions, VALID_CODE};
use fabgate::{GatewayConfig, GatewayError, SubmissionCoordinator};
use fabgate_testkit::fixtures::NetworkFixture;
use fabgate_testkit::generators::{invalid_validation_code, tainted_response_set};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

fn coordinator() -> SubmissionCoordinator {
    SubmissionCoordinator::new(Arc::new(GatewayConfig::default()), TxnOptions::new())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn tainted_endorsements_never_reach_orderer_or_streams(
        (responses, invalid) in tainted_response_set(5),
        orgs in 1usize..4,
    ) {
        let fixture = NetworkFixture::new(orgs);
        fixture.channel.script_proposal(responses, Duration::ZERO);

        let result = runtime().block_on(coordinator().submit(
            fixture.channel.as_ref(),
            &TransactionId::from_value("tx-prop"),
            "createCar",
            "fabcar",
            &[],
        ));

        match result {
            Err(GatewayError::Validation(fabgate::core::ValidationError::IncompleteEndorsement {
                invalid: reported,
                ..
            })) => prop_assert_eq!(reported, invalid),
            other => prop_assert!(false, "unexpected result: {:?}", other),
        }
        prop_assert!(fixture.channel.orderer_requests().is_empty());
        prop_assert_eq!(fixture.channel.stream_enumerations(), 0);
        for stream in fixture.streams() {
            prop_assert!(stream.registered_tx_ids().is_empty());
        }
    }

    #[test]
    fn any_invalid_commit_fails_submission(
        orgs in 1usize..5,
        bad_org in 0usize..5,
        code in invalid_validation_code(),
        delays in prop::collection::vec(0u64..200, 5),
    ) {
        let bad_org = bad_org % orgs + 1;
        let fixture = NetworkFixture::new(orgs);
        let delays: Vec<_> = delays.into_iter().map(Duration::from_millis).collect();
        fixture.commit_after(VALID_CODE, &delays);
        fixture.stream(bad_org).script_commit(&code, 1, delays[bad_org - 1]);

        let channel: &dyn Channel = fixture.channel.as_ref();
        let outcome = runtime()
            .block_on(coordinator().submit_detailed(
                channel,
                &TransactionId::from_value("tx-prop"),
                "createCar",
                "fabcar",
                &[],
            ))
            .unwrap();

        prop_assert!(!outcome.is_committed());
        prop_assert_eq!(outcome.confirmations.len(), orgs);
        prop_assert_eq!(outcome.faults.len(), 1);
        let message = outcome.into_response().failure_message().unwrap().to_string();
        prop_assert!(message.contains(&fabgate_testkit::fixtures::event_address(bad_org)));
        prop_assert!(message.contains(&code));
    }
}
