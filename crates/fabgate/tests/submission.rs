//! End-to-end submission scenarios against a scripted multi-organisation
//! network.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fabgate::channel::{Channel, ChannelError, EventStream, OrdererResponse};
use fabgate::core::{ApiResponse, ValidationError, VALID_CODE};
use fabgate::{Contract, GatewayConfig, GatewayError, Network};
use fabgate_testkit::fixtures::{endorsed, event_address, peer_error, NetworkFixture};
use tokio::time::Instant;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn contract(fixture: &NetworkFixture) -> Contract {
    contract_with(fixture, GatewayConfig::default())
}

fn contract_with(fixture: &NetworkFixture, config: GatewayConfig) -> Contract {
    let network = Network::new(
        Arc::clone(&fixture.channel) as Arc<dyn Channel>,
        b"appUser".to_vec(),
        config,
    )
    .unwrap();
    network.contract("fabcar").unwrap()
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn two_orgs_commit_after_orderer_ack() {
    init_tracing();
    let fixture = NetworkFixture::new(2);
    fixture.endorse_all(b"car created", Duration::ZERO);
    fixture.commit_after(
        VALID_CODE,
        &[Duration::from_millis(50), Duration::from_millis(80)],
    );
    fixture
        .channel
        .script_orderer(OrdererResponse::success(), Duration::from_millis(60));

    let mut tx = contract(&fixture).create_transaction("createCar").unwrap();
    let tx_id = tx.transaction_id().value().to_string();

    let start = Instant::now();
    let response = tx
        .submit(&args(&["CAR12", "Honda", "Accord", "Black", "Tom"]))
        .await
        .unwrap();

    assert_eq!(response, ApiResponse::success_text(tx_id.clone()));
    assert!(start.elapsed() >= Duration::from_millis(80));

    let ordered = fixture.channel.orderer_requests();
    assert_eq!(ordered.len(), 1);
    assert_eq!(ordered[0].proposal.tx_id, tx_id);
    assert_eq!(ordered[0].responses.len(), 2);
    for stream in fixture.streams() {
        assert_eq!(stream.registered_tx_ids(), vec![tx_id.clone()]);
        assert_eq!(stream.connect_count(), 1);
        assert!(!stream.is_connected());
    }
}

#[tokio::test(start_paused = true)]
async fn late_orderer_ack_holds_the_result() {
    let fixture = NetworkFixture::new(2);
    fixture.commit_after(
        VALID_CODE,
        &[Duration::from_millis(10), Duration::from_millis(20)],
    );
    fixture
        .channel
        .script_orderer(OrdererResponse::success(), Duration::from_millis(500));

    let mut tx = contract(&fixture).create_transaction("createCar").unwrap();
    let tx_id = tx.transaction_id().value().to_string();

    let start = Instant::now();
    let response = tx.submit(&args(&["CAR12"])).await.unwrap();

    assert_eq!(response, ApiResponse::success_text(tx_id));
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert!(start.elapsed() < Duration::from_millis(600));
    for stream in fixture.streams() {
        assert!(!stream.is_connected());
    }
}

#[tokio::test(start_paused = true)]
async fn partial_endorsement_has_no_side_effects() {
    init_tracing();
    let fixture = NetworkFixture::new(2);
    fixture.commit_after(VALID_CODE, &[Duration::ZERO, Duration::ZERO]);
    fixture.channel.script_proposal(
        vec![
            endorsed("grpcs://peer0.org1.example.com:7051", b"ok"),
            peer_error("grpcs://peer0.org2.example.com:7051", "chaincode panicked"),
        ],
        Duration::from_millis(5),
    );

    let err = contract(&fixture)
        .submit_transaction("createCar", &args(&["CAR1"]))
        .await
        .unwrap_err();

    match err {
        GatewayError::Validation(ValidationError::IncompleteEndorsement { invalid, messages }) => {
            assert_eq!(invalid, 1);
            assert!(messages[0].contains("chaincode panicked"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(fixture.channel.orderer_requests().is_empty());
    assert_eq!(fixture.channel.stream_enumerations(), 0);
    for stream in fixture.streams() {
        assert!(stream.registered_tx_ids().is_empty());
        assert_eq!(stream.connect_count(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn one_invalid_commit_fails_the_submission() {
    init_tracing();
    let fixture = NetworkFixture::new(3);
    fixture.commit_after(
        VALID_CODE,
        &[
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(30),
        ],
    );
    fixture
        .stream(2)
        .script_commit("MVCC_READ_CONFLICT", 7, Duration::from_millis(20));

    let response = contract(&fixture)
        .submit_transaction("transferCar", &args(&["CAR1", "Dave"]))
        .await
        .unwrap();

    let message = response.failure_message().unwrap();
    assert!(message.contains(&event_address(2)));
    assert!(message.contains("MVCC_READ_CONFLICT"));
    assert!(!message.contains(&event_address(1)));
    assert_eq!(fixture.channel.orderer_requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stream_error_fails_the_submission() {
    init_tracing();
    let fixture = NetworkFixture::new(2);
    fixture.commit_after(VALID_CODE, &[Duration::from_millis(10), Duration::ZERO]);
    fixture
        .stream(2)
        .script_failure("14 UNAVAILABLE: Connection dropped", Duration::from_millis(15));

    let response = contract(&fixture)
        .submit_transaction("createCar", &[])
        .await
        .unwrap();

    let message = response.failure_message().unwrap();
    assert!(message.contains(&event_address(2)));
    assert!(message.contains("Connection dropped"));
    assert!(fixture.streams().iter().all(|s| !s.is_connected()));
}

#[tokio::test(start_paused = true)]
async fn silent_stream_times_out_at_the_deadline_and_not_before() {
    init_tracing();
    let fixture = NetworkFixture::new(2);
    fixture.commit_after(VALID_CODE, &[Duration::from_millis(30)]);
    // Org 2 never reports the commit.

    let contract = contract(&fixture);
    let start = Instant::now();
    let handle = tokio::spawn(async move { contract.submit_transaction("createCar", &[]).await });

    tokio::time::sleep(Duration::from_millis(9_999)).await;
    assert!(!handle.is_finished());
    assert!(fixture.stream(2).is_connected());

    let response = handle.await.unwrap().unwrap();
    assert!(start.elapsed() >= Duration::from_millis(10_000));
    assert_eq!(
        response.failure_message(),
        Some(format!("REQUEST_TIMEOUT:{}", event_address(2)).as_str())
    );
    assert!(!fixture.stream(2).is_connected());
    assert_eq!(fixture.stream(2).pending_registrations(), 0);
}

#[tokio::test(start_paused = true)]
async fn configured_event_timeout_is_honoured() {
    let fixture = NetworkFixture::new(1);
    let config = GatewayConfig::default().with_event_timeout(Duration::from_millis(1_500));

    let start = Instant::now();
    let response = contract_with(&fixture, config)
        .submit_transaction("createCar", &[])
        .await
        .unwrap();
    assert!(!response.is_success());
    assert!(start.elapsed() >= Duration::from_millis(1_500));
    assert!(start.elapsed() < Duration::from_millis(2_000));
}

#[tokio::test(start_paused = true)]
async fn orderer_rejection_fails_even_when_peers_commit() {
    init_tracing();
    let fixture = NetworkFixture::new(2);
    fixture.commit_after(VALID_CODE, &[Duration::ZERO, Duration::ZERO]);
    fixture.channel.script_orderer(
        OrdererResponse::with_status("BAD_REQUEST"),
        Duration::from_millis(5),
    );

    let response = contract(&fixture)
        .submit_transaction("createCar", &[])
        .await
        .unwrap();
    assert_eq!(
        response,
        ApiResponse::failure("Failed to order the transaction. Error code: BAD_REQUEST")
    );
}

#[tokio::test(start_paused = true)]
async fn orderer_transport_error_is_reported_not_raised() {
    let fixture = NetworkFixture::new(1);
    fixture.commit_after(VALID_CODE, &[Duration::ZERO]);
    fixture.channel.script_orderer_error(
        ChannelError::Transport("orderer.example.com:7050 unreachable".into()),
        Duration::ZERO,
    );

    let response = contract(&fixture)
        .submit_transaction("createCar", &[])
        .await
        .unwrap();
    assert!(response
        .failure_message()
        .unwrap()
        .contains("orderer.example.com:7050 unreachable"));
}

#[tokio::test(start_paused = true)]
async fn failure_response_serializes_with_status_and_payload() {
    let fixture = NetworkFixture::new(1);
    fixture.commit_after("ENDORSEMENT_POLICY_FAILURE", &[Duration::ZERO]);

    let response = contract(&fixture)
        .submit_transaction("createCar", &[])
        .await
        .unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "FAILURE");
    assert!(json["payload"]
        .as_str()
        .unwrap()
        .contains("ENDORSEMENT_POLICY_FAILURE"));
}

#[tokio::test(start_paused = true)]
async fn custom_event_listener_fires_after_commit() {
    init_tracing();
    let fixture = NetworkFixture::new(1);
    fixture.commit_after(VALID_CODE, &[Duration::from_millis(20)]);
    fixture.stream(1).script_chaincode_event(
        "carCreated",
        b"{\"key\":\"CAR12\"}",
        VALID_CODE,
        Duration::from_millis(5),
    );

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    let mut tx = contract(&fixture).create_transaction("createCar").unwrap();
    tx.add_event_listener("carCreated", move |event| {
        let event = event.expect("listener event");
        let payload = event.payload_text();
        sink.lock().unwrap().push((event.event_name, payload));
    })
    .unwrap();

    let response = tx.submit(&args(&["CAR12"])).await.unwrap();
    assert!(response.is_success());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(
        *received.lock().unwrap(),
        vec![("carCreated".to_string(), "{\"key\":\"CAR12\"}".to_string())]
    );
    assert_eq!(
        fixture.stream(1).registered_event_names(),
        vec!["carCreated".to_string()]
    );
    assert!(!fixture.stream(1).is_connected());
}

#[tokio::test(start_paused = true)]
async fn listener_follows_configured_event_timeout() {
    let fixture = NetworkFixture::new(1);
    fixture.commit_after(VALID_CODE, &[Duration::from_millis(20)]);
    let config = GatewayConfig::default().with_event_timeout(Duration::from_secs(1));

    let timed_out = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&timed_out);

    let mut tx = contract_with(&fixture, config)
        .create_transaction("createCar")
        .unwrap();
    tx.add_event_listener("neverEmitted", move |event| {
        sink.lock().unwrap().push(event.is_err());
    })
    .unwrap();

    assert!(tx.submit(&[]).await.unwrap().is_success());
    assert!(fixture.stream(1).is_connected());

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(*timed_out.lock().unwrap(), vec![true]);
    assert!(!fixture.stream(1).is_connected());
}

#[tokio::test(start_paused = true)]
async fn abandoned_submission_disconnects_streams() {
    let fixture = NetworkFixture::new(2);
    // Neither org reports in time.

    let contract = contract(&fixture);
    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        contract.submit_transaction("createCar", &[]),
    )
    .await;

    assert!(abandoned.is_err());
    assert_eq!(fixture.channel.orderer_requests().len(), 1);
    for stream in fixture.streams() {
        assert_eq!(stream.connect_count(), 1);
        assert!(!stream.is_connected());
    }
}

#[tokio::test(start_paused = true)]
async fn transaction_is_single_shot() {
    let fixture = NetworkFixture::new(1);
    fixture.commit_after(VALID_CODE, &[Duration::ZERO]);

    let contract = contract(&fixture);
    let mut tx = contract.create_transaction("createCar").unwrap();
    assert!(tx.submit(&[]).await.unwrap().is_success());
    assert!(matches!(tx.submit(&[]).await, Err(GatewayError::AlreadyInvoked)));
    assert!(matches!(tx.evaluate(&[]).await, Err(GatewayError::AlreadyInvoked)));
    assert_eq!(fixture.channel.proposals().len(), 1);
}

#[tokio::test]
async fn evaluate_decodes_results_in_order() {
    let fixture = NetworkFixture::new(2);
    fixture.channel.script_query(Ok(Some(vec![
        bytes::Bytes::from_static(b"{\"owner\":\"Tom\"}"),
        bytes::Bytes::from_static(b"{\"owner\":\"Brad\"}"),
    ])));

    let response = contract(&fixture)
        .evaluate_transaction("queryCar", &args(&["CAR4"]))
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_string(&response).unwrap(),
        r#"{"status":"SUCCESS","payload":["{\"owner\":\"Tom\"}","{\"owner\":\"Brad\"}"]}"#
    );
    assert!(fixture.channel.orderer_requests().is_empty());
    assert_eq!(fixture.channel.queries()[0].targets.len(), 2);
}

#[tokio::test]
async fn evaluate_without_results_is_failure_with_null_payload() {
    let fixture = NetworkFixture::new(1);
    fixture.channel.script_query(Ok(None));

    let response = contract(&fixture)
        .evaluate_transaction("queryCar", &args(&["CAR404"]))
        .await
        .unwrap();
    assert_eq!(response, ApiResponse::Failure(None));
    assert_eq!(
        serde_json::to_string(&response).unwrap(),
        r#"{"status":"FAILURE","payload":null}"#
    );
}
