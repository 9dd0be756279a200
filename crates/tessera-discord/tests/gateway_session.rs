//! Gateway session lifecycle against an in-memory gateway.

use std::sync::Arc;
use std::time::Duration;

use tessera_core::EventKind;
use tessera_discord::gateway::protocol::{close_code, opcode};
use tessera_discord::gateway::{GatewayError, GatewaySession, SessionHandle};
use tessera_events::{ConnectionState, EventBus, TesseraEvent};
use tessera_test::fixtures::{self, TEST_TOKEN, test_gateway_config};
use tessera_test::{Inbound, MockConnector, MockPeer};
use tokio::task::JoinHandle;

const INTERVAL_MS: u64 = 45_000;

struct Harness {
    connector: Arc<MockConnector>,
    handle: SessionHandle,
    bus: EventBus,
    task: JoinHandle<Result<(), GatewayError>>,
}

fn start(connector: MockConnector) -> Harness {
    tessera_test::setup_test_logging_default();
    let connector = Arc::new(connector);
    let bus = EventBus::new();
    let (session, handle) =
        GatewaySession::new(test_gateway_config(), connector.clone(), bus.clone());
    let task = tokio::spawn(session.run());
    Harness {
        connector,
        handle,
        bus,
        task,
    }
}

async fn wait_for_state(handle: &SessionHandle, state: ConnectionState) {
    let mut rx = handle.watch_state();
    rx.wait_for(|s| *s == state).await.unwrap();
}

/// Accept a connection, identify and complete READY.
async fn identify(harness: &Harness, session_id: &str, seq: u64) -> MockPeer {
    let mut peer = harness.connector.next_peer().await.unwrap();
    peer.hello(INTERVAL_MS);
    let identify = peer.next_sent_op(u64::from(opcode::IDENTIFY)).await.unwrap();
    assert_eq!(identify["d"]["token"], TEST_TOKEN);
    peer.send_json(&fixtures::ready(session_id, seq));
    wait_for_state(&harness.handle, ConnectionState::Ready).await;
    peer
}

#[tokio::test(start_paused = true)]
async fn drop_after_ready_resumes_with_last_sequence() {
    let harness = start(MockConnector::new());
    let peer = identify(&harness, "abc123", 1).await;

    peer.send_json(&fixtures::message_create(7, "m1", "42", "hi"));
    peer.push(Inbound::Eof);

    let mut second = harness.connector.next_peer().await.unwrap();
    assert_eq!(peer.closed_with(), Some(close_code::RESUMABLE));
    assert!(second.url.starts_with("wss://gateway-us-east1-b.discord.gg"));

    second.hello(INTERVAL_MS);
    let resume = second
        .next_sent_op(u64::from(opcode::RESUME))
        .await
        .unwrap();
    assert_eq!(resume["d"]["token"], TEST_TOKEN);
    assert_eq!(resume["d"]["session_id"], "abc123");
    assert_eq!(resume["d"]["seq"], 7);
    assert!(second.drain_sent().iter().all(|f| f["op"] != 2));

    second.send_json(&fixtures::resumed(8));
    wait_for_state(&harness.handle, ConnectionState::Ready).await;

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();
    assert_eq!(second.closed_with(), Some(close_code::NORMAL));
    assert_eq!(harness.handle.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn missed_ack_reconnects_once() {
    let harness = start(MockConnector::without_auto_ack());
    let mut first = identify(&harness, "abc", 1).await;

    // Nothing acknowledges the first beat, so the second tick gives up.
    assert!(
        first
            .next_sent_op(u64::from(opcode::HEARTBEAT))
            .await
            .is_some()
    );

    let second = harness.connector.next_peer().await.unwrap();
    harness.connector.set_auto_ack(true);
    assert_eq!(first.closed_with(), Some(close_code::RESUMABLE));
    assert_eq!(harness.connector.connect_count(), 2);

    second.hello(INTERVAL_MS);
    second.send_json(&fixtures::resumed(2));
    wait_for_state(&harness.handle, ConnectionState::Ready).await;

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(harness.connector.connect_count(), 2);
    assert_eq!(harness.handle.state(), ConnectionState::Ready);

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn server_heartbeat_request_is_answered() {
    let harness = start(MockConnector::new());
    let mut peer = identify(&harness, "abc", 3).await;

    peer.drain_sent();
    peer.send_json(&fixtures::heartbeat_request());
    let beat = peer
        .next_sent_op(u64::from(opcode::HEARTBEAT))
        .await
        .unwrap();
    assert_eq!(beat["d"], 3);

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn dispatches_are_published_as_normalized_events() {
    let harness = start(MockConnector::new());
    let mut messages = harness.bus.subscribe_kinds(&[EventKind::MessageCreated]);
    let peer = identify(&harness, "abc", 1).await;

    peer.send_json(&fixtures::dispatch(
        "SOME_FUTURE_EVENT",
        2,
        serde_json::json!({"x": 1}),
    ));
    peer.send_json(&fixtures::dispatch(
        "MESSAGE_CREATE",
        3,
        serde_json::json!({"broken": true}),
    ));
    peer.send_json(&fixtures::message_create(4, "m1", "42", "hi <@200>"));

    let event = messages.recv().await.unwrap();
    let event = event.as_dispatch().unwrap();
    assert_eq!(event.kind, EventKind::MessageCreated);
    assert_eq!(event.self_id, fixtures::BOT_USER_ID);
    let message = event.message.as_ref().unwrap();
    assert_eq!(message.id, "m1");
    assert_eq!(message.content, r#"hi <at id="200"/>"#);
    assert_eq!(event.channel_id(), Some("42"));
    assert!(messages.try_recv().is_none());

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn authentication_failure_is_fatal_once() {
    let harness = start(MockConnector::new());
    let mut events = harness.bus.subscribe();

    let mut peer = harness.connector.next_peer().await.unwrap();
    peer.hello(INTERVAL_MS);
    peer.next_sent_op(u64::from(opcode::IDENTIFY))
        .await
        .unwrap();
    peer.close(close_code::AUTHENTICATION_FAILED);

    let result = harness.task.await.unwrap();
    assert!(matches!(result, Err(GatewayError::AuthenticationFailed)));
    assert_eq!(harness.connector.connect_count(), 1);
    assert_eq!(harness.handle.state(), ConnectionState::Disconnected);

    let fatal = std::iter::from_fn(|| events.try_recv())
        .filter(|event| matches!(**event, TesseraEvent::Fatal { .. }))
        .count();
    assert_eq!(fatal, 1);
}

#[tokio::test(start_paused = true)]
async fn session_timeout_close_reidentifies() {
    let harness = start(MockConnector::new());
    let peer = identify(&harness, "abc", 1).await;
    peer.send_json(&fixtures::message_create(5, "m1", "42", "hi"));
    peer.close(close_code::SESSION_TIMED_OUT);

    let mut second = harness.connector.next_peer().await.unwrap();
    assert!(second.url.starts_with("wss://gateway.discord.gg"));
    second.hello(INTERVAL_MS);
    let frame = second.next_sent().await.unwrap();
    assert_eq!(frame["op"], 2);
    assert_eq!(peer.closed_with(), Some(close_code::NORMAL));

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn invalid_session_not_resumable_reidentifies() {
    let harness = start(MockConnector::new());
    let peer = identify(&harness, "abc", 4).await;
    peer.send_json(&fixtures::invalid_session(false));

    let mut second = harness.connector.next_peer().await.unwrap();
    second.hello(INTERVAL_MS);
    let frame = second.next_sent().await.unwrap();
    assert_eq!(frame["op"], 2);

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn invalid_session_resumable_resumes() {
    let harness = start(MockConnector::new());
    let peer = identify(&harness, "abc", 4).await;
    peer.send_json(&fixtures::invalid_session(true));

    let mut second = harness.connector.next_peer().await.unwrap();
    second.hello(INTERVAL_MS);
    let frame = second.next_sent().await.unwrap();
    assert_eq!(frame["op"], 6);
    assert_eq!(frame["d"]["seq"], 4);

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn reconnect_request_resumes_immediately() {
    let harness = start(MockConnector::new());
    let peer = identify(&harness, "abc", 2).await;
    peer.send_json(&fixtures::reconnect());

    let mut second = harness.connector.next_peer().await.unwrap();
    assert_eq!(peer.closed_with(), Some(close_code::RESUMABLE));
    second.hello(INTERVAL_MS);
    let frame = second.next_sent().await.unwrap();
    assert_eq!(frame["op"], 6);

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn host_reconnect_requests_coalesce() {
    let harness = start(MockConnector::new());
    let _first = identify(&harness, "abc", 1).await;

    harness.handle.reconnect();
    harness.handle.reconnect();
    harness.handle.reconnect();

    let second = harness.connector.next_peer().await.unwrap();
    second.hello(INTERVAL_MS);
    second.send_json(&fixtures::resumed(2));
    wait_for_state(&harness.handle, ConnectionState::Ready).await;

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(harness.connector.connect_count(), 2);

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn reconnect_during_resume_is_absorbed() {
    let harness = start(MockConnector::new());
    let first = identify(&harness, "abc", 1).await;
    first.push(Inbound::Eof);

    let mut second = harness.connector.next_peer().await.unwrap();
    second.hello(INTERVAL_MS);
    let resume = second.next_sent_op(u64::from(opcode::RESUME)).await.unwrap();
    assert_eq!(resume["d"]["session_id"], "abc");
    assert_eq!(
        *harness.handle.watch_state().borrow(),
        ConnectionState::Resuming
    );

    harness.handle.reconnect();
    second.send_json(&fixtures::resumed(2));
    wait_for_state(&harness.handle, ConnectionState::Ready).await;

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(harness.connector.connect_count(), 2);

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn transport_failures_back_off_and_retry() {
    let connector = MockConnector::new();
    connector.fail_next("connection refused");
    connector.fail_next("connection refused");
    let harness = start(connector);

    let _peer = identify(&harness, "abc", 1).await;
    assert_eq!(harness.connector.connect_count(), 3);

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn status_events_follow_the_state_machine() {
    let harness = start(MockConnector::new());
    let mut events = harness.bus.subscribe();
    let _peer = identify(&harness, "abc", 1).await;

    harness.handle.shutdown();
    harness.task.await.unwrap().unwrap();

    let mut states = Vec::new();
    while let Some(event) = events.try_recv() {
        if let TesseraEvent::Status { state, .. } = &*event {
            states.push(*state);
        }
    }
    assert_eq!(
        states,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Identifying,
            ConnectionState::Ready,
            ConnectionState::Disconnected,
        ]
    );
}
