use std::time::Duration;
use voxmesh_core::{PeerId, SignalPayload, SignalTarget};
use voxmesh_engine::{DisconnectReason, SignalingChannel, SignalingError, SignalingEvent, SignalingOutput};

use super::{RELAY_TOKEN, next_event, ws_channel};
use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, WsRelay, ice, wait_until};

#[tokio::test]
async fn test_ws_channel_announces_and_relays_envelopes() {
    init_tracing();
    let relay = WsRelay::start(RELAY_TOKEN).await;

    let (alice, mut alice_events) = ws_channel(&relay, "alice", RELAY_TOKEN);
    let (bob, mut bob_events) = ws_channel(&relay, "bob", RELAY_TOKEN);
    let (carol, mut carol_events) = ws_channel(&relay, "carol", RELAY_TOKEN);

    for channel in [&alice, &bob, &carol] {
        channel.connect().await.expect("Connect failed");
    }
    for events in [&mut alice_events, &mut bob_events, &mut carol_events] {
        assert!(matches!(next_event(events).await, SignalingEvent::Connected(_)));
    }
    assert!(
        wait_until(SIGNAL_TIMEOUT_MS, || {
            ["alice", "bob", "carol"].iter().all(|id| relay.is_registered(id))
        })
        .await
    );
    assert!(alice.is_connected());

    // The relay echoes everything to everyone; the channel filters.
    bob.send_to(&PeerId::from("alice"), ice("candidate:1 1 udp 1 10.1.1.1 9 typ host"))
        .await
        .unwrap();
    match next_event(&mut alice_events).await {
        SignalingEvent::Message(envelope) => {
            assert_eq!(envelope.from, PeerId::from("bob"));
            assert_eq!(envelope.target, SignalTarget::Peer(PeerId::from("alice")));
            assert_eq!(envelope.payload.action(), "ice");
        }
        other => panic!("Expected message, got {:?}", other),
    }

    alice.send(SignalPayload::Close).await.unwrap();
    match next_event(&mut carol_events).await {
        SignalingEvent::Message(envelope) => {
            assert_eq!(envelope.from, PeerId::from("alice"));
            assert_eq!(envelope.payload, SignalPayload::Close);
        }
        other => panic!("Expected message, got {:?}", other),
    }
    match next_event(&mut bob_events).await {
        SignalingEvent::Message(envelope) => assert_eq!(envelope.from, PeerId::from("alice")),
        other => panic!("Expected message, got {:?}", other),
    }

    // Nothing else: no self-echo for alice or bob, nothing misaddressed for carol.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(alice_events.try_recv().is_err());
    assert!(bob_events.try_recv().is_err());
    assert!(carol_events.try_recv().is_err());
}

#[tokio::test]
async fn test_ws_channel_rejects_bad_token() {
    init_tracing();
    let relay = WsRelay::start(RELAY_TOKEN).await;

    let (alice, _events) = ws_channel(&relay, "alice", "wrong-token");
    let result = alice.connect().await;

    assert!(matches!(result, Err(SignalingError::Connect(_))));
    assert!(!alice.is_connected());
    assert_eq!(relay.connections(), 0);
}

#[tokio::test]
async fn test_ws_channel_duplicate_identity_is_not_retried() {
    init_tracing();
    let relay = WsRelay::start(RELAY_TOKEN).await;

    let (first, mut first_events) = ws_channel(&relay, "dup", RELAY_TOKEN);
    first.connect().await.unwrap();
    assert!(matches!(next_event(&mut first_events).await, SignalingEvent::Connected(_)));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || relay.is_registered("dup")).await);

    let (second, mut second_events) = ws_channel(&relay, "dup", RELAY_TOKEN);
    second.connect().await.unwrap();

    let epoch = match next_event(&mut second_events).await {
        SignalingEvent::Connected(epoch) => epoch,
        other => panic!("Expected connected, got {:?}", other),
    };
    assert!(matches!(
        next_event(&mut second_events).await,
        SignalingEvent::Disconnected(DisconnectReason::DuplicateIdentity)
    ));
    assert!(epoch.is_cancelled());
    assert!(!second.is_connected());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(relay.connections(), 2, "no reconnect after rejection");
    assert!(second_events.try_recv().is_err());
    assert!(first.is_connected());
}

#[tokio::test]
async fn test_ws_channel_reconnects_after_loss() {
    init_tracing();
    let relay = WsRelay::start(RELAY_TOKEN).await;

    let (alice, mut events) = ws_channel(&relay, "alice", RELAY_TOKEN);
    alice.connect().await.unwrap();
    let first = match next_event(&mut events).await {
        SignalingEvent::Connected(epoch) => epoch,
        other => panic!("Expected connected, got {:?}", other),
    };
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || relay.is_registered("alice")).await);

    relay.kick("alice");

    assert!(matches!(
        next_event(&mut events).await,
        SignalingEvent::Disconnected(DisconnectReason::Lost)
    ));
    assert!(first.is_cancelled());

    let second = match next_event(&mut events).await {
        SignalingEvent::Connected(epoch) => epoch,
        other => panic!("Expected reconnect, got {:?}", other),
    };
    assert!(second.id() > first.id());
    assert!(!second.is_cancelled());
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || relay.ready_count("alice") == 2).await);

    alice.disconnect().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SignalingEvent::Disconnected(DisconnectReason::Requested)
    ));
    assert!(second.is_cancelled());
    assert!(!alice.is_connected());

    // Sends while down are silently dropped.
    alice.send(SignalPayload::Close).await.unwrap();
}
