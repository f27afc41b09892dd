use voxmesh_core::{SessionDescription, SignalPayload};

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, TestMesh, ice, open, settle, wait_until};

#[tokio::test]
async fn test_messages_for_unknown_peer_are_dropped() {
    init_tracing();

    let mesh = TestMesh::start("alice");
    mesh.channel.establish();

    mesh.channel
        .deliver_from("ghost", ice("candidate:1 1 udp 2122260223 10.0.0.9 50000 typ host"));
    mesh.channel.deliver_from(
        "ghost",
        SignalPayload::Sdp {
            sdp: SessionDescription::offer("v=0"),
        },
    );
    mesh.channel.deliver_from("ghost", SignalPayload::Close);
    settle().await;
    assert!(mesh.view().is_empty());

    // Still responsive.
    mesh.channel.deliver_from("server", open(&["bob"], true));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.has_ready_peers(&["bob"])).await);
    assert!(mesh.channel.sent().is_empty());
}

#[tokio::test]
async fn test_ice_after_close_is_dropped() {
    init_tracing();

    let mesh = TestMesh::start("alice");
    mesh.channel.establish();

    mesh.channel.deliver_from("server", open(&["xavier"], true));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.has_ready_peers(&["xavier"])).await);
    let xavier = mesh.transports.transport_for("xavier").unwrap();

    mesh.channel.deliver_from("xavier", SignalPayload::Close);
    mesh.channel
        .deliver_from("xavier", ice("candidate:1 1 udp 2122260223 10.0.0.7 50000 typ host"));

    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.view().is_empty()).await);
    settle().await;
    assert_eq!(xavier.close_calls(), 1);
    assert!(xavier.candidates().is_empty());
}
