use voxmesh_core::{IceCandidate, PeerId, SdpType, SessionDescription, SignalPayload, SignalTarget};
use voxmesh_engine::TransportEventKind;

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, TestMesh, config_for, ice, open, settle, wait_until};
use crate::utils::SimulatedTransportFactory;

const HOST_CANDIDATE: &str = "candidate:1 1 udp 2122260223 192.168.1.20 54321 typ host";

#[tokio::test]
async fn test_early_remote_candidates_wait_for_description() {
    init_tracing();

    let mesh = TestMesh::start("alice");
    mesh.channel.establish();
    mesh.channel.deliver_from("server", open(&["bob"], true));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.has_ready_peers(&["bob"])).await);
    let bob = mesh.transports.transport_for("bob").unwrap();

    mesh.channel.deliver_from("bob", ice(HOST_CANDIDATE));
    mesh.channel.deliver_from("bob", ice("   "));
    settle().await;
    assert!(bob.candidates().is_empty());

    mesh.channel.deliver_from(
        "bob",
        SignalPayload::Sdp {
            sdp: SessionDescription::offer("v=0 bob"),
        },
    );
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || bob.candidates().len() == 1).await);
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.channel.sent_with_action("sdp").len() == 1).await);

    let answer = &mesh.channel.sent_with_action("sdp")[0];
    assert_eq!(answer.target, SignalTarget::Peer(PeerId::from("bob")));
    assert!(matches!(&answer.payload, SignalPayload::Sdp { sdp } if sdp.kind == SdpType::Answer));

    mesh.channel.deliver_from("bob", ice("candidate:2 1 udp 1686052607 203.0.113.5 40000 typ srflx"));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || bob.candidates().len() == 2).await);
    assert_eq!(bob.candidates()[0].candidate, HOST_CANDIDATE);
}

#[tokio::test]
async fn test_local_candidates_trickle_immediately() {
    init_tracing();

    let mesh = TestMesh::start("alice");
    mesh.channel.establish();
    mesh.channel.deliver_from("server", open(&["bob"], true));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.has_ready_peers(&["bob"])).await);

    let bob = mesh.transports.transport_for("bob").unwrap();
    bob.emit(TransportEventKind::LocalCandidateReady(IceCandidate::new(HOST_CANDIDATE, "0", 0)));

    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.channel.sent_with_action("ice").len() == 1).await);
    let sent = &mesh.channel.sent_with_action("ice")[0];
    assert_eq!(sent.target, SignalTarget::Peer(PeerId::from("bob")));
    assert!(matches!(&sent.payload, SignalPayload::Ice { ice } if ice.candidate == HOST_CANDIDATE));
}

#[tokio::test]
async fn test_local_candidates_held_without_trickle() {
    init_tracing();

    let mut config = config_for("alice");
    config.trickle_ice = false;
    let mesh = TestMesh::with_config(config, SimulatedTransportFactory::new());
    mesh.channel.establish();
    mesh.channel.deliver_from("server", open(&["bob"], true));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.has_ready_peers(&["bob"])).await);

    let bob = mesh.transports.transport_for("bob").unwrap();
    bob.emit(TransportEventKind::LocalCandidateReady(IceCandidate::new(HOST_CANDIDATE, "0", 0)));
    settle().await;
    assert!(mesh.channel.sent_with_action("ice").is_empty());

    mesh.channel.deliver_from(
        "bob",
        SignalPayload::Sdp {
            sdp: SessionDescription::offer("v=0 bob"),
        },
    );
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.channel.sent_with_action("ice").len() == 1).await);
}
