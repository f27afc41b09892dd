use voxmesh_engine::DisconnectReason;

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, SimulatedTransportFactory, TestMesh, open, settle, wait_until};

#[tokio::test]
async fn test_disconnect_cancels_setup_in_progress() {
    init_tracing();

    let mesh = TestMesh::with_factory("alice", SimulatedTransportFactory::gated());
    mesh.channel.establish();

    mesh.channel.deliver_from("server", open(&["bob"], false));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.transports.requested() == 1).await);
    assert!(mesh.view().contains(&"bob".into()), "peer listed while initializing");

    // Setup is parked inside the factory; the epoch ends underneath it.
    mesh.channel.drop_connection(DisconnectReason::Lost);
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.view().is_empty()).await);
    assert_eq!(mesh.transports.created(), 0);

    // The coordinator is still responsive and the next epoch works.
    mesh.transports.release(10);
    mesh.channel.establish();
    mesh.channel.deliver_from("server", open(&["bob"], false));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.has_ready_peers(&["bob"])).await);
    assert_eq!(mesh.transports.created(), 1);
}

#[tokio::test]
async fn test_failed_setup_releases_transport() {
    init_tracing();

    let mesh = TestMesh::with_factory("alice", SimulatedTransportFactory::failing_data_channels());
    mesh.channel.establish();

    mesh.channel.deliver_from("server", open(&["bob"], false));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.transports.created() == 1).await);
    settle().await;

    assert!(mesh.view().is_empty());
    let bob = mesh.transports.transport_for("bob").unwrap();
    assert_eq!(bob.close_calls(), 1);
    assert_eq!(bob.offers_created(), 0);
}

#[tokio::test]
async fn test_data_channel_can_be_disabled() {
    init_tracing();

    let mut config = crate::utils::config_for("alice");
    config.enable_data_channel = false;
    let mesh = TestMesh::with_config(config, SimulatedTransportFactory::failing_data_channels());
    mesh.channel.establish();

    mesh.channel.deliver_from("server", open(&["bob"], false));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.has_ready_peers(&["bob"])).await);

    let bob = mesh.transports.transport_for("bob").unwrap();
    assert!(bob.data_channel().is_none());
}

#[tokio::test]
async fn test_disconnect_during_data_channel_setup_closes_transport() {
    init_tracing();

    let mesh = TestMesh::with_factory("alice", SimulatedTransportFactory::gated_data_channels());
    mesh.channel.establish();

    mesh.channel.deliver_from("server", open(&["bob"], false));
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.transports.created() == 1).await);
    let bob = mesh.transports.transport_for("bob").unwrap();

    // The transport exists but its data channel is still parked.
    mesh.channel.drop_connection(DisconnectReason::Lost);
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || bob.close_calls() == 1).await);
    assert!(wait_until(SIGNAL_TIMEOUT_MS, || mesh.view().is_empty()).await);

    mesh.transports.release_data_channels(10);
    settle().await;
    assert_eq!(bob.close_calls(), 1, "a half-built transport is closed once");
    assert!(bob.data_channel().is_none());
    assert_eq!(bob.offers_created(), 0);
}
