use tokio::sync::oneshot;
use voxmesh_core::{AudioState, PeerId};

/// Requests from a [`MeshHandle`](crate::MeshHandle) to the coordinator.
#[derive(Debug)]
pub enum MeshCommand {
    /// Record our audio state and push it to every peer's data channel.
    SetAudioState(AudioState),

    /// Start a fresh offer towards a peer. Skipped on the polite side when
    /// its transport cannot roll back.
    Renegotiate(PeerId),

    /// Tear down every peer and stop the coordinator.
    Shutdown(oneshot::Sender<()>),
}

/// Reports from tasks the coordinator spawned.
#[derive(Debug)]
pub(crate) enum MeshNotice {
    /// An offer attempt finished, sent or not.
    OfferSettled { peer_id: PeerId, attempt: u64 },
}
