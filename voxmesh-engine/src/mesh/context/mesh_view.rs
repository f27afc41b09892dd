use crate::transport::ConnectionState;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use voxmesh_core::{AudioState, PeerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerPhase {
    /// Transport and data channel are still being set up.
    Initializing,
    Negotiating,
    Connected,
}

impl fmt::Display for PeerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeerPhase::Initializing => "initializing",
            PeerPhase::Negotiating => "negotiating",
            PeerPhase::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// What the mesh knows about one remote participant, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerStatus {
    pub peer_id: PeerId,
    pub peer_type: String,
    pub polite: bool,
    pub phase: PeerPhase,
    pub connection_state: ConnectionState,
    pub remote_audio_state: AudioState,
    pub data_channel_open: bool,
}

impl PeerStatus {
    pub(crate) fn initializing(
        peer_id: PeerId,
        peer_type: String,
        polite: bool,
        audio: AudioState,
    ) -> Self {
        Self {
            peer_id,
            peer_type,
            polite,
            phase: PeerPhase::Initializing,
            connection_state: ConnectionState::New,
            remote_audio_state: audio,
            data_channel_open: false,
        }
    }
}

/// Read view of the mesh. Cheap to clone and safe to poll from any thread
/// while the coordinator mutates the peer set.
#[derive(Clone, Default)]
pub struct MeshView {
    peers: Arc<DashMap<PeerId, PeerStatus>>,
    local_audio: Arc<AtomicU16>,
}

impl MeshView {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// All peers, ordered by id.
    pub fn snapshot(&self) -> Vec<PeerStatus> {
        let mut peers: Vec<PeerStatus> = self
            .peers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        peers.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
        peers
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<PeerStatus> {
        self.peers.get(peer_id).map(|entry| entry.value().clone())
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.peers.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn local_audio_state(&self) -> AudioState {
        AudioState::from_bits(self.local_audio.load(Ordering::SeqCst))
    }

    pub(crate) fn insert(&self, status: PeerStatus) {
        self.peers.insert(status.peer_id.clone(), status);
    }

    pub(crate) fn remove(&self, peer_id: &PeerId) {
        self.peers.remove(peer_id);
    }

    pub(crate) fn clear(&self) {
        self.peers.clear();
    }

    pub(crate) fn update(&self, peer_id: &PeerId, f: impl FnOnce(&mut PeerStatus)) {
        if let Some(mut entry) = self.peers.get_mut(peer_id) {
            f(entry.value_mut());
        }
    }

    pub(crate) fn set_local_audio_state(&self, state: AudioState) {
        self.local_audio.store(state.bits(), Ordering::SeqCst);
    }
}
