use bytes::Bytes;
use std::fmt;
use tokio::sync::mpsc;
use voxmesh_core::{IceCandidate, PeerId};

use crate::transport::ConnectionState;

/// Identifies one transport instance. A peer id that leaves and comes back
/// gets a new link, so late callbacks from the old one can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

#[derive(Debug)]
pub struct TransportEvent {
    pub peer_id: PeerId,
    pub link: LinkId,
    pub kind: TransportEventKind,
}

#[derive(Debug)]
pub enum TransportEventKind {
    LocalCandidateReady(IceCandidate),
    ConnectionStateChanged(ConnectionState),
    NegotiationNeeded,
    DataChannelOpen,
    DataChannelClosed,
    DataMessage(Bytes),
}

/// Handed to a transport so its callbacks can report back to the mesh.
/// Emitting never blocks.
#[derive(Debug, Clone)]
pub struct TransportEventSink {
    peer_id: PeerId,
    link: LinkId,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportEventSink {
    pub fn new(peer_id: PeerId, link: LinkId, tx: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { peer_id, link, tx }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn link(&self) -> LinkId {
        self.link
    }

    pub fn emit(&self, kind: TransportEventKind) {
        let _ = self.tx.send(TransportEvent {
            peer_id: self.peer_id.clone(),
            link: self.link,
            kind,
        });
    }
}
