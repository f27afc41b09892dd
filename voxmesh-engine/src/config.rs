use crate::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use voxmesh_core::PeerId;

/// Who we are in the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalIdentity {
    pub peer_id: PeerId,
    pub peer_type: String,
}

impl LocalIdentity {
    pub fn new(peer_id: impl Into<PeerId>, peer_type: impl Into<String>) -> Self {
        Self {
            peer_id: peer_id.into(),
            peer_type: peer_type.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeshConfig {
    pub local: LocalIdentity,
    /// Attach the negotiated audio-state data channel to every link.
    pub enable_data_channel: bool,
    /// Whether remote peers accept candidates before the description exchange finishes.
    pub trickle_ice: bool,
    /// Log SDP bodies and candidate strings at debug level.
    pub verbose: bool,
    pub transport: TransportConfig,
}

impl MeshConfig {
    pub fn new(local: LocalIdentity) -> Self {
        Self {
            local,
            ..Default::default()
        }
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            local: LocalIdentity::new(PeerId::random(), "player"),
            enable_data_channel: true,
            trickle_ice: true,
            verbose: false,
            transport: TransportConfig::default(),
        }
    }
}
