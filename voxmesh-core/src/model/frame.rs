use crate::model::peer::PeerId;
use crate::model::signaling::SignalEnvelope;
use serde::{Deserialize, Serialize};

/// Named events exchanged with the relay, one JSON text frame each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ChannelFrame {
    /// Sent by the client on every (re)connect so the relay can start an `open` cycle.
    Ready(ReadyAnnouncement),
    /// Broadcast send, and the name of every inbound delivery.
    Message(SignalEnvelope),
    /// Point-to-point send.
    MessageOne(SignalEnvelope),
    /// The relay already has a client with this identity.
    UniquenessError(UniquenessRejection),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyAnnouncement {
    pub peer_id: PeerId,
    pub peer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniquenessRejection {
    #[serde(default)]
    pub message: String,
}
