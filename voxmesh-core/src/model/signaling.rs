use crate::model::audio::AudioState;
use crate::model::peer::PeerId;
use crate::utils::BROADCAST_TARGET;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// TURN relay credentials handed out by the signaling server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl From<TurnConfig> for IceServerConfig {
    fn from(turn: TurnConfig) -> Self {
        Self {
            urls: vec![turn.url],
            username: Some(turn.username),
            credential: Some(turn.password),
        }
    }
}

/// Who an envelope is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignalTarget {
    All,
    Peer(PeerId),
}

impl SignalTarget {
    pub fn is_addressed_to(&self, peer_id: &PeerId) -> bool {
        match self {
            SignalTarget::All => true,
            SignalTarget::Peer(target) => target == peer_id,
        }
    }
}

impl From<String> for SignalTarget {
    fn from(s: String) -> Self {
        if s == BROADCAST_TARGET {
            SignalTarget::All
        } else {
            SignalTarget::Peer(PeerId::from(s))
        }
    }
}

impl From<SignalTarget> for String {
    fn from(target: SignalTarget) -> Self {
        match target {
            SignalTarget::All => BROADCAST_TARGET.to_owned(),
            SignalTarget::Peer(peer_id) => peer_id.as_str().to_owned(),
        }
    }
}

impl fmt::Display for SignalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalTarget::All => write!(f, "{BROADCAST_TARGET}"),
            SignalTarget::Peer(peer_id) => write!(f, "{peer_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    pub from: PeerId,
    pub target: SignalTarget,
    pub payload: SignalPayload,
}

/// One room member listed in an `open` announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<String>,
    pub peer_id: PeerId,
    #[serde(default)]
    pub peer_type: String,
    #[serde(default)]
    pub audio_state: AudioState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdpType::Offer => write!(f, "offer"),
            SdpType::Answer => write!(f, "answer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    #[serde(rename = "sdp")]
    pub content: String,
}

impl SessionDescription {
    pub fn offer(content: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            content: content.into(),
        }
    }

    pub fn answer(content: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            content: content.into(),
        }
    }
}

/// A trickled network-path candidate. Only `candidate`, `sdp_mid` and
/// `sdp_m_line_index` are needed to apply it; the rest is diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: String,
    #[serde(default)]
    pub sdp_m_line_index: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foundation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub candidate_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>, sdp_mid: impl Into<String>, index: u16) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: sdp_mid.into(),
            sdp_m_line_index: index,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SignalPayload {
    Open {
        connections: Vec<Connection>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        be_polite: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        turn_config: Option<TurnConfig>,
    },
    Close,
    Sdp {
        sdp: SessionDescription,
    },
    Ice {
        ice: IceCandidate,
    },
}

impl SignalPayload {
    pub fn action(&self) -> &'static str {
        match self {
            SignalPayload::Open { .. } => "open",
            SignalPayload::Close => "close",
            SignalPayload::Sdp { .. } => "sdp",
            SignalPayload::Ice { .. } => "ice",
        }
    }
}
