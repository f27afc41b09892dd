mod audio;
mod frame;
mod peer;
mod signaling;

pub use audio::AudioState;
pub use frame::{ChannelFrame, ReadyAnnouncement, UniquenessRejection};
pub use peer::PeerId;
pub use signaling::{
    Connection, IceCandidate, IceServerConfig, SdpType, SessionDescription, SignalEnvelope,
    SignalPayload, SignalTarget, TurnConfig,
};
