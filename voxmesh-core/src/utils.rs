pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// Target marker used by the relay for "deliver to everyone in the room".
pub const BROADCAST_TARGET: &str = "all";

/// Both ends create the audio-state channel out of band with this stream id.
pub const AUDIO_STATE_CHANNEL_ID: u16 = 0;

pub fn data_channel_label(peer_id: &str) -> String {
    format!("{peer_id}Channel")
}
