use serde::{Deserialize, Serialize};
use std::fmt;

/// Mute/deafen flags a participant shares with the room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioState(u16);

impl AudioState {
    pub const NONE: AudioState = AudioState(0);
    pub const MIC_MUTED: AudioState = AudioState(1 << 0);
    pub const DEAFENED: AudioState = AudioState(1 << 1);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: AudioState) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, flag: AudioState, enabled: bool) {
        if enabled {
            self.0 |= flag.0;
        } else {
            self.0 &= !flag.0;
        }
    }

    pub fn is_mic_muted(self) -> bool {
        self.contains(Self::MIC_MUTED)
    }

    pub fn is_deafened(self) -> bool {
        self.contains(Self::DEAFENED)
    }

    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Decodes the two-byte little-endian form sent over the data channel.
    pub fn from_le_slice(data: &[u8]) -> Option<Self> {
        let bytes: [u8; 2] = data.get(..2)?.try_into().ok()?;
        Some(Self(u16::from_le_bytes(bytes)))
    }
}

impl std::ops::BitOr for AudioState {
    type Output = AudioState;

    fn bitor(self, rhs: Self) -> Self::Output {
        AudioState(self.0 | rhs.0)
    }
}

impl fmt::Display for AudioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_mic_muted(), self.is_deafened()) {
            (false, false) => write!(f, "live"),
            (true, false) => write!(f, "muted"),
            (false, true) => write!(f, "deafened"),
            (true, true) => write!(f, "muted+deafened"),
        }
    }
}
