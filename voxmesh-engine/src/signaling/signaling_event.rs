use tokio_util::sync::CancellationToken;
use voxmesh_core::SignalEnvelope;

/// Events delivered by a [`SignalingChannel`](crate::SignalingChannel).
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    Connected(ConnectionEpoch),
    Message(SignalEnvelope),
    Disconnected(DisconnectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `disconnect()` was called.
    Requested,
    /// The socket dropped; the channel keeps reconnecting underneath.
    Lost,
    /// The relay refused our identity. No retry happens at this layer.
    DuplicateIdentity,
}

/// One connected stretch of the relay channel.
///
/// The channel cancels the epoch before it emits `Disconnected`, so work
/// started under it (peer setup in particular) can unwind without waiting
/// for the disconnect event to be processed.
#[derive(Debug, Clone)]
pub struct ConnectionEpoch {
    id: u64,
    token: CancellationToken,
}

impl ConnectionEpoch {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Token that is cancelled with this epoch but can also be cancelled on its own.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}
