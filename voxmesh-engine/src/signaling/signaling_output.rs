use crate::error::SignalingError;
use async_trait::async_trait;
use voxmesh_core::{PeerId, SignalPayload};

/// Outbound half of the relay channel. The mesh coordinator only ever sees this.
///
/// Sends are best effort: while the channel is not connected they succeed
/// without doing anything and the caller is not expected to retry.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Send to every participant in the room.
    async fn send(&self, payload: SignalPayload) -> Result<(), SignalingError>;

    /// Send to a single participant.
    async fn send_to(&self, target: &PeerId, payload: SignalPayload) -> Result<(), SignalingError>;
}

/// Full relay channel: outbound sends plus the connection lifecycle.
/// Inbound traffic and lifecycle transitions arrive as [`SignalingEvent`]s
/// on the receiver handed out when the channel is constructed.
///
/// [`SignalingEvent`]: crate::SignalingEvent
#[async_trait]
pub trait SignalingChannel: SignalingOutput {
    async fn connect(&self) -> Result<(), SignalingError>;

    async fn disconnect(&self) -> Result<(), SignalingError>;

    fn is_connected(&self) -> bool;
}
