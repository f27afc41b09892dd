use crate::mesh::MeshView;
use crate::transport::DataChannel;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};
use voxmesh_core::{AudioState, PeerId};

/// Everything a handler can touch for the peer it serves.
#[derive(Clone)]
pub struct DataChannelContext {
    peer_id: PeerId,
    peer_type: String,
    channel: Arc<dyn DataChannel>,
    view: MeshView,
}

impl DataChannelContext {
    pub(crate) fn new(
        peer_id: PeerId,
        peer_type: String,
        channel: Arc<dyn DataChannel>,
        view: MeshView,
    ) -> Self {
        Self {
            peer_id,
            peer_type,
            channel,
            view,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn peer_type(&self) -> &str {
        &self.peer_type
    }

    pub fn local_audio_state(&self) -> AudioState {
        self.view.local_audio_state()
    }

    /// Queues `data` on the channel without waiting for delivery.
    pub fn send(&self, data: Bytes) {
        let channel = self.channel.clone();
        let peer_id = self.peer_id.clone();
        tokio::spawn(async move {
            if let Err(e) = channel.send(data).await {
                debug!("Data channel send to {} failed: {:#}", peer_id, e);
            }
        });
    }

    pub(crate) async fn close_channel(&self) -> anyhow::Result<()> {
        self.channel.close().await
    }

    pub fn set_remote_audio_state(&self, state: AudioState) {
        self.view
            .update(&self.peer_id, |status| status.remote_audio_state = state);
    }
}

/// Application logic attached to a peer's data channel.
///
/// Calls are made by the mesh coordinator, one at a time, so handlers should
/// not block. Use [`DataChannelContext::send`] for outbound traffic.
#[async_trait]
pub trait DataChannelHandler: Send + Sync {
    async fn on_open(&self, _ctx: &DataChannelContext) {}

    async fn on_message(&self, ctx: &DataChannelContext, data: Bytes);

    async fn on_local_audio_state(&self, _ctx: &DataChannelContext, _state: AudioState) {}

    async fn on_close(&self, _ctx: &DataChannelContext) {}

    /// Called once when the peer is removed.
    fn dispose(&self) {}
}

pub trait DataChannelHandlerFactory: Send + Sync {
    fn create_handler(&self) -> Box<dyn DataChannelHandler>;
}

impl<F> DataChannelHandlerFactory for F
where
    F: Fn() -> Box<dyn DataChannelHandler> + Send + Sync,
{
    fn create_handler(&self) -> Box<dyn DataChannelHandler> {
        self()
    }
}

/// Shares mute/deafen flags as a two-byte little-endian value.
#[derive(Debug, Default)]
pub struct AudioStateHandler;

#[async_trait]
impl DataChannelHandler for AudioStateHandler {
    async fn on_open(&self, ctx: &DataChannelContext) {
        let state = ctx.local_audio_state();
        ctx.send(Bytes::copy_from_slice(&state.to_le_bytes()));
    }

    async fn on_message(&self, ctx: &DataChannelContext, data: Bytes) {
        match AudioState::from_le_slice(&data) {
            Some(state) => {
                debug!("{} is now {}", ctx.peer_id(), state);
                ctx.set_remote_audio_state(state);
            }
            None => warn!(
                "Malformed audio state from {} ({} bytes)",
                ctx.peer_id(),
                data.len()
            ),
        }
    }

    async fn on_local_audio_state(&self, ctx: &DataChannelContext, state: AudioState) {
        ctx.send(Bytes::copy_from_slice(&state.to_le_bytes()));
    }
}

#[derive(Debug, Default, Clone)]
pub struct AudioStateHandlerFactory;

impl DataChannelHandlerFactory for AudioStateHandlerFactory {
    fn create_handler(&self) -> Box<dyn DataChannelHandler> {
        Box::new(AudioStateHandler)
    }
}
