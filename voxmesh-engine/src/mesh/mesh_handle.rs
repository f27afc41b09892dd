use crate::config::MeshConfig;
use crate::error::MeshError;
use crate::mesh::{AudioStateHandlerFactory, DataChannelHandlerFactory, Mesh, MeshCommand, MeshView};
use crate::signaling::{SignalingChannel, SignalingEvent};
use crate::transport::TransportFactory;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;
use voxmesh_core::{AudioState, PeerId, SignalPayload};

/// Cloneable front door to a running mesh coordinator.
#[derive(Clone)]
pub struct MeshHandle {
    signaling: Arc<dyn SignalingChannel>,
    commands: mpsc::Sender<MeshCommand>,
    view: MeshView,
}

impl MeshHandle {
    /// Starts the coordinator with the built-in audio-state data channel handler.
    pub fn spawn<C>(
        config: MeshConfig,
        signaling: Arc<C>,
        events: mpsc::UnboundedReceiver<SignalingEvent>,
        transports: Arc<dyn TransportFactory>,
    ) -> (Self, JoinHandle<()>)
    where
        C: SignalingChannel + 'static,
    {
        Self::spawn_with_handlers(
            config,
            signaling,
            events,
            transports,
            Arc::new(AudioStateHandlerFactory),
        )
    }

    pub fn spawn_with_handlers<C>(
        config: MeshConfig,
        signaling: Arc<C>,
        events: mpsc::UnboundedReceiver<SignalingEvent>,
        transports: Arc<dyn TransportFactory>,
        handlers: Arc<dyn DataChannelHandlerFactory>,
    ) -> (Self, JoinHandle<()>)
    where
        C: SignalingChannel + 'static,
    {
        let (tx, rx) = mpsc::channel(100);
        let view = MeshView::new();

        let mesh = Mesh::new(
            config,
            signaling.clone(),
            events,
            rx,
            transports,
            handlers,
            view.clone(),
        );
        let task = tokio::spawn(mesh.run());

        let handle = Self {
            signaling,
            commands: tx,
            view,
        };
        (handle, task)
    }

    /// Connects to the relay. The server answers our `ready` with `open`.
    pub async fn join(&self) -> Result<(), MeshError> {
        self.signaling.connect().await?;
        Ok(())
    }

    /// Tells the room we are leaving, then drops the relay connection.
    pub async fn leave(&self) -> Result<(), MeshError> {
        if self.signaling.is_connected() {
            info!("Leaving room");
            self.signaling.send(SignalPayload::Close).await?;
        }
        self.signaling.disconnect().await?;
        Ok(())
    }

    pub async fn set_audio_state(&self, state: AudioState) -> Result<(), MeshError> {
        self.command(MeshCommand::SetAudioState(state)).await
    }

    pub async fn renegotiate(&self, peer_id: PeerId) -> Result<(), MeshError> {
        self.command(MeshCommand::Renegotiate(peer_id)).await
    }

    pub fn view(&self) -> &MeshView {
        &self.view
    }

    /// Removes every peer and stops the coordinator.
    pub async fn shutdown(&self) -> Result<(), MeshError> {
        let (tx, rx) = oneshot::channel();
        self.command(MeshCommand::Shutdown(tx)).await?;
        rx.await.map_err(|_| MeshError::Stopped)
    }

    async fn command(&self, cmd: MeshCommand) -> Result<(), MeshError> {
        self.commands.send(cmd).await.map_err(|_| MeshError::Stopped)
    }
}
