use crate::config::MeshConfig;
use crate::mesh::{DataChannelHandlerFactory, MeshCommand, MeshNotice, MeshView, Peer};
use crate::signaling::{ConnectionEpoch, SignalingEvent, SignalingOutput};
use crate::transport::{TransportConfig, TransportEvent, TransportFactory};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use voxmesh_core::{AudioState, PeerId, SignalEnvelope, SignalPayload};

/// The coordinator. Owns every [`Peer`] and processes one event at a time,
/// whatever its source.
pub struct Mesh {
    pub(crate) config: MeshConfig,
    pub(crate) transport_config: TransportConfig,
    pub(crate) peers: HashMap<PeerId, Peer>,
    pub(crate) view: MeshView,
    pub(crate) signaling: Arc<dyn SignalingOutput>,
    pub(crate) transports: Arc<dyn TransportFactory>,
    pub(crate) handlers: Arc<dyn DataChannelHandlerFactory>,
    pub(crate) epoch: Option<ConnectionEpoch>,
    pub(crate) local_audio: AudioState,
    signaling_rx: mpsc::UnboundedReceiver<SignalingEvent>,
    command_rx: mpsc::Receiver<MeshCommand>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    pub(crate) transport_tx: mpsc::UnboundedSender<TransportEvent>,
    notice_rx: mpsc::UnboundedReceiver<MeshNotice>,
    pub(crate) notice_tx: mpsc::UnboundedSender<MeshNotice>,
    pub(crate) link_seq: u64,
    pub(crate) attempt_seq: u64,
}

impl Mesh {
    pub fn new(
        config: MeshConfig,
        signaling: Arc<dyn SignalingOutput>,
        signaling_rx: mpsc::UnboundedReceiver<SignalingEvent>,
        command_rx: mpsc::Receiver<MeshCommand>,
        transports: Arc<dyn TransportFactory>,
        handlers: Arc<dyn DataChannelHandlerFactory>,
        view: MeshView,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        Self {
            transport_config: config.transport.clone(),
            config,
            peers: HashMap::new(),
            view,
            signaling,
            transports,
            handlers,
            epoch: None,
            local_audio: AudioState::NONE,
            signaling_rx,
            command_rx,
            transport_rx,
            transport_tx,
            notice_rx,
            notice_tx,
            link_seq: 0,
            attempt_seq: 0,
        }
    }

    pub async fn run(mut self) {
        info!("Mesh event loop started for {}", self.config.local.peer_id);

        let shutdown_reply = loop {
            tokio::select! {
                event = self.signaling_rx.recv() => match event {
                    Some(e) => self.handle_signaling_event(e).await,
                    None => {
                        info!("Signaling event stream ended. Shutting down mesh.");
                        break None;
                    }
                },

                cmd = self.command_rx.recv() => match cmd {
                    Some(MeshCommand::Shutdown(reply)) => break Some(reply),
                    Some(c) => self.handle_command(c).await,
                    None => {
                        info!("All mesh handles dropped. Shutting down mesh.");
                        break None;
                    }
                },

                Some(event) = self.transport_rx.recv() => {
                    self.handle_transport_event(event).await;
                }

                Some(notice) = self.notice_rx.recv() => {
                    self.handle_notice(notice);
                }
            }
        };

        if let Some(epoch) = self.epoch.take() {
            epoch.cancel();
        }
        self.remove_all_peers().await;
        self.finish(shutdown_reply);
        info!("Mesh event loop finished");
    }

    fn finish(&self, reply: Option<oneshot::Sender<()>>) {
        if let Some(reply) = reply {
            let _ = reply.send(());
        }
    }

    async fn handle_signaling_event(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Connected(epoch) => {
                info!("Signaling connected (epoch {})", epoch.id());
                if let Some(previous) = self.epoch.replace(epoch) {
                    previous.cancel();
                }
            }

            SignalingEvent::Disconnected(reason) => {
                info!("Signaling disconnected: {:?}", reason);
                if let Some(epoch) = self.epoch.take() {
                    epoch.cancel();
                }
                self.remove_all_peers().await;
            }

            SignalingEvent::Message(envelope) => self.handle_message(envelope).await,
        }
    }

    async fn handle_message(&mut self, envelope: SignalEnvelope) {
        let SignalEnvelope { from, payload, .. } = envelope;

        if from == self.config.local.peer_id {
            debug!("Ignoring {} from ourselves", payload.action());
            return;
        }

        match payload {
            SignalPayload::Open {
                connections,
                be_polite,
                turn_config,
            } => {
                let Some(polite) = be_polite else {
                    warn!("Dropping open from {} without a politeness assignment", from);
                    return;
                };
                if let Some(turn) = turn_config {
                    self.adopt_turn_config(turn);
                }
                self.handle_open(connections, polite).await;
            }

            SignalPayload::Close => self.handle_close(&from).await,

            SignalPayload::Sdp { sdp } => {
                if self.config.verbose {
                    debug!("Received {:?} from {}: {}", sdp.kind, from, sdp.content);
                } else {
                    debug!("Received {:?} from {}", sdp.kind, from);
                }
                self.handle_sdp(&from, sdp).await;
            }

            SignalPayload::Ice { ice } => self.handle_ice(&from, ice).await,
        }
    }

    async fn handle_command(&mut self, cmd: MeshCommand) {
        match cmd {
            MeshCommand::SetAudioState(state) => self.set_local_audio_state(state).await,
            MeshCommand::Renegotiate(peer_id) => {
                if self.peers.contains_key(&peer_id) {
                    self.begin_offer(&peer_id);
                } else {
                    debug!("Renegotiate requested for unknown peer {}", peer_id);
                }
            }
            // Handled by the run loop.
            MeshCommand::Shutdown(reply) => self.finish(Some(reply)),
        }
    }

    async fn set_local_audio_state(&mut self, state: AudioState) {
        self.local_audio = state;
        self.view.set_local_audio_state(state);

        for peer in self.peers.values() {
            if let Some(attached) = &peer.data_channel {
                attached
                    .handler
                    .on_local_audio_state(&attached.ctx, state)
                    .await;
            }
        }
    }

    fn handle_notice(&mut self, notice: MeshNotice) {
        match notice {
            MeshNotice::OfferSettled { peer_id, attempt } => {
                let Some(peer) = self.peers.get_mut(&peer_id) else {
                    return;
                };
                if peer.offer_attempt.as_ref().is_some_and(|a| a.id == attempt) {
                    peer.offer_attempt = None;
                    peer.negotiation.making_offer = false;
                }
            }
        }
    }
}
