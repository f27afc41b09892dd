use crate::mesh::{
    DataChannelContext, DataChannelHandler, DataChannelHandlerFactory, MeshView, NegotiationState,
};
use crate::transport::{LinkId, PeerTransport, TransportConfig, TransportEventSink, TransportFactory};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use voxmesh_core::utils::{AUDIO_STATE_CHANNEL_ID, data_channel_label};
use voxmesh_core::{IceCandidate, PeerId};

/// Upper bound on remote candidates held back before a description is applied.
pub(crate) const MAX_PENDING_CANDIDATES: usize = 64;

#[derive(Debug, Error)]
pub(crate) enum InitError {
    #[error("initialization cancelled")]
    Cancelled,

    #[error("transport setup failed: {0:#}")]
    Transport(anyhow::Error),
}

pub(crate) struct AttachedChannel {
    pub handler: Box<dyn DataChannelHandler>,
    pub ctx: DataChannelContext,
}

/// An outstanding offer of ours.
pub(crate) struct OfferAttempt {
    pub id: u64,
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
}

/// What [`Peer::initialize`] needs to build a link.
pub(crate) struct PeerSetup<'a> {
    pub peer_id: PeerId,
    pub peer_type: String,
    pub polite: bool,
    pub link: LinkId,
    pub can_trickle_ice_candidates: bool,
    pub transports: &'a dyn TransportFactory,
    pub transport_config: &'a TransportConfig,
    pub events: TransportEventSink,
    pub handlers: Option<&'a dyn DataChannelHandlerFactory>,
    pub view: &'a MeshView,
}

pub(crate) struct Peer {
    pub peer_id: PeerId,
    pub peer_type: String,
    pub polite: bool,
    pub link: LinkId,
    pub transport: Arc<dyn PeerTransport>,
    pub negotiation: NegotiationState,
    pub can_trickle_ice_candidates: bool,
    /// A remote description has been applied on this link at least once.
    pub remote_description_set: bool,
    /// A full offer/answer exchange has completed.
    pub negotiated: bool,
    pub pending_remote_candidates: Vec<IceCandidate>,
    pub pending_local_candidates: Vec<IceCandidate>,
    pub data_channel: Option<AttachedChannel>,
    pub offer_attempt: Option<OfferAttempt>,
}

impl Peer {
    /// Builds the transport and, if asked, the audio-state data channel.
    /// Anything acquired before `cancel` fires or a step fails is released here.
    pub async fn initialize(
        setup: PeerSetup<'_>,
        cancel: &CancellationToken,
    ) -> Result<Peer, InitError> {
        let transport = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(InitError::Cancelled),
            result = setup.transports.create(setup.transport_config, setup.events) => {
                result.map_err(InitError::Transport)?
            }
        };

        let data_channel = match setup.handlers {
            Some(handlers) => {
                let label = data_channel_label(setup.peer_id.as_str());
                let created = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(InitError::Cancelled),
                    result = transport.create_data_channel(&label, AUDIO_STATE_CHANNEL_ID) => {
                        result.map_err(InitError::Transport)
                    }
                };

                let channel = match created {
                    Ok(channel) => channel,
                    Err(e) => {
                        release_transport(&setup.peer_id, transport.as_ref()).await;
                        return Err(e);
                    }
                };

                Some(AttachedChannel {
                    handler: handlers.create_handler(),
                    ctx: DataChannelContext::new(
                        setup.peer_id.clone(),
                        setup.peer_type.clone(),
                        channel,
                        setup.view.clone(),
                    ),
                })
            }
            None => None,
        };

        if cancel.is_cancelled() {
            if let Some(attached) = &data_channel {
                attached.handler.dispose();
            }
            release_transport(&setup.peer_id, transport.as_ref()).await;
            return Err(InitError::Cancelled);
        }

        Ok(Peer {
            peer_id: setup.peer_id,
            peer_type: setup.peer_type,
            polite: setup.polite,
            link: setup.link,
            transport,
            negotiation: NegotiationState::default(),
            can_trickle_ice_candidates: setup.can_trickle_ice_candidates,
            remote_description_set: false,
            negotiated: false,
            pending_remote_candidates: Vec::new(),
            pending_local_candidates: Vec::new(),
            data_channel,
            offer_attempt: None,
        })
    }

    /// Stops our outstanding offer, if any, and waits for it to unwind.
    pub async fn abandon_offer(&mut self) {
        if let Some(attempt) = self.offer_attempt.take() {
            attempt.cancel.cancel();
            if let Err(e) = attempt.task.await {
                debug!("Offer task for {} ended abnormally: {}", self.peer_id, e);
            }
        }
        self.negotiation.making_offer = false;
    }

    pub fn queue_remote_candidate(&mut self, candidate: IceCandidate) {
        if self.pending_remote_candidates.len() >= MAX_PENDING_CANDIDATES {
            warn!(
                "Too many early candidates from {}, dropping the oldest",
                self.peer_id
            );
            self.pending_remote_candidates.remove(0);
        }
        self.pending_remote_candidates.push(candidate);
    }

    pub async fn add_remote_candidate(&self, candidate: IceCandidate) {
        if let Err(e) = self.transport.add_ice_candidate(candidate).await {
            if self.negotiation.ignore_offer {
                debug!("Dropped candidate from {} for an ignored offer", self.peer_id);
            } else {
                warn!("Failed to add ICE candidate for {}: {:#}", self.peer_id, e);
            }
        }
    }

    /// Applies candidates that arrived before the remote description.
    pub async fn drain_remote_candidates(&mut self) {
        let pending = std::mem::take(&mut self.pending_remote_candidates);
        for candidate in pending {
            self.add_remote_candidate(candidate).await;
        }
    }

    /// Releases everything the peer owns. Consumes the peer so it runs once.
    pub async fn dispose(mut self) {
        if let Some(attempt) = self.offer_attempt.take() {
            attempt.cancel.cancel();
            attempt.task.abort();
        }

        if let Some(attached) = self.data_channel.take() {
            attached.handler.dispose();
            if let Err(e) = attached.ctx.close_channel().await {
                debug!("Closing data channel for {} failed: {:#}", self.peer_id, e);
            }
        }

        if let Err(e) = self.transport.close().await {
            warn!("Closing transport for {} failed: {:#}", self.peer_id, e);
        }
    }
}

/// Closes a transport whose peer never finished setup.
async fn release_transport(peer_id: &PeerId, transport: &dyn PeerTransport) {
    if let Err(e) = transport.close().await {
        debug!("Closing half-built transport for {} failed: {:#}", peer_id, e);
    }
}
