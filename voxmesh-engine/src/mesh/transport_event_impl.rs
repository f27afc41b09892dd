use crate::mesh::{Mesh, PeerPhase};
use crate::transport::{ConnectionState, SignalingState, TransportEvent, TransportEventKind};
use tracing::{debug, info, trace};

impl Mesh {
    pub(crate) async fn handle_transport_event(&mut self, event: TransportEvent) {
        let TransportEvent {
            peer_id,
            link,
            kind,
        } = event;

        let Some(peer) = self.peers.get(&peer_id) else {
            trace!("Dropping {:?} for removed peer {}", kind, peer_id);
            return;
        };
        if peer.link != link {
            debug!("Ignoring stale event from {} for {}", link, peer_id);
            return;
        }

        match kind {
            TransportEventKind::LocalCandidateReady(candidate) => {
                if self.config.verbose {
                    debug!("Ice candidate for {}: {}", peer_id, candidate.candidate);
                }
                self.forward_local_candidate(&peer_id, candidate);
            }

            TransportEventKind::ConnectionStateChanged(state) => {
                info!("Connection with {} is {}", peer_id, state);
                self.view.update(&peer_id, |status| {
                    status.connection_state = state;
                    status.phase = match state {
                        ConnectionState::Connected => PeerPhase::Connected,
                        _ => PeerPhase::Negotiating,
                    };
                });

                if state.is_terminal() {
                    self.remove_peer(&peer_id).await;
                }
            }

            TransportEventKind::NegotiationNeeded => {
                let stable = peer.transport.signaling_state() == SignalingState::Stable;
                if peer.negotiated && stable && !peer.negotiation.making_offer {
                    self.begin_offer(&peer_id);
                } else {
                    trace!("Negotiation needed for {} deferred", peer_id);
                }
            }

            TransportEventKind::DataChannelOpen => {
                self.view
                    .update(&peer_id, |status| status.data_channel_open = true);
                if let Some(attached) = &peer.data_channel {
                    debug!("Data channel {} open", attached.ctx.peer_id());
                    attached.handler.on_open(&attached.ctx).await;
                }
            }

            TransportEventKind::DataChannelClosed => {
                self.view
                    .update(&peer_id, |status| status.data_channel_open = false);
                if let Some(attached) = &peer.data_channel {
                    attached.handler.on_close(&attached.ctx).await;
                }
            }

            TransportEventKind::DataMessage(data) => {
                if let Some(attached) = &peer.data_channel {
                    attached.handler.on_message(&attached.ctx, data).await;
                }
            }
        }
    }
}
