use crate::mesh::{DescriptionVerdict, Mesh, MeshNotice, OfferAttempt};
use crate::signaling::SignalingOutput;
use crate::transport::PeerTransport;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use voxmesh_core::{IceCandidate, PeerId, SdpType, SessionDescription, SignalPayload};

impl Mesh {
    /// Starts an offer towards `peer_id` unless one is already outstanding.
    pub(crate) fn begin_offer(&mut self, peer_id: &PeerId) {
        let Some(peer) = self.peers.get_mut(peer_id) else {
            return;
        };
        if peer.offer_attempt.is_some() {
            debug!("Offer to {} already in flight", peer_id);
            return;
        }
        if peer.polite && !peer.transport.supports_rollback() {
            debug!("Leaving the offer to {}, our transport cannot yield in glare", peer_id);
            return;
        }

        self.attempt_seq += 1;
        let id = self.attempt_seq;
        let cancel = CancellationToken::new();
        peer.negotiation.making_offer = true;

        let task = tokio::spawn(send_offer(OfferTask {
            peer_id: peer_id.clone(),
            attempt: id,
            transport: peer.transport.clone(),
            signaling: self.signaling.clone(),
            notices: self.notice_tx.clone(),
            cancel: cancel.clone(),
            verbose: self.config.verbose,
        }));

        peer.offer_attempt = Some(OfferAttempt { id, cancel, task });
    }

    pub(crate) async fn handle_sdp(&mut self, from: &PeerId, description: SessionDescription) {
        let Some(peer) = self.peers.get_mut(from) else {
            warn!("Received {:?} from unknown peer {}", description.kind, from);
            return;
        };

        let kind = description.kind;
        let verdict = peer.negotiation.on_remote_description(
            kind,
            peer.polite,
            peer.transport.signaling_state(),
        );

        let rollback = match verdict {
            DescriptionVerdict::Ignore => {
                debug!("Ignoring colliding offer from {}", from);
                return;
            }
            DescriptionVerdict::Apply { rollback } => rollback,
        };

        if rollback {
            info!("Offer collision with {}, yielding", from);
            peer.abandon_offer().await;
            if let Err(e) = peer.transport.rollback().await {
                error!("Rollback for {} failed: {:#}", from, e);
                return;
            }
        }

        if kind == SdpType::Answer {
            peer.negotiation.is_setting_remote_answer_pending = true;
        }
        let applied = peer.transport.set_remote_description(description).await;
        peer.negotiation.is_setting_remote_answer_pending = false;

        if let Err(e) = applied {
            error!("Failed to apply {:?} from {}: {:#}", kind, from, e);
            return;
        }

        peer.remote_description_set = true;
        peer.drain_remote_candidates().await;
        for candidate in std::mem::take(&mut peer.pending_local_candidates) {
            spawn_send(self.signaling.clone(), from.clone(), SignalPayload::Ice { ice: candidate });
        }

        if kind == SdpType::Answer {
            peer.negotiated = true;
            return;
        }

        match peer.transport.create_answer().await {
            Ok(answer) => {
                peer.negotiated = true;
                if self.config.verbose {
                    debug!("Sending answer to {}: {}", from, answer.content);
                }
                spawn_send(self.signaling.clone(), from.clone(), SignalPayload::Sdp { sdp: answer });
            }
            Err(e) => error!("Failed to create answer for {}: {:#}", from, e),
        }
    }

    pub(crate) async fn handle_ice(&mut self, from: &PeerId, candidate: IceCandidate) {
        let Some(peer) = self.peers.get_mut(from) else {
            warn!("Received ice from unknown peer {}", from);
            return;
        };
        if candidate.candidate.trim().is_empty() {
            warn!("Dropping malformed candidate from {}", from);
            return;
        }

        if self.config.verbose {
            debug!(
                "Candidate from {}: {} ({}, {})",
                from, candidate.candidate, candidate.sdp_mid, candidate.sdp_m_line_index
            );
        }

        if !peer.remote_description_set {
            peer.queue_remote_candidate(candidate);
            return;
        }
        peer.add_remote_candidate(candidate).await;
    }

    pub(crate) fn forward_local_candidate(&mut self, peer_id: &PeerId, candidate: IceCandidate) {
        let Some(peer) = self.peers.get_mut(peer_id) else {
            return;
        };
        if peer.can_trickle_ice_candidates || peer.remote_description_set {
            spawn_send(self.signaling.clone(), peer_id.clone(), SignalPayload::Ice { ice: candidate });
        } else {
            peer.pending_local_candidates.push(candidate);
        }
    }
}

struct OfferTask {
    peer_id: PeerId,
    attempt: u64,
    transport: Arc<dyn PeerTransport>,
    signaling: Arc<dyn SignalingOutput>,
    notices: mpsc::UnboundedSender<MeshNotice>,
    cancel: CancellationToken,
    verbose: bool,
}

async fn send_offer(task: OfferTask) {
    let created = tokio::select! {
        biased;
        _ = task.cancel.cancelled() => None,
        result = task.transport.create_offer() => Some(result),
    };

    match created {
        None => debug!("Offer to {} abandoned", task.peer_id),
        Some(Err(e)) => warn!("Failed to create offer for {}: {:#}", task.peer_id, e),
        Some(Ok(_)) if task.cancel.is_cancelled() => {
            debug!("Offer to {} abandoned before sending", task.peer_id)
        }
        Some(Ok(offer)) => {
            if task.verbose {
                debug!("Sending offer to {}: {}", task.peer_id, offer.content);
            }
            let payload = SignalPayload::Sdp { sdp: offer };
            if let Err(e) = task.signaling.send_to(&task.peer_id, payload).await {
                warn!("Failed to send offer to {}: {}", task.peer_id, e);
            }
        }
    }

    let _ = task.notices.send(MeshNotice::OfferSettled {
        peer_id: task.peer_id,
        attempt: task.attempt,
    });
}

/// Fire-and-forget point-to-point send.
fn spawn_send(signaling: Arc<dyn SignalingOutput>, to: PeerId, payload: SignalPayload) {
    tokio::spawn(async move {
        let action = payload.action();
        if let Err(e) = signaling.send_to(&to, payload).await {
            warn!("Failed to send {} to {}: {}", action, to, e);
        }
    });
}
