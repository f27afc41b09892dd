use crate::mesh::{InitError, Mesh, Peer, PeerPhase, PeerSetup, PeerStatus};
use crate::transport::{LinkId, TransportEventSink};
use tracing::{debug, error, info, warn};
use voxmesh_core::{Connection, PeerId, TurnConfig};

impl Mesh {
    pub(crate) fn adopt_turn_config(&mut self, turn: TurnConfig) {
        let url = turn.url.clone();
        if self.transport_config.add_ice_server(turn.into()) {
            info!("Using TURN server {} for new peers", url);
        }
    }

    pub(crate) async fn handle_open(&mut self, connections: Vec<Connection>, polite: bool) {
        for connection in connections {
            self.add_peer(connection, polite).await;
        }
    }

    pub(crate) async fn add_peer(&mut self, connection: Connection, polite: bool) {
        let Connection {
            peer_id,
            peer_type,
            audio_state,
            ..
        } = connection;

        if peer_id == self.config.local.peer_id {
            debug!("Skipping ourselves in open");
            return;
        }
        if self.peers.contains_key(&peer_id) {
            debug!("A peer connection with {} already exists", peer_id);
            return;
        }
        let Some(epoch) = &self.epoch else {
            warn!("Ignoring open for {} while signaling is down", peer_id);
            return;
        };
        let cancel = epoch.child_token();

        self.link_seq += 1;
        let link = LinkId(self.link_seq);
        self.view.insert(PeerStatus::initializing(
            peer_id.clone(),
            peer_type.clone(),
            polite,
            audio_state,
        ));
        debug!("Added {} as a peer ({})", peer_id, link);

        let setup = PeerSetup {
            peer_id: peer_id.clone(),
            peer_type,
            polite,
            link,
            can_trickle_ice_candidates: self.config.trickle_ice,
            transports: self.transports.as_ref(),
            transport_config: &self.transport_config,
            events: TransportEventSink::new(peer_id.clone(), link, self.transport_tx.clone()),
            handlers: self
                .config
                .enable_data_channel
                .then_some(self.handlers.as_ref()),
            view: &self.view,
        };

        match Peer::initialize(setup, &cancel).await {
            Ok(peer) => {
                self.peers.insert(peer_id.clone(), peer);
                self.view
                    .update(&peer_id, |status| status.phase = PeerPhase::Negotiating);
                info!(
                    "Peer {} ready as {} side",
                    peer_id,
                    if polite { "polite" } else { "impolite" }
                );

                // The impolite side always makes the first offer.
                if !polite {
                    self.begin_offer(&peer_id);
                }
            }
            Err(InitError::Cancelled) => {
                self.view.remove(&peer_id);
                info!("Setup of {} cancelled", peer_id);
            }
            Err(e) => {
                self.view.remove(&peer_id);
                error!("Failed to set up {}: {}", peer_id, e);
            }
        }
    }

    pub(crate) async fn handle_close(&mut self, peer_id: &PeerId) {
        if !self.remove_peer(peer_id).await {
            debug!("Close from {} with no peer to remove", peer_id);
        }
    }

    /// Returns whether a peer was actually removed.
    pub(crate) async fn remove_peer(&mut self, peer_id: &PeerId) -> bool {
        self.view.remove(peer_id);

        let Some(peer) = self.peers.remove(peer_id) else {
            return false;
        };
        peer.dispose().await;

        if self.config.verbose {
            debug!("Connection with {} has been removed", peer_id);
        }
        true
    }

    pub(crate) async fn remove_all_peers(&mut self) {
        let peer_ids: Vec<PeerId> = self.peers.keys().cloned().collect();
        for peer_id in &peer_ids {
            self.remove_peer(peer_id).await;
        }
        self.view.clear();

        if !peer_ids.is_empty() {
            info!("Removed {} peers", peer_ids.len());
        }
    }
}
