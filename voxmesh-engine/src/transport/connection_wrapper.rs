use crate::transport::{
    ConnectionState, DataChannel, PeerTransport, SignalingState, TransportConfig,
    TransportEventKind, TransportEventSink, TransportFactory,
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};
use voxmesh_core::{IceCandidate, PeerId, SdpType, SessionDescription};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;

/// [`TransportFactory`] backed by the `webrtc` crate.
#[derive(Debug, Default, Clone)]
pub struct WebRtcTransportFactory;

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        config: &TransportConfig,
        events: TransportEventSink,
    ) -> Result<Arc<dyn PeerTransport>> {
        let wrapper = ConnectionWrapper::new(config, events).await?;
        Ok(Arc::new(wrapper))
    }
}

pub struct ConnectionWrapper {
    pub peer_id: PeerId,
    pub peer_connection: Arc<RTCPeerConnection>,
    events: TransportEventSink,
}

impl ConnectionWrapper {
    /// Builds the peer connection and wires its callbacks into `events`.
    pub async fn new(config: &TransportConfig, events: TransportEventSink) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);
        let peer_id = events.peer_id().clone();

        let state_events = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                info!(
                    "Peer connection state changed for {}: {:?}",
                    state_events.peer_id(),
                    s
                );
                if let Some(state) = map_connection_state(s) {
                    state_events.emit(TransportEventKind::ConnectionStateChanged(state));
                }
                Box::pin(async {})
            },
        ));

        let ice_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            if let Some(candidate) = c {
                match to_signal_candidate(&candidate) {
                    Ok(candidate) => {
                        ice_events.emit(TransportEventKind::LocalCandidateReady(candidate))
                    }
                    Err(e) => debug!("Skipping unserializable local candidate: {:?}", e),
                }
            }
            Box::pin(async {})
        }));

        let negotiation_events = events.clone();
        peer_connection.on_negotiation_needed(Box::new(move || {
            negotiation_events.emit(TransportEventKind::NegotiationNeeded);
            Box::pin(async {})
        }));

        Ok(Self {
            peer_id,
            peer_connection,
            events,
        })
    }
}

#[async_trait]
impl PeerTransport for ConnectionWrapper {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        let desc = match description.kind {
            SdpType::Offer => RTCSessionDescription::offer(description.content)?,
            SdpType::Answer => RTCSessionDescription::answer(description.content)?,
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        match self.peer_connection.signaling_state() {
            RTCSignalingState::HaveLocalOffer => {
                bail!("webrtc cannot roll back a local offer for {}", self.peer_id)
            }
            _ => Ok(()),
        }
    }

    // webrtc rejects rollback descriptions in both directions.
    fn supports_rollback(&self) -> bool {
        false
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: Some(candidate.sdp_mid).filter(|mid| !mid.is_empty()),
            sdp_mline_index: Some(candidate.sdp_m_line_index),
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    fn signaling_state(&self) -> SignalingState {
        match self.peer_connection.signaling_state() {
            RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
            RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
            RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
            RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
            RTCSignalingState::Closed => SignalingState::Closed,
            _ => SignalingState::Stable,
        }
    }

    async fn create_data_channel(&self, label: &str, id: u16) -> Result<Arc<dyn DataChannel>> {
        let init = RTCDataChannelInit {
            ordered: Some(true),
            max_retransmits: Some(0),
            negotiated: Some(id),
            ..Default::default()
        };
        let channel = self
            .peer_connection
            .create_data_channel(label, Some(init))
            .await
            .context("Failed to create data channel")?;

        let open_events = self.events.clone();
        channel.on_open(Box::new(move || {
            debug!("DataChannel open for {}", open_events.peer_id());
            open_events.emit(TransportEventKind::DataChannelOpen);
            Box::pin(async {})
        }));

        let close_events = self.events.clone();
        channel.on_close(Box::new(move || {
            close_events.emit(TransportEventKind::DataChannelClosed);
            Box::pin(async {})
        }));

        let message_events = self.events.clone();
        channel.on_message(Box::new(move |msg: DataChannelMessage| {
            let bytes = Bytes::copy_from_slice(&msg.data);
            message_events.emit(TransportEventKind::DataMessage(bytes));
            Box::pin(async {})
        }));

        Ok(Arc::new(RtcDataLink { channel }))
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

struct RtcDataLink {
    channel: Arc<RTCDataChannel>,
}

#[async_trait]
impl DataChannel for RtcDataLink {
    fn label(&self) -> &str {
        self.channel.label()
    }

    async fn send(&self, data: Bytes) -> Result<()> {
        self.channel.send(&data).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.channel.close().await?;
        Ok(())
    }
}

fn map_connection_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
        _ => None,
    }
}

fn to_signal_candidate(candidate: &RTCIceCandidate) -> Result<IceCandidate> {
    let init = candidate.to_json()?;
    Ok(IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid.unwrap_or_default(),
        sdp_m_line_index: init.sdp_mline_index.unwrap_or_default(),
        foundation: Some(candidate.foundation.clone()),
        priority: Some(candidate.priority),
        address: Some(candidate.address.clone()),
        protocol: Some(candidate.protocol.to_string()),
        port: Some(candidate.port),
        candidate_type: Some(candidate.typ.to_string()),
        related_address: Some(candidate.related_address.clone()).filter(|a| !a.is_empty()),
        related_port: Some(candidate.related_port).filter(|p| *p != 0),
        username_fragment: init.username_fragment,
    })
}
