use crate::config::LocalIdentity;
use crate::error::SignalingError;
use crate::signaling::{
    ConnectionEpoch, DisconnectReason, SignalingChannel, SignalingConfig, SignalingEvent,
    SignalingOutput,
};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use voxmesh_core::{
    ChannelFrame, PeerId, ReadyAnnouncement, SignalEnvelope, SignalPayload, SignalTarget,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum SessionEnd {
    Requested,
    Lost,
    Rejected,
}

/// Sender of the live session, tagged with that session's epoch.
struct Outbound {
    epoch: u64,
    tx: mpsc::UnboundedSender<String>,
}

struct ChannelInner {
    config: SignalingConfig,
    identity: LocalIdentity,
    events_tx: mpsc::UnboundedSender<SignalingEvent>,
    outbound: Mutex<Option<Outbound>>,
    session: Mutex<Option<CancellationToken>>,
    epoch_seq: AtomicU64,
}

/// Relay channel over a WebSocket, with transparent reconnection.
///
/// Every text frame is a [`ChannelFrame`]. After each (re)connect the channel
/// announces itself with a `ready` frame; inbound `message` frames are
/// filtered and surfaced as [`SignalingEvent::Message`].
#[derive(Clone)]
pub struct WsSignalingChannel {
    inner: Arc<ChannelInner>,
}

impl WsSignalingChannel {
    pub fn new(
        config: SignalingConfig,
        identity: LocalIdentity,
    ) -> (Self, mpsc::UnboundedReceiver<SignalingEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let channel = Self {
            inner: Arc::new(ChannelInner {
                config,
                identity,
                events_tx,
                outbound: Mutex::new(None),
                session: Mutex::new(None),
                epoch_seq: AtomicU64::new(0),
            }),
        };
        (channel, events_rx)
    }

    pub fn local_peer_id(&self) -> &PeerId {
        &self.inner.identity.peer_id
    }

    fn envelope(&self, target: SignalTarget, payload: SignalPayload) -> SignalEnvelope {
        SignalEnvelope {
            from: self.inner.identity.peer_id.clone(),
            target,
            payload,
        }
    }
}

#[async_trait]
impl SignalingOutput for WsSignalingChannel {
    async fn send(&self, payload: SignalPayload) -> Result<(), SignalingError> {
        let frame = ChannelFrame::Message(self.envelope(SignalTarget::All, payload));
        self.inner.enqueue(&frame)
    }

    async fn send_to(&self, target: &PeerId, payload: SignalPayload) -> Result<(), SignalingError> {
        let frame =
            ChannelFrame::MessageOne(self.envelope(SignalTarget::Peer(target.clone()), payload));
        self.inner.enqueue(&frame)
    }
}

#[async_trait]
impl SignalingChannel for WsSignalingChannel {
    async fn connect(&self) -> Result<(), SignalingError> {
        let stop = {
            let mut session = lock(&self.inner.session);
            if session.as_ref().is_some_and(|token| !token.is_cancelled()) {
                debug!("Signaling channel already running");
                return Ok(());
            }
            let token = CancellationToken::new();
            *session = Some(token.clone());
            token
        };

        let socket = match self.inner.open_socket(&stop).await {
            Ok(socket) => socket,
            Err(e) => {
                stop.cancel();
                return Err(e);
            }
        };

        tokio::spawn(self.inner.clone().supervise(socket, stop));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SignalingError> {
        match lock(&self.inner.session).take() {
            Some(token) => token.cancel(),
            None => debug!("Signaling channel is not running"),
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let running = lock(&self.inner.session)
            .as_ref()
            .is_some_and(|token| !token.is_cancelled());
        running && lock(&self.inner.outbound).is_some()
    }
}

impl ChannelInner {
    fn enqueue(&self, frame: &ChannelFrame) -> Result<(), SignalingError> {
        let outbound = lock(&self.outbound);
        let Some(outbound) = outbound.as_ref() else {
            trace!("Dropping outbound frame, signaling channel not connected");
            return Ok(());
        };

        let text = serde_json::to_string(frame)?;
        let _ = outbound.tx.send(text);
        Ok(())
    }

    fn install_outbound(&self, epoch: u64, tx: mpsc::UnboundedSender<String>) {
        *lock(&self.outbound) = Some(Outbound { epoch, tx });
    }

    /// Clears the sender if it still belongs to `epoch`. A newer session that
    /// already installed its own is left alone.
    fn release_outbound(&self, epoch: u64) -> bool {
        let mut outbound = lock(&self.outbound);
        if outbound.as_ref().is_some_and(|o| o.epoch == epoch) {
            *outbound = None;
            true
        } else {
            false
        }
    }

    fn build_request(&self) -> Result<Request, SignalingError> {
        let mut request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| SignalingError::InvalidUrl(e.to_string()))?;

        if let Some(token) = &self.config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| SignalingError::InvalidToken)?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        Ok(request)
    }

    async fn open_socket(&self, stop: &CancellationToken) -> Result<WsStream, SignalingError> {
        let request = self.build_request()?;
        let connecting = tokio::time::timeout(self.config.connect_timeout(), connect_async(request));

        tokio::select! {
            _ = stop.cancelled() => {
                debug!("Cancelling signaling server connection.");
                Err(SignalingError::Connect("cancelled".to_owned()))
            }
            result = connecting => match result {
                Ok(Ok((socket, _))) => Ok(socket),
                Ok(Err(e)) => Err(SignalingError::Connect(e.to_string())),
                Err(_) => Err(SignalingError::Timeout),
            }
        }
    }

    async fn supervise(self: Arc<Self>, mut socket: WsStream, stop: CancellationToken) {
        loop {
            match self.run_session(socket, &stop).await {
                SessionEnd::Requested => break,
                SessionEnd::Rejected => {
                    stop.cancel();
                    break;
                }
                SessionEnd::Lost => {}
            }

            let mut attempt: u32 = 0;
            socket = loop {
                let delay = self.config.reconnect.delay_for(attempt);
                attempt = attempt.saturating_add(1);

                tokio::select! {
                    _ = stop.cancelled() => {
                        debug!("Reconnect abandoned, channel stopped");
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                match self.open_socket(&stop).await {
                    Ok(socket) => {
                        info!("Signaling server reconnect, attempts: {}", attempt);
                        break socket;
                    }
                    Err(e) => warn!("Reconnect attempt {} failed: {}", attempt, e),
                }
            };
        }
    }

    async fn run_session(&self, socket: WsStream, stop: &CancellationToken) -> SessionEnd {
        let epoch = ConnectionEpoch::new(self.epoch_seq.fetch_add(1, Ordering::SeqCst) + 1);
        let (mut sink, mut stream) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

        self.install_outbound(epoch.id(), out_tx);
        info!("Connected to signaling server {}", self.config.url);
        let _ = self.events_tx.send(SignalingEvent::Connected(epoch.clone()));

        let ready = ChannelFrame::Ready(ReadyAnnouncement {
            peer_id: self.identity.peer_id.clone(),
            peer_type: self.identity.peer_type.clone(),
            room: self.config.room.clone(),
        });
        if let Err(e) = self.enqueue(&ready) {
            error!("Failed to announce ready: {}", e);
        }

        let end = loop {
            tokio::select! {
                _ = stop.cancelled() => break SessionEnd::Requested,

                outgoing = out_rx.recv() => {
                    let Some(text) = outgoing else {
                        break SessionEnd::Lost;
                    };
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        warn!("Failed to write to signaling socket: {}", e);
                        break SessionEnd::Lost;
                    }
                }

                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(end) = self.handle_frame(&text) {
                            break end;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break SessionEnd::Lost,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Signaling server ERROR: {}", e);
                        break SessionEnd::Lost;
                    }
                }
            }
        };

        if !self.release_outbound(epoch.id()) {
            debug!("Session {} ended after a newer one took over", epoch.id());
        }
        epoch.cancel();

        let reason = match end {
            SessionEnd::Requested => DisconnectReason::Requested,
            SessionEnd::Lost => DisconnectReason::Lost,
            SessionEnd::Rejected => DisconnectReason::DuplicateIdentity,
        };
        if !matches!(end, SessionEnd::Lost) {
            // Flush what was queued before the stop, e.g. a leave's close.
            while let Ok(text) = out_rx.try_recv() {
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
        }

        info!("Disconnected from signaling server, reason: {:?}", reason);
        let _ = self.events_tx.send(SignalingEvent::Disconnected(reason));
        end
    }

    fn handle_frame(&self, text: &str) -> Option<SessionEnd> {
        let frame = match serde_json::from_str::<ChannelFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Invalid signaling frame: {}", e);
                return None;
            }
        };

        match frame {
            ChannelFrame::Message(envelope) | ChannelFrame::MessageOne(envelope) => {
                self.deliver(envelope);
                None
            }
            ChannelFrame::UniquenessError(rejection) => {
                error!("Uniqueness ERROR: {}", rejection.message);
                Some(SessionEnd::Rejected)
            }
            ChannelFrame::Ready(_) => {
                debug!("Ignoring ready frame from server");
                None
            }
        }
    }

    fn deliver(&self, envelope: SignalEnvelope) {
        let local = &self.identity.peer_id;
        if &envelope.from == local {
            debug!("Dropping {} echoed back to us", envelope.payload.action());
            return;
        }
        if !envelope.target.is_addressed_to(local) {
            debug!(
                "Dropping {} from {} addressed to {}",
                envelope.payload.action(),
                envelope.from,
                envelope.target
            );
            return;
        }

        trace!("Signaling server message: {:?}", envelope);
        let _ = self.events_tx.send(SignalingEvent::Message(envelope));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
