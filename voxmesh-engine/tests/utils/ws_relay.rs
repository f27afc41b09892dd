use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use voxmesh_core::{ChannelFrame, PeerId, UniquenessRejection};

struct Client {
    tx: mpsc::UnboundedSender<String>,
    kick: CancellationToken,
}

#[derive(Clone, Default)]
struct RelayShared {
    token: String,
    clients: Arc<Mutex<HashMap<PeerId, Client>>>,
    connections: Arc<AtomicUsize>,
    frames: Arc<Mutex<Vec<ChannelFrame>>>,
}

/// Minimal relay server: checks the bearer token, enforces unique ids and
/// forwards every envelope to every client, the sender included.
pub struct WsRelay {
    pub url: String,
    shared: RelayShared,
    task: JoinHandle<()>,
}

impl WsRelay {
    pub async fn start(token: &str) -> Self {
        let shared = RelayShared {
            token: token.to_owned(),
            ..Default::default()
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind relay listener");
        let addr = listener.local_addr().expect("Relay has no local address");

        let app = Router::new()
            .route("/ws", get(ws_handler))
            .with_state(shared.clone());
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("Relay server stopped: {}", e);
            }
        });

        Self {
            url: format!("ws://{addr}/ws"),
            shared,
            task,
        }
    }

    /// Upgrades accepted so far.
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> Vec<ChannelFrame> {
        self.shared.frames.lock().unwrap().clone()
    }

    pub fn ready_count(&self, peer_id: &str) -> usize {
        self.frames()
            .iter()
            .filter(|f| matches!(f, ChannelFrame::Ready(r) if r.peer_id.as_str() == peer_id))
            .count()
    }

    pub fn is_registered(&self, peer_id: &str) -> bool {
        self.shared
            .clients
            .lock()
            .unwrap()
            .contains_key(&PeerId::from(peer_id))
    }

    /// Pushes a frame to one client.
    pub fn push(&self, peer_id: &str, frame: &ChannelFrame) {
        let text = serde_json::to_string(frame).unwrap();
        if let Some(client) = self.shared.clients.lock().unwrap().get(&PeerId::from(peer_id)) {
            let _ = client.tx.send(text);
        }
    }

    /// Drops a client's socket from the server side.
    pub fn kick(&self, peer_id: &str) {
        let removed = self
            .shared
            .clients
            .lock()
            .unwrap()
            .remove(&PeerId::from(peer_id));
        if let Some(client) = removed {
            client.kick.cancel();
        }
    }
}

impl Drop for WsRelay {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(shared): State<RelayShared>,
) -> Response {
    let expected = format!("Bearer {}", shared.token);
    let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if presented != Some(expected.as_str()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    shared.connections.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| handle_socket(socket, shared))
}

async fn handle_socket(socket: WebSocket, shared: RelayShared) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let kick = CancellationToken::new();

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let mut recv_task = tokio::spawn({
        let shared = shared.clone();
        let kick = kick.clone();

        async move {
            let mut registered: Option<PeerId> = None;

            while let Some(Ok(msg)) = receiver.next().await {
                let text = match msg {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };
                let Ok(frame) = serde_json::from_str::<ChannelFrame>(text.as_str()) else {
                    warn!("[WsRelay] invalid frame: {}", text.as_str());
                    continue;
                };
                shared.frames.lock().unwrap().push(frame.clone());

                match frame {
                    ChannelFrame::Ready(ready) => {
                        let mut clients = shared.clients.lock().unwrap();
                        if clients.contains_key(&ready.peer_id) {
                            let reject = ChannelFrame::UniquenessError(UniquenessRejection {
                                message: format!("{} is already connected", ready.peer_id),
                            });
                            let _ = tx.send(serde_json::to_string(&reject).unwrap());
                        } else {
                            info!("[WsRelay] {} is ready", ready.peer_id);
                            let client = Client {
                                tx: tx.clone(),
                                kick: kick.clone(),
                            };
                            clients.insert(ready.peer_id.clone(), client);
                            registered = Some(ready.peer_id);
                        }
                    }
                    ChannelFrame::Message(envelope) | ChannelFrame::MessageOne(envelope) => {
                        let inbound = serde_json::to_string(&ChannelFrame::Message(envelope)).unwrap();
                        for client in shared.clients.lock().unwrap().values() {
                            let _ = client.tx.send(inbound.clone());
                        }
                    }
                    ChannelFrame::UniquenessError(_) => {}
                }
            }

            registered
        }
    });

    tokio::select! {
        _ = kick.cancelled() => {
            send_task.abort();
            recv_task.abort();
        }
        _ = (&mut send_task) => recv_task.abort(),
        registered = (&mut recv_task) => {
            if let Ok(Some(peer_id)) = registered {
                shared.clients.lock().unwrap().remove(&peer_id);
            }
            send_task.abort();
        }
    };
}
