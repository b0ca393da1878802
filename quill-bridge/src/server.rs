use crate::bridge::BridgeHandle;
use crate::config::ListenConfig;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{Html, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use quill_common::{BridgeError, ServerMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const PAGE: &str = include_str!("../static/index.html");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A running bridge listener.
pub struct ListenerHandle {
    addr: SocketAddr,
    bridge: BridgeHandle,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn bridge(&self) -> &BridgeHandle {
        &self.bridge
    }

    /// Address a browser on this machine can open.
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.addr.port())
    }

    /// Close the active client socket, stop accepting connections and wait
    /// for the server task to finish.
    pub async fn shutdown(self) {
        if self.bridge.disconnect() {
            info!("bridge: closing active client");
        }
        let _ = self.shutdown_tx.send(());
        let abort = self.task.abort_handle();
        if tokio::time::timeout(SHUTDOWN_GRACE, self.task).await.is_err() {
            warn!("bridge: server did not stop within {SHUTDOWN_GRACE:?}, aborting");
            abort.abort();
        }
    }
}

pub fn build_router(bridge: BridgeHandle) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_upgrade))
        .with_state(bridge)
}

/// Bind the listener and start serving the page and the websocket.
pub async fn open_channel(config: &ListenConfig) -> Result<ListenerHandle, BridgeError> {
    let listener = TcpListener::bind(config.listen_addr()).await?;
    let addr = listener.local_addr()?;
    let bridge = BridgeHandle::new();
    let app = build_router(bridge.clone());
    info!("bridge: listening on http://{addr}");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let stop = async {
            shutdown_rx.await.ok();
        };
        if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(stop).await {
            error!("bridge: server error: {e}");
        }
        info!("bridge: listener on {addr} stopped");
    });

    Ok(ListenerHandle {
        addr,
        bridge,
        shutdown_tx,
        task,
    })
}

async fn index() -> Html<&'static str> {
    Html(PAGE)
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(bridge): State<BridgeHandle>) -> Response {
    ws.on_upgrade(move |socket| async move {
        let session_id = Uuid::new_v4();
        info!("bridge: client session {session_id} connected");
        if let Err(e) = handle_socket(socket, &bridge, session_id).await {
            warn!("bridge: session {session_id} error: {e}");
        }
        bridge.unregister_connection(session_id);
        info!("bridge: client session {session_id} disconnected");
    })
}

async fn handle_socket(
    socket: WebSocket,
    bridge: &BridgeHandle,
    session_id: Uuid,
) -> Result<(), BridgeError> {
    let (mut sink, mut stream) = socket.split();
    let mut questions = bridge.register_connection(session_id);
    send_message(&mut sink, &ServerMessage::greeting()).await?;

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("bridge: answer from {session_id}: {}", text.as_str());
                        bridge.record_answer(text.as_str());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => return Err(BridgeError::WebSocket(e.to_string())),
                    _ => {}
                }
            }
            changed = questions.changed() => {
                // Sender gone: a newer client took over, or the bridge is
                // shutting down.
                if changed.is_err() {
                    debug!("bridge: session {session_id} released");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                let question = questions.borrow_and_update().clone();
                if let Some(question) = question {
                    send_message(&mut sink, &ServerMessage::question(question)).await?;
                }
            }
        }
    }

    Ok(())
}

async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), BridgeError> {
    let json = serde_json::to_string(msg)?;
    sink.send(Message::Text(json.into()))
        .await
        .map_err(|e| BridgeError::WebSocket(e.to_string()))
}
