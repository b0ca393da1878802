use anyhow::Result;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use quill_common::ServerMessage;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events the socket task reports to the TUI
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    Connected,
    Question(String),
    Disconnected(Option<String>),
}

/// Why the session loop stopped
enum SessionEnd {
    /// The socket closed; the reason is set when it failed rather than closed.
    Closed(Option<String>),
    /// Nobody is listening for inbound events anymore.
    ViewerGone,
}

/// Connect to `url` and relay frames until the socket ends.
///
/// Questions arrive as `{question}` frames and go to `inbound_tx`. Answers
/// from `outbound_rx` go out as raw text frames. Unless the TUI has already
/// gone away, the last event sent is always [`Inbound::Disconnected`].
pub async fn run(
    url: &str,
    mut outbound_rx: mpsc::Receiver<String>,
    inbound_tx: mpsc::Sender<Inbound>,
) -> Result<()> {
    let ws = match tokio_tungstenite::connect_async(url).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            let _ = inbound_tx.send(Inbound::Disconnected(Some(e.to_string()))).await;
            return Err(e.into());
        }
    };
    info!("Connected to {url}");
    if inbound_tx.send(Inbound::Connected).await.is_err() {
        return Ok(());
    }

    let (mut sink, mut stream) = ws.split();
    match session(&mut sink, &mut stream, &mut outbound_rx, &inbound_tx).await {
        SessionEnd::Closed(reason) => {
            let _ = inbound_tx.send(Inbound::Disconnected(reason)).await;
        }
        SessionEnd::ViewerGone => debug!("TUI closed, stopping WS"),
    }
    Ok(())
}

async fn session(
    sink: &mut SplitSink<Socket, Message>,
    stream: &mut SplitStream<Socket>,
    outbound_rx: &mut mpsc::Receiver<String>,
    inbound_tx: &mpsc::Sender<Inbound>,
) -> SessionEnd {
    loop {
        tokio::select! {
            frame = stream.next() => {
                let reply = match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(msg) => {
                                if inbound_tx.send(Inbound::Question(msg.question)).await.is_err() {
                                    return SessionEnd::ViewerGone;
                                }
                            }
                            Err(e) => warn!("Ignoring malformed frame: {e}"),
                        }
                        None
                    }
                    Some(Ok(Message::Ping(data))) => Some(Message::Pong(data)),
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Closed(None),
                    Some(Err(e)) => {
                        warn!("WS error: {e}");
                        return SessionEnd::Closed(Some(e.to_string()));
                    }
                    _ => None,
                };
                if let Some(reply) = reply {
                    if let Err(e) = sink.send(reply).await {
                        return SessionEnd::Closed(Some(e.to_string()));
                    }
                }
            }
            Some(answer) = outbound_rx.recv() => {
                if let Err(e) = sink.send(Message::Text(answer)).await {
                    warn!("Could not send answer: {e}");
                    return SessionEnd::Closed(Some(e.to_string()));
                }
            }
        }
    }
}
