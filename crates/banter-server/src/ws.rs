//! WebSocket endpoint handing each connection to its own relay.

use async_trait::async_trait;
use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use banter_relay::{
    Channel, ChannelClosed, ClientRequest, Conversation, KeepRecent, Relay, Reply,
};

use crate::state::AppState;

/// Close reasons are capped at 123 bytes on the wire.
const CLOSE_REASON_MAX: usize = 123;

/// WebSocket upgrade handler.
///
/// GET /chat
pub async fn chat_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one relay for the lifetime of one connection.
///
/// The socket is split: the relay reads requests from the receive half
/// through a [`SocketChannel`] and queues replies on a channel drained by a
/// spawned writer task, so delivery never blocks on the relay itself.
async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("client connected");
    let (sender, receiver) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<Message>(32);
    let writer = tokio::spawn(write_loop(sender, out_rx));

    let channel = SocketChannel {
        inbound: receiver,
        outbound: out_tx.clone(),
    };
    let mut relay = Relay::new(channel, state.transport, state.relay);
    if let Some(limit) = state.history_limit {
        relay = relay.with_conversation(Conversation::with_policy(KeepRecent(limit)));
    }

    match relay.run().await {
        Ok(()) => debug!("relay finished"),
        Err(err) => {
            warn!(error = %err, "relay aborted");
            let frame = CloseFrame {
                code: close_code::ERROR,
                reason: close_reason(&err.to_string()),
            };
            // Best effort; the client may already be gone.
            let _ = out_tx.send(Message::Close(Some(frame))).await;
        }
    }

    // Drop every sender so the writer drains and exits.
    drop(relay);
    drop(out_tx);
    let _ = writer.await;
    info!("client disconnected");
}

async fn write_loop(mut sender: SplitSink<WebSocket, Message>, mut replies: mpsc::Receiver<Message>) {
    while let Some(message) = replies.recv().await {
        let closing = matches!(message, Message::Close(_));
        if sender.send(message).await.is_err() {
            break;
        }
        if closing {
            break;
        }
    }
}

/// Relay-facing view of one WebSocket connection.
struct SocketChannel {
    inbound: SplitStream<WebSocket>,
    outbound: mpsc::Sender<Message>,
}

#[async_trait]
impl Channel for SocketChannel {
    async fn recv(&mut self) -> Option<ClientRequest> {
        while let Some(message) = self.inbound.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str(text.as_str()) {
                    Ok(request) => return Some(request),
                    Err(err) => {
                        // An unreadable request ends the conversation.
                        warn!(error = %err, "bad request payload");
                        return None;
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("client closed the socket");
                    return None;
                }
                Ok(_) => {
                    // Ping/pong and binary frames carry no requests.
                    continue;
                }
                Err(err) => {
                    debug!(error = %err, "socket receive failed");
                    return None;
                }
            }
        }
        None
    }

    async fn send(&mut self, reply: Reply) -> Result<(), ChannelClosed> {
        let payload = match serde_json::to_string(&reply) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "could not encode reply");
                return Ok(());
            }
        };
        self.outbound
            .send(Message::Text(payload.into()))
            .await
            .map_err(|_| ChannelClosed)
    }
}

fn close_reason(message: &str) -> Utf8Bytes {
    if message.len() <= CLOSE_REASON_MAX {
        return Utf8Bytes::from(message.to_string());
    }
    let mut end = CLOSE_REASON_MAX;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    Utf8Bytes::from(message[..end].to_string())
}
