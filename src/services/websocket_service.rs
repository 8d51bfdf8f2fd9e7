use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::state::SharedState;

/// Handle the full lifecycle for an individual viewer WebSocket connection.
///
/// The socket is split immediately: a dedicated writer task drains an
/// unbounded channel so the broadcast engine never awaits this socket, and
/// the read half only services the liveness protocol.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = state.broadcast().register(outbound_tx.clone()).await;

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Pong(_)) => {
                state.broadcast().mark_alive(connection_id);
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            // The viewer stream is one-way; inbound app frames are ignored.
            Ok(Message::Text(text)) => {
                debug!(connection_id = %connection_id, payload = %text, "ignoring inbound text frame");
            }
            Ok(Message::Binary(_)) => {}
            Err(err) => {
                warn!(connection_id = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.broadcast().deregister(connection_id);

    finalize(writer_task, outbound_tx).await;
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
