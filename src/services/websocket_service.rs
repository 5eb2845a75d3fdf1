use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    dto::ws::parse_action,
    state::{SharedState, connections::ClientConnection},
};

/// Handle the full lifecycle of a client WebSocket representing `player_id`.
///
/// Inbound text frames are parsed into actions and queued for the controller.
/// Outbound messages come from the broadcast loop through the connection's queue;
/// when the registry drops that queue (eviction or refusal) the session ends.
pub async fn handle_socket(state: SharedState, socket: WebSocket, player_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) =
        mpsc::channel::<Message>(state.config().outbound_queue_capacity());

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let mut writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let connection = ClientConnection::new(player_id.clone(), outbound_tx);
    let connection_id = connection.id;
    if state.add_connection(connection).await.is_err() {
        let _ = writer_task.await;
        return;
    }

    let writer_finished = loop {
        tokio::select! {
            _ = &mut writer_task => {
                info!(sub = %player_id, "outbound queue closed; ending session");
                break true;
            }
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => match parse_action(&text) {
                    Ok(action) => state.submit(action).await,
                    Err(err) => {
                        debug!(sub = %player_id, error = %err, "dropping malformed message")
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!(sub = %player_id, "client closed");
                    break false;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(sub = %player_id, error = %err, "websocket error");
                    break false;
                }
            }
        }
    };

    state.remove_connection(connection_id).await;
    if !writer_finished {
        let _ = writer_task.await;
    }
}
