use std::time::Duration;

use axum::extract::ws::Message;
use futures::future::join_all;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{MatchStateMessage, NoticeMessage},
    state::{SharedState, events::BroadcastSignal},
};

/// How long a single client may keep the broadcast waiting before it is evicted.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(1);

/// Turn controller signals into messages for every attached client.
///
/// Snapshots are taken when the signal is handled, so a client always receives the
/// state as it is at delivery time, not as it was when the action completed.
pub async fn run(state: SharedState, mut signals: mpsc::Receiver<BroadcastSignal>) {
    while let Some(signal) = signals.recv().await {
        let Some(message) = render(&state, signal).await else {
            continue;
        };
        broadcast(&state, message).await;
    }
    info!("signal channel closed; broadcast loop stopping");
}

async fn render(state: &SharedState, signal: BroadcastSignal) -> Option<Message> {
    let payload = match signal {
        BroadcastSignal::Snapshot => {
            let snapshot = state.game().snapshot().await;
            serde_json::to_string(&MatchStateMessage::from(snapshot))
        }
        BroadcastSignal::Notice(text) => serde_json::to_string(&NoticeMessage::new(text)),
    };

    match payload {
        Ok(payload) => Some(Message::Text(payload.into())),
        Err(err) => {
            warn!(error = %err, "failed to serialize broadcast payload");
            None
        }
    }
}

/// Deliver `message` to every attached client concurrently.
///
/// A client whose queue stays full for [`DELIVERY_TIMEOUT`], or whose queue is
/// closed, is evicted. Returns the evicted connection ids.
pub async fn broadcast(state: &SharedState, message: Message) -> Vec<Uuid> {
    let deliveries = state
        .connections()
        .senders()
        .into_iter()
        .map(|(id, tx)| {
            let message = message.clone();
            async move {
                match tx.send_timeout(message, DELIVERY_TIMEOUT).await {
                    Ok(()) => None,
                    Err(SendTimeoutError::Timeout(_)) => Some((id, "delivery timed out")),
                    Err(SendTimeoutError::Closed(_)) => Some((id, "queue closed")),
                }
            }
        });

    let failed: Vec<_> = join_all(deliveries).await.into_iter().flatten().collect();
    failed
        .into_iter()
        .map(|(id, reason)| {
            info!(connection = %id, reason, "evicting connection");
            evict(state, id);
            id
        })
        .collect()
}

/// Drop a connection and unregister its player without blocking the loop.
///
/// The unregisters go through the action mailbox, whose consumer may itself be
/// waiting on this loop, so they are submitted from a separate task.
fn evict(state: &SharedState, id: Uuid) {
    let Some(player_id) = state.detach(id) else {
        debug!(connection = %id, "connection already gone");
        return;
    };
    let state = state.clone();
    tokio::spawn(async move { state.unregister_everywhere(player_id).await });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::MemoryMatchStore,
        state::{
            AppState, HubReceivers,
            connections::ClientConnection,
            events::MatchAction,
            roster::Side,
        },
    };

    fn state() -> (SharedState, HubReceivers) {
        AppState::new(AppConfig::default(), Arc::new(MemoryMatchStore::new()))
    }

    async fn attach(
        state: &SharedState,
        player_id: &str,
        capacity: usize,
    ) -> (Uuid, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        let connection = ClientConnection::new(player_id.into(), tx);
        let id = connection.id;
        state.connections().insert(connection).await.unwrap();
        (id, rx)
    }

    fn text(message: Message) -> String {
        match message {
            Message::Text(text) => text.as_str().to_owned(),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn every_client_receives_the_message() {
        let (state, _receivers) = state();
        let (_, mut first) = attach(&state, "p1", 4).await;
        let (_, mut second) = attach(&state, "p2", 4).await;

        let evicted = broadcast(&state, Message::Text("hello".into())).await;
        assert!(evicted.is_empty());
        assert_eq!(text(first.recv().await.unwrap()), "hello");
        assert_eq!(text(second.recv().await.unwrap()), "hello");
    }

    #[tokio::test]
    async fn stalled_client_is_evicted_and_unregistered() {
        let (state, mut receivers) = state();
        let (stalled_id, _stalled_rx) = attach(&state, "p1", 1).await;
        let (healthy_id, mut healthy) = attach(&state, "p2", 4).await;

        broadcast(&state, Message::Text("first".into())).await;
        let evicted = broadcast(&state, Message::Text("second".into())).await;

        assert_eq!(evicted, vec![stalled_id]);
        assert!(!state.connections().contains(stalled_id));
        assert!(state.connections().contains(healthy_id));
        assert_eq!(text(healthy.recv().await.unwrap()), "first");
        assert_eq!(text(healthy.recv().await.unwrap()), "second");

        for side in Side::ALL {
            assert_eq!(
                receivers.actions.recv().await,
                Some(MatchAction::Unregister {
                    side,
                    player_id: "p1".into()
                })
            );
        }
    }

    #[tokio::test]
    async fn closed_queue_is_evicted_without_waiting() {
        let (state, _receivers) = state();
        let (id, rx) = attach(&state, "p1", 4).await;
        drop(rx);

        let started = tokio::time::Instant::now();
        let evicted = broadcast(&state, Message::Text("hello".into())).await;
        assert_eq!(evicted, vec![id]);
        assert!(started.elapsed() < DELIVERY_TIMEOUT);
        assert!(state.connections().is_empty());
    }

    #[tokio::test]
    async fn snapshot_signal_renders_the_current_state() {
        let (state, _receivers) = state();
        let message = render(&state, BroadcastSignal::Snapshot).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text(message)).unwrap();
        assert_eq!(value["game_started"], false);
        assert!(value["black_player_1"].is_null());

        let message = render(&state, BroadcastSignal::Notice("Game Over".into()))
            .await
            .unwrap();
        assert_eq!(text(message), r#"{"error":"Game Over"}"#);
    }
}
