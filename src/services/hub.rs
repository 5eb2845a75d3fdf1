use tokio::task::JoinHandle;

use crate::{
    services::{broadcast_service, match_controller::MatchController},
    state::{HubReceivers, SharedState},
};

/// Background tasks driving the match.
pub struct HubTasks {
    pub controller: JoinHandle<()>,
    pub broadcast: JoinHandle<()>,
}

/// Start the match controller and the broadcast loop on the receivers created with
/// the shared state.
pub fn spawn(state: &SharedState, receivers: HubReceivers) -> HubTasks {
    let HubReceivers { actions, signals } = receivers;
    let controller = MatchController::from_state(state);

    HubTasks {
        controller: tokio::spawn(controller.run(actions)),
        broadcast: tokio::spawn(broadcast_service::run(state.clone(), signals)),
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::extract::ws::Message;
    use serde_json::Value;
    use tokio::{sync::mpsc, time::timeout};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            match_store::{MatchStore, MemoryMatchStore},
            models::NewTeamEntity,
        },
        state::{
            AppState,
            connections::ClientConnection,
            events::MatchAction,
            roster::Side,
        },
    };

    struct Client {
        id: uuid::Uuid,
        rx: mpsc::Receiver<Message>,
    }

    impl Client {
        async fn next(&mut self) -> Value {
            let message = timeout(Duration::from_secs(2), self.rx.recv())
                .await
                .expect("message within deadline")
                .expect("queue open");
            match message {
                Message::Text(text) => serde_json::from_str(&text).unwrap(),
                other => panic!("unexpected message {other:?}"),
            }
        }

        /// Skip messages until one satisfies `predicate`.
        async fn until(&mut self, predicate: impl Fn(&Value) -> bool) -> Value {
            loop {
                let value = self.next().await;
                if predicate(&value) {
                    return value;
                }
            }
        }
    }

    async fn attach(state: &SharedState, player_id: &str) -> Client {
        let (tx, rx) = mpsc::channel(state.config().outbound_queue_capacity());
        let connection = ClientConnection::new(player_id.into(), tx);
        let id = connection.id;
        state.add_connection(connection).await.unwrap();
        Client { id, rx }
    }

    async fn seeded_store() -> MemoryMatchStore {
        let store = MemoryMatchStore::new();
        for id in ["b1", "b2", "y1", "y2"] {
            store.insert_player(id, format!("https://pics/{id}.png"));
        }
        for (city, name, p1, p2) in [
            ("Metro", "Falcons", "b1", "b2"),
            ("Harbor", "Owls", "y1", "y2"),
        ] {
            store
                .create_team(NewTeamEntity {
                    city: city.into(),
                    name: name.into(),
                    player1: p1.into(),
                    player2: p2.into(),
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn attaching_pushes_the_current_state() {
        let (state, receivers) =
            AppState::new(AppConfig::default(), Arc::new(MemoryMatchStore::new()));
        let _tasks = spawn(&state, receivers);

        let mut client = attach(&state, "b1").await;
        let value = client.next().await;
        assert_eq!(value["game_started"], false);
        assert!(value["yellow_team"].is_null());
    }

    #[tokio::test]
    async fn full_match_ends_with_a_game_over_notice_then_empty_state() {
        let store = seeded_store().await;
        let (state, receivers) = AppState::new(AppConfig::default(), Arc::new(store.clone()));
        let _tasks = spawn(&state, receivers);
        let mut client = attach(&state, "b1").await;

        for (side, id) in [
            (Side::Black, "b1"),
            (Side::Black, "b2"),
            (Side::Yellow, "y1"),
            (Side::Yellow, "y2"),
        ] {
            state
                .submit(MatchAction::Register {
                    side,
                    player_id: id.into(),
                })
                .await;
            state
                .submit(MatchAction::Confirm {
                    side,
                    player_id: id.into(),
                })
                .await;
        }
        let started = client.until(|value| value["game_started"] == true).await;
        assert_eq!(started["black_team"]["name"], "Falcons");
        assert_eq!(started["yellow_team"]["name"], "Owls");

        for _ in 0..5 {
            state
                .submit(MatchAction::Goal {
                    player_id: "y1".into(),
                })
                .await;
        }
        let notice = client.until(|value| value.get("error").is_some()).await;
        assert_eq!(notice["error"], "Game Over");

        let after = client.next().await;
        assert_eq!(after["game_started"], false);
        assert_eq!(after["yellow_score"], 0);
        assert!(after["yellow_player_1"].is_null());
        assert_eq!(store.finalize_calls(), 1);
    }

    #[tokio::test]
    async fn disconnecting_mid_game_resets_the_match() {
        let store = seeded_store().await;
        let (state, receivers) = AppState::new(AppConfig::default(), Arc::new(store));
        let _tasks = spawn(&state, receivers);
        let leaver = attach(&state, "b2").await;
        let mut watcher = attach(&state, "y1").await;

        for (side, id) in [
            (Side::Black, "b1"),
            (Side::Black, "b2"),
            (Side::Yellow, "y1"),
            (Side::Yellow, "y2"),
        ] {
            state
                .submit(MatchAction::Register {
                    side,
                    player_id: id.into(),
                })
                .await;
            state
                .submit(MatchAction::Confirm {
                    side,
                    player_id: id.into(),
                })
                .await;
        }
        watcher.until(|value| value["game_started"] == true).await;

        state.remove_connection(leaver.id).await;
        let notice = watcher.until(|value| value.get("error").is_some()).await;
        assert_eq!(notice["error"], "Player left mid-game");
        let after = watcher.next().await;
        assert_eq!(after["game_started"], false);
        assert!(after["black_player_2"].is_null());
    }

    #[tokio::test]
    async fn lobby_cap_refuses_with_a_notice() {
        let config = AppConfig::default().with_max_connections(Some(1));
        let (state, receivers) = AppState::new(config, Arc::new(MemoryMatchStore::new()));
        let _tasks = spawn(&state, receivers);
        let _first = attach(&state, "b1").await;

        let (tx, mut rx) = mpsc::channel(4);
        let refused = state.add_connection(ClientConnection::new("b2".into(), tx)).await;
        assert!(refused.is_err());
        match rx.recv().await {
            Some(Message::Text(text)) => assert_eq!(text.as_str(), r#"{"error":"Lobby full"}"#),
            other => panic!("unexpected message {other:?}"),
        }
        assert!(rx.recv().await.is_none());
        assert_eq!(state.connections().len(), 1);
    }
}
