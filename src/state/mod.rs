pub mod connections;
pub mod events;
pub mod match_state;
pub mod roster;

use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::match_store::MatchStore,
    dto::ws::NoticeMessage,
    error::ServiceError,
    state::{
        connections::{ClientConnection, ConnectionRegistry},
        events::{BroadcastSignal, MatchAction},
        match_state::MatchState,
        roster::Side,
    },
};

pub type SharedState = Arc<AppState>;

/// Capacity of the inbound action mailbox: one action in flight at a time.
pub const ACTION_MAILBOX_CAPACITY: usize = 1;
/// Capacity of the controller → broadcast loop signal channel.
pub const SIGNAL_CHANNEL_CAPACITY: usize = 1;

/// Receiving ends of the hub channels, handed to the controller and broadcast tasks.
pub struct HubReceivers {
    pub actions: mpsc::Receiver<MatchAction>,
    pub signals: mpsc::Receiver<BroadcastSignal>,
}

/// Central application state: the match aggregate, attached clients and the store.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn MatchStore>,
    game: Arc<MatchState>,
    connections: ConnectionRegistry,
    actions: mpsc::Sender<MatchAction>,
    signals: mpsc::Sender<BroadcastSignal>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Build the shared state around an injected store.
    ///
    /// The match starts empty. Nothing processes actions until the returned receivers
    /// are handed to [`crate::services::hub::spawn`].
    pub fn new(config: AppConfig, store: Arc<dyn MatchStore>) -> (SharedState, HubReceivers) {
        let (actions_tx, actions_rx) = mpsc::channel(ACTION_MAILBOX_CAPACITY);
        let (signals_tx, signals_rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        let (degraded_tx, _rx) = watch::channel(false);

        let state = Arc::new(Self {
            connections: ConnectionRegistry::new(config.max_connections()),
            config,
            store,
            game: Arc::new(MatchState::new()),
            actions: actions_tx,
            signals: signals_tx,
            degraded: degraded_tx,
        });

        let receivers = HubReceivers {
            actions: actions_rx,
            signals: signals_rx,
        };
        (state, receivers)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn MatchStore> {
        self.store.clone()
    }

    pub fn game(&self) -> Arc<MatchState> {
        self.game.clone()
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Sender used by the controller to wake the broadcast loop.
    pub fn signals(&self) -> mpsc::Sender<BroadcastSignal> {
        self.signals.clone()
    }

    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying watchers only on change.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Queue an action for the controller, waiting while the mailbox is full.
    pub async fn submit(&self, action: MatchAction) {
        if self.actions.send(action).await.is_err() {
            warn!("match controller stopped; dropping action");
        }
    }

    /// Attach a client and push the current state to everyone, the newcomer included.
    ///
    /// When the lobby is full the client only receives a "Lobby full" notice and its
    /// queue is closed.
    pub async fn add_connection(&self, connection: ClientConnection) -> Result<(), ServiceError> {
        let player_id = connection.player_id.clone();
        match self.connections.insert(connection).await {
            Ok(()) => {
                info!(sub = %player_id, total = self.connections.len(), "connection attached");
                if self.signals.send(BroadcastSignal::Snapshot).await.is_err() {
                    warn!("broadcast loop stopped; new connection gets no snapshot");
                }
                Ok(())
            }
            Err((err, refused)) => {
                info!(sub = %player_id, "lobby full; refusing connection");
                if let Ok(payload) = serde_json::to_string(&NoticeMessage::new(err.to_string())) {
                    let _ = refused.tx.try_send(Message::Text(payload.into()));
                }
                Err(err)
            }
        }
    }

    /// Detach a client, closing its queue, and unregister its player from both sides.
    pub async fn remove_connection(&self, id: Uuid) {
        if let Some(player_id) = self.detach(id) {
            self.unregister_everywhere(player_id).await;
        }
    }

    /// Remove a client from the registry, returning the player it represented.
    ///
    /// Returns `None` if the connection was already gone.
    pub fn detach(&self, id: Uuid) -> Option<String> {
        let connection = self.connections.remove(id)?;
        info!(sub = %connection.player_id, total = self.connections.len(), "connection detached");
        Some(connection.player_id)
    }

    /// Submit the implicit unregisters that follow a detach.
    pub async fn unregister_everywhere(&self, player_id: String) {
        for side in Side::ALL {
            self.submit(MatchAction::Unregister {
                side,
                player_id: player_id.clone(),
            })
            .await;
        }
    }
}
