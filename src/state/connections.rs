use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use crate::error::ServiceError;

/// Handle used to push messages to an attached client.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    pub id: Uuid,
    /// Player the client represents, unregistered when the connection goes away.
    pub player_id: String,
    pub tx: mpsc::Sender<Message>,
}

impl ClientConnection {
    pub fn new(player_id: String, tx: mpsc::Sender<Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            tx,
        }
    }
}

/// Set of attached clients keyed by connection id.
///
/// The registry owns the only long-lived sender of each outbound queue, so removing
/// an entry closes that queue.
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, ClientConnection>,
    admission: Mutex<()>,
    max_connections: Option<usize>,
}

impl ConnectionRegistry {
    pub fn new(max_connections: Option<usize>) -> Self {
        Self {
            connections: DashMap::new(),
            admission: Mutex::new(()),
            max_connections,
        }
    }

    /// Attach a connection unless the lobby cap is reached.
    ///
    /// A refused connection is handed back so the caller can tell the client why.
    pub async fn insert(
        &self,
        connection: ClientConnection,
    ) -> Result<(), (ServiceError, ClientConnection)> {
        let _gate = self.admission.lock().await;
        if let Some(max) = self.max_connections
            && self.connections.len() >= max
        {
            return Err((ServiceError::LobbyFull, connection));
        }
        self.connections.insert(connection.id, connection);
        Ok(())
    }

    pub fn remove(&self, id: Uuid) -> Option<ClientConnection> {
        self.connections.remove(&id).map(|(_, connection)| connection)
    }

    /// Clone out every outbound sender so delivery never holds a map shard across an await.
    pub fn senders(&self) -> Vec<(Uuid, mpsc::Sender<Message>)> {
        self.connections
            .iter()
            .map(|entry| (*entry.key(), entry.tx.clone()))
            .collect()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(player_id: &str) -> (ClientConnection, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(4);
        (ClientConnection::new(player_id.into(), tx), rx)
    }

    #[tokio::test]
    async fn uncapped_registry_accepts_everyone() {
        let registry = ConnectionRegistry::new(None);
        for n in 0..8 {
            let (conn, _rx) = connection(&format!("p{n}"));
            assert!(registry.insert(conn).await.is_ok());
        }
        assert_eq!(registry.len(), 8);
    }

    #[tokio::test]
    async fn capped_registry_refuses_overflow() {
        let registry = ConnectionRegistry::new(Some(1));
        let (first, _rx1) = connection("p1");
        let (second, _rx2) = connection("p2");
        registry.insert(first).await.unwrap();

        let (err, refused) = registry.insert(second).await.unwrap_err();
        assert!(matches!(err, ServiceError::LobbyFull));
        assert_eq!(refused.player_id, "p2");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn removing_closes_the_outbound_queue() {
        let registry = ConnectionRegistry::new(None);
        let (conn, mut rx) = connection("p1");
        let id = conn.id;
        registry.insert(conn).await.unwrap();

        let removed = registry.remove(id).unwrap();
        drop(removed);
        assert!(rx.recv().await.is_none());
        assert!(registry.remove(id).is_none());
    }
}
