use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};

use crate::models::MatchView;

/// Events pushed to connected clients. Serialized with a `type` tag so the
/// browser can switch on it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        session_id: String,
    },
    MatchFound {
        match_id: String,
        opponent: String,
        game: MatchView,
    },
    GameState {
        game: MatchView,
    },
    GameMove {
        match_id: String,
        player: String,
        position: u8,
        mark: String,
        game: MatchView,
    },
    GameStarted {
        match_id: String,
        game: MatchView,
    },
    GameEnded {
        match_id: String,
        winner: Option<String>,
        draw: bool,
        payout_tx: Option<String>,
        game: MatchView,
    },
    Error {
        code: String,
        message: String,
    },
}

struct Connection {
    tx: mpsc::UnboundedSender<ServerEvent>,
    player: Option<String>,
    match_id: Option<String>,
}

/// Connection and room bookkeeping for the realtime channel. Holds only
/// transient associations; match state always lives in the registry.
pub struct SessionGateway {
    connections: RwLock<HashMap<String, Connection>>,
    rooms: RwLock<HashMap<String, HashSet<String>>>,
}

impl SessionGateway {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a fresh connection and hands back its id plus the event
    /// stream the socket task should forward.
    pub async fn register(&self) -> (String, mpsc::UnboundedReceiver<ServerEvent>) {
        let session_id = hex::encode(rand::random::<[u8; 16]>());
        let (tx, rx) = mpsc::unbounded_channel();
        let mut connections = self.connections.write().await;
        connections.insert(
            session_id.clone(),
            Connection {
                tx,
                player: None,
                match_id: None,
            },
        );
        (session_id, rx)
    }

    /// Drops the connection and its room membership. Returns the player
    /// address that was associated, so the caller can cascade into
    /// matchmaking cleanup.
    pub async fn unregister(&self, session_id: &str) -> Option<String> {
        let connection = {
            let mut connections = self.connections.write().await;
            connections.remove(session_id)?
        };
        if let Some(match_id) = &connection.match_id {
            let mut rooms = self.rooms.write().await;
            if let Some(members) = rooms.get_mut(match_id) {
                members.remove(session_id);
                if members.is_empty() {
                    rooms.remove(match_id);
                }
            }
        }
        connection.player
    }

    /// Adds the connection to the match room and records who it speaks for.
    pub async fn join_room(&self, session_id: &str, match_id: &str, player: &str) -> bool {
        let mut connections = self.connections.write().await;
        let Some(connection) = connections.get_mut(session_id) else {
            return false;
        };
        connection.player = Some(player.to_string());
        connection.match_id = Some(match_id.to_string());
        drop(connections);

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(match_id.to_string())
            .or_default()
            .insert(session_id.to_string());
        tracing::info!("{} joined game room {}", player, match_id);
        true
    }

    /// Delivers an event to every connection in the match's room.
    pub async fn broadcast_room(&self, match_id: &str, event: ServerEvent) {
        let members = {
            let rooms = self.rooms.read().await;
            match rooms.get(match_id) {
                Some(members) => members.iter().cloned().collect::<Vec<_>>(),
                None => return,
            }
        };
        let connections = self.connections.read().await;
        for session_id in members {
            if let Some(connection) = connections.get(&session_id) {
                let _ = connection.tx.send(event.clone());
            }
        }
    }

    /// Delivers an event to one connection only.
    pub async fn notify_session(&self, session_id: &str, event: ServerEvent) -> bool {
        let connections = self.connections.read().await;
        match connections.get(session_id) {
            Some(connection) => connection.tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Tears down a room once its match has been retired.
    pub async fn close_room(&self, match_id: &str) {
        let members = {
            let mut rooms = self.rooms.write().await;
            rooms.remove(match_id).unwrap_or_default()
        };
        let mut connections = self.connections.write().await;
        for session_id in members {
            if let Some(connection) = connections.get_mut(&session_id) {
                if connection.match_id.as_deref() == Some(match_id) {
                    connection.match_id = None;
                }
            }
        }
    }

    pub async fn connected_sessions(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for SessionGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_event() -> ServerEvent {
        ServerEvent::Connected {
            session_id: "s".to_string(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_room_member() {
        let gateway = SessionGateway::new();
        let (id_a, mut rx_a) = gateway.register().await;
        let (id_b, mut rx_b) = gateway.register().await;
        let (_id_c, mut rx_c) = gateway.register().await;

        gateway.join_room(&id_a, "match_1", "0xaa").await;
        gateway.join_room(&id_b, "match_1", "0xbb").await;

        gateway.broadcast_room("match_1", connected_event()).await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn notify_session_targets_one_connection() {
        let gateway = SessionGateway::new();
        let (id_a, mut rx_a) = gateway.register().await;
        let (_id_b, mut rx_b) = gateway.register().await;

        assert!(gateway.notify_session(&id_a, connected_event()).await);
        assert!(!gateway.notify_session("missing", connected_event()).await);

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_returns_player_and_empties_room() {
        let gateway = SessionGateway::new();
        let (id, _rx) = gateway.register().await;
        gateway.join_room(&id, "match_1", "0xaa").await;

        let player = gateway.unregister(&id).await;
        assert_eq!(player.as_deref(), Some("0xaa"));
        assert_eq!(gateway.room_count().await, 0);
        assert_eq!(gateway.connected_sessions().await, 0);
        assert!(gateway.unregister(&id).await.is_none());
    }

    #[tokio::test]
    async fn close_room_clears_associations_but_keeps_connections() {
        let gateway = SessionGateway::new();
        let (id, mut rx) = gateway.register().await;
        gateway.join_room(&id, "match_1", "0xaa").await;

        gateway.close_room("match_1").await;
        assert_eq!(gateway.room_count().await, 0);
        assert_eq!(gateway.connected_sessions().await, 1);

        // No longer in the room, so broadcasts stop arriving.
        gateway.broadcast_room("match_1", connected_event()).await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&connected_event()).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"session_id\":\"s\""));
    }
}
