use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{interval, timeout, Duration};

use crate::{
    api::AppState,
    constants::{WS_CLIENT_TIMEOUT_SECS, WS_HEARTBEAT_INTERVAL_SECS},
    error::AppError,
    services::ServerEvent,
};

/// Messages clients push over the socket. Everything else the client needs
/// (queueing, moves) goes over HTTP.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    JoinGame {
        match_id: String,
        player: String,
    },
    PlayerStaked {
        match_id: String,
        player: String,
        tx_hash: String,
    },
}

fn error_event(error: &AppError) -> ServerEvent {
    ServerEvent::Error {
        code: error.code().to_string(),
        message: error.to_string(),
    }
}

/// WebSocket handler for the realtime game channel
pub async fn handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (session_id, mut rx) = state.sessions.register().await;
    tracing::info!("Player connected: {}", session_id);

    let connected = serde_json::to_string(&ServerEvent::Connected {
        session_id: session_id.clone(),
    })
    .unwrap_or_default();
    let _ = sender.send(Message::Text(connected.into())).await;

    // Forward registry/gateway events to the client.
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = interval(Duration::from_secs(WS_HEARTBEAT_INTERVAL_SECS));

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                event = rx.recv() => {
                    match event {
                        Some(event) => {
                            let json = serde_json::to_string(&event).unwrap_or_default();
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }
    });

    let recv_state = state.clone();
    let recv_session = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            let next_msg =
                timeout(Duration::from_secs(WS_CLIENT_TIMEOUT_SECS), receiver.next()).await;
            let msg = match next_msg {
                Ok(Some(Ok(msg))) => msg,
                Ok(Some(Err(_))) | Ok(None) => break,
                Err(_) => {
                    tracing::info!("WebSocket client timeout: {}", recv_session);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_client_message(&recv_state, &recv_session, &text).await;
                }
                Message::Close(_) => {
                    tracing::info!("Client disconnected: {}", recv_session);
                    break;
                }
                Message::Ping(_) => {
                    tracing::debug!("Ping received");
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    // Disconnect cascade: drop the session, then pull the player out of
    // matchmaking so nobody pairs against a gone socket.
    let player = state.sessions.unregister(&session_id).await;
    state.matchmaking.remove_session(&session_id).await;
    if let Some(player) = player {
        state.matchmaking.leave(&player).await;
    }
    tracing::info!("WebSocket connection closed: {}", session_id);
}

async fn handle_client_message(state: &AppState, session_id: &str, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(_) => {
            tracing::debug!("Unparseable client message: {}", text);
            let error = AppError::InvalidInput("Unrecognized message".to_string());
            state
                .sessions
                .notify_session(session_id, error_event(&error))
                .await;
            return;
        }
    };

    match message {
        ClientMessage::JoinGame { match_id, player } => {
            // Room membership only for matches that exist; a room for a
            // bogus id would never get closed.
            match state.registry.get(&match_id).await {
                Ok(game) => {
                    state
                        .sessions
                        .join_room(session_id, &match_id, &player)
                        .await;
                    state
                        .sessions
                        .notify_session(session_id, ServerEvent::GameState { game })
                        .await;
                }
                Err(error) => {
                    state
                        .sessions
                        .notify_session(session_id, error_event(&error))
                        .await;
                }
            }
        }
        ClientMessage::PlayerStaked {
            match_id,
            player,
            tx_hash,
        } => {
            if let Err(error) = state
                .registry
                .confirm_stake(&match_id, &player, &tx_hash)
                .await
            {
                state
                    .sessions
                    .notify_session(session_id, error_event(&error))
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_game_message_parses() {
        let text = r#"{"type":"join_game","match_id":"match_ab","player":"0x1"}"#;
        let parsed: ClientMessage = serde_json::from_str(text).unwrap();
        match parsed {
            ClientMessage::JoinGame { match_id, player } => {
                assert_eq!(match_id, "match_ab");
                assert_eq!(player, "0x1");
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn player_staked_message_parses() {
        let text =
            r#"{"type":"player_staked","match_id":"match_ab","player":"0x1","tx_hash":"0xtx"}"#;
        let parsed: ClientMessage = serde_json::from_str(text).unwrap();
        match parsed {
            ClientMessage::PlayerStaked { tx_hash, .. } => assert_eq!(tx_hash, "0xtx"),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        let text = r#"{"type":"shout","volume":11}"#;
        assert!(serde_json::from_str::<ClientMessage>(text).is_err());
    }

    #[test]
    fn error_event_carries_stable_code() {
        let event = error_event(&AppError::OutOfTurn);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"code\":\"OUT_OF_TURN\""));
        assert!(json.contains("\"type\":\"error\""));
    }
}
