use std::collections::HashMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::models::ApiResponse;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub chain: String,
    pub active_matches: usize,
    pub queued_players: usize,
    pub connected_sessions: usize,
}

#[derive(Serialize)]
pub struct GameStatsResponse {
    pub active_matches: usize,
    pub finished_matches: usize,
    pub queues: HashMap<String, usize>,
    pub rooms: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // One cheap RPC round-trip decides chain reachability.
    let chain_status = if state.chain.block_number().await.is_ok() {
        "connected".to_string()
    } else {
        "disconnected".to_string()
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chain: chain_status,
        active_matches: state.registry.match_count().await,
        queued_players: state.matchmaking.queued_players().await,
        connected_sessions: state.sessions.connected_sessions().await,
    })
}

/// GET /stats/games
pub async fn game_stats(State(state): State<AppState>) -> Json<ApiResponse<GameStatsResponse>> {
    let total = state.registry.match_count().await;
    let finished = state.registry.finished_count().await;

    Json(ApiResponse::success(GameStatsResponse {
        active_matches: total.saturating_sub(finished),
        finished_matches: finished,
        queues: state.matchmaking.sizes_by_tier().await,
        rooms: state.sessions.room_count().await,
    }))
}
