use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::Result,
    models::{ApiResponse, MatchView},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub player: String,
    pub position: i64,
}

/// GET /game/{match_id}
pub async fn get_game(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<ApiResponse<MatchView>>> {
    let view = state.registry.get(&match_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// POST /game/{match_id}/move
pub async fn submit_move(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<ApiResponse<MatchView>>> {
    let view = state
        .registry
        .submit_move(&match_id, &req.player, req.position)
        .await?;
    Ok(Json(ApiResponse::success(view)))
}
