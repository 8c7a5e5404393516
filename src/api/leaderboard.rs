use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    models::ApiResponse,
    services::leaderboard::{
        ChainEvent, LeaderboardTotals, PlayerProfile, PlayerStanding, PurchaserStanding,
    },
};

use super::AppState;

const DEFAULT_RANKING_LIMIT: usize = 10;
const DEFAULT_EVENTS_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

/// GET /leaderboard?limit=
pub async fn top_players(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<ApiResponse<Vec<PlayerStanding>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RANKING_LIMIT);
    Json(ApiResponse::success(
        state.leaderboard.top_players(limit).await,
    ))
}

/// GET /leaderboard/player/{address}
pub async fn player_profile(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<PlayerProfile>>> {
    let profile = state
        .leaderboard
        .player(&address)
        .await
        .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;
    Ok(Json(ApiResponse::success(profile)))
}

/// GET /leaderboard/purchases?limit=
pub async fn top_purchasers(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<ApiResponse<Vec<PurchaserStanding>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RANKING_LIMIT);
    Json(ApiResponse::success(
        state.leaderboard.top_purchasers(limit).await,
    ))
}

/// GET /leaderboard/events?limit=&type=
pub async fn recent_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<ApiResponse<Vec<ChainEvent>>> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENTS_LIMIT);
    Json(ApiResponse::success(
        state
            .leaderboard
            .recent_events(limit, query.event_type.as_deref())
            .await,
    ))
}

/// GET /leaderboard/stats
pub async fn leaderboard_stats(
    State(state): State<AppState>,
) -> Json<ApiResponse<LeaderboardTotals>> {
    Json(ApiResponse::success(state.leaderboard.totals().await))
}
