use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    game::{addr_eq, matchmaking::JoinOutcome},
    models::ApiResponse,
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct JoinQueueRequest {
    pub address: String,
    pub stake: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaveQueueRequest {
    pub address: String,
}

#[derive(Serialize)]
pub struct JoinQueueResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent: Option<String>,
}

#[derive(Serialize)]
pub struct LeaveQueueResponse {
    pub message: String,
    pub removed: bool,
}

/// POST /matchmaking/join
pub async fn join_queue(
    State(state): State<AppState>,
    Json(req): Json<JoinQueueRequest>,
) -> Result<Json<ApiResponse<JoinQueueResponse>>> {
    let outcome = state
        .matchmaking
        .join(&req.address, &req.stake, req.session_id)
        .await?;

    let response = match outcome {
        JoinOutcome::Queued {
            position,
            queue_size,
            ..
        } => JoinQueueResponse {
            message: "Added to queue".to_string(),
            position: Some(position),
            queue_size: Some(queue_size),
            match_id: None,
            opponent: None,
        },
        JoinOutcome::Paired {
            tier,
            stake_wei,
            player1,
            player2,
        } => {
            let opponent = if addr_eq(&player1.address, &req.address) {
                player2.address.clone()
            } else {
                player1.address.clone()
            };
            let view = state
                .registry
                .create_match(player1, player2, &tier, stake_wei)
                .await?;
            JoinQueueResponse {
                message: "Match found!".to_string(),
                position: None,
                queue_size: None,
                match_id: Some(view.match_id),
                opponent: Some(opponent),
            }
        }
    };

    Ok(Json(ApiResponse::success(response)))
}

/// POST /matchmaking/leave
pub async fn leave_queue(
    State(state): State<AppState>,
    Json(req): Json<LeaveQueueRequest>,
) -> Json<ApiResponse<LeaveQueueResponse>> {
    let removed = state.matchmaking.leave(&req.address).await;
    Json(ApiResponse::success(LeaveQueueResponse {
        message: "Left matchmaking queue".to_string(),
        removed,
    }))
}
