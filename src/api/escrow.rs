use axum::{
    extract::{Path, State},
    Json,
};
use ethers::types::Address;
use ethers::utils::format_ether;
use serde::Serialize;

use crate::{error::Result, models::ApiResponse};

use super::AppState;

#[derive(Serialize)]
pub struct OnchainMatchResponse {
    pub match_id: String,
    pub p1: String,
    pub p2: String,
    pub stake: String,
    pub stake_wei: String,
    pub start_time: String,
    pub status: u8,
    pub winner: Option<String>,
}

#[derive(Serialize)]
pub struct RefundResponse {
    pub match_id: String,
    pub tx_hash: String,
    pub message: String,
}

/// GET /match/{match_id}/onchain
///
/// Reads the escrow contract directly, for reconciling the in-memory record
/// against what the chain actually holds.
pub async fn get_onchain_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<ApiResponse<OnchainMatchResponse>>> {
    let record = state.chain.onchain_match(&match_id).await?;
    let winner = (record.winner != Address::zero()).then(|| format!("{:#x}", record.winner));

    Ok(Json(ApiResponse::success(OnchainMatchResponse {
        match_id,
        p1: format!("{:#x}", record.p1),
        p2: format!("{:#x}", record.p2),
        stake: format_ether(record.stake),
        stake_wei: record.stake.to_string(),
        start_time: record.start_time.to_string(),
        status: record.status,
        winner,
    })))
}

/// POST /match/{match_id}/refund
pub async fn refund_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<ApiResponse<RefundResponse>>> {
    let tx_hash = state.chain.refund_match(&match_id).await?;
    tracing::info!("Match {} refunded: {}", match_id, tx_hash);

    // The escrow no longer holds anything for this match; any in-memory
    // record is stale now.
    if state.registry.retire(&match_id).await {
        tracing::debug!("Dropped registry record for refunded match {}", match_id);
    }

    Ok(Json(ApiResponse::success(RefundResponse {
        match_id,
        tx_hash,
        message: "Match refunded successfully".to_string(),
    })))
}
