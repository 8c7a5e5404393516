use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::ApiResponse,
};

use super::{tokens::parse_usdt_amount, AppState};

#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    pub address: String,
    pub amount: Option<String>,
}

#[derive(Serialize)]
pub struct FaucetResponse {
    pub tx_hash: String,
    pub address: String,
    pub amount: String,
    pub message: String,
}

/// POST /faucet/usdt
///
/// Mints test USDT to any address. MockUSDT leaves mint open, so this only
/// works against the local/test deployment.
pub async fn mint_usdt(
    State(state): State<AppState>,
    Json(req): Json<FaucetRequest>,
) -> Result<Json<ApiResponse<FaucetResponse>>> {
    if !state.config.is_testnet() {
        return Err(AppError::NotFound(
            "Faucet is not available on this network".to_string(),
        ));
    }

    let amount = req
        .amount
        .as_deref()
        .unwrap_or(&state.config.faucet_usdt_amount)
        .trim()
        .to_string();
    let amount_wei = parse_usdt_amount(&amount)?;

    let tx_hash = state.chain.mint_usdt(&req.address, amount_wei).await?;
    tracing::info!("Faucet minted {} USDT to {}", amount, req.address);

    Ok(Json(ApiResponse::success(FaucetResponse {
        tx_hash,
        address: req.address,
        amount,
        message: "USDT tokens minted successfully".to_string(),
    })))
}
