use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use ethers::types::U256;
use ethers::utils::{format_ether, format_units, parse_units};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{PURCHASE_RATE_SCALE, USDT_DECIMALS},
    error::{AppError, Result},
    models::ApiResponse,
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct PurchaseInfoQuery {
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminPurchaseRequest {
    pub usdt_amount: String,
}

#[derive(Serialize)]
pub struct GtBalanceResponse {
    pub address: String,
    pub balance: String,
    pub balance_wei: String,
}

#[derive(Serialize)]
pub struct TokenBalance {
    pub balance: String,
    pub balance_wei: String,
    pub symbol: String,
}

#[derive(Serialize)]
pub struct CombinedBalanceResponse {
    pub address: String,
    pub usdt: TokenBalance,
    pub gt: TokenBalance,
}

#[derive(Serialize)]
pub struct AllowanceInfo {
    pub spender: String,
    pub spender_name: String,
    pub allowance: String,
    pub allowance_wei: String,
}

#[derive(Serialize)]
pub struct AllowancesResponse {
    pub address: String,
    pub gt: AllowanceInfo,
    pub usdt: AllowanceInfo,
}

#[derive(Serialize)]
pub struct PurchaseInfoResponse {
    pub usdt_amount: String,
    pub usdt_amount_wei: String,
    pub gt_amount: String,
    pub gt_amount_wei: String,
    pub token_store_address: String,
    pub usdt_address: String,
}

#[derive(Serialize)]
pub struct AdminPurchaseResponse {
    pub tx_hash: String,
    pub usdt_amount: String,
    pub gt_out: String,
    pub operator: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ContractAddresses {
    pub game_token: String,
    pub mock_usdt: String,
    pub token_store: String,
    pub play_game: String,
}

#[derive(Serialize)]
pub struct ContractsResponse {
    pub chain_id: u64,
    pub rpc_url: String,
    pub contracts: ContractAddresses,
    pub operator: String,
}

/// Validates and scales a human USDT amount ("12.5") into 6-decimal wei.
pub(crate) fn parse_usdt_amount(value: &str) -> Result<U256> {
    let trimmed = value.trim();
    let amount = Decimal::from_str(trimmed)
        .map_err(|_| AppError::InvalidInput("Invalid amount".to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidInput("Invalid amount".to_string()));
    }
    let wei = parse_units(trimmed, USDT_DECIMALS)
        .map_err(|_| AppError::InvalidInput("Invalid amount".to_string()))?;
    Ok(wei.into())
}

/// TokenStore sells at a fixed 1:1 rate; the factor only bridges the
/// 6-to-18 decimal gap.
fn gt_for_usdt(usdt_wei: U256) -> U256 {
    usdt_wei * U256::from(PURCHASE_RATE_SCALE)
}

fn format_usdt(amount: U256) -> Result<String> {
    format_units(amount, USDT_DECIMALS).map_err(|e| AppError::Internal(e.to_string()))
}

/// GET /balance/{address}
pub async fn get_gt_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<GtBalanceResponse>>> {
    let balance = state.chain.gt_balance_of(&address).await?;

    Ok(Json(ApiResponse::success(GtBalanceResponse {
        address,
        balance: format_ether(balance),
        balance_wei: balance.to_string(),
    })))
}

/// GET /usdt-balance/{address}
pub async fn get_combined_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<CombinedBalanceResponse>>> {
    let (usdt, gt) = tokio::join!(
        state.chain.usdt_balance_of(&address),
        state.chain.gt_balance_of(&address)
    );
    let usdt = usdt?;
    let gt = gt?;

    Ok(Json(ApiResponse::success(CombinedBalanceResponse {
        address,
        usdt: TokenBalance {
            balance: format_usdt(usdt)?,
            balance_wei: usdt.to_string(),
            symbol: "USDT".to_string(),
        },
        gt: TokenBalance {
            balance: format_ether(gt),
            balance_wei: gt.to_string(),
            symbol: "GT".to_string(),
        },
    })))
}

/// GET /allowances/{address}
pub async fn get_allowances(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<AllowancesResponse>>> {
    let (gt_allowance, usdt_allowance) = tokio::join!(
        state.chain.gt_allowance_of(&address),
        state.chain.usdt_allowance_of(&address)
    );
    let gt_allowance = gt_allowance?;
    let usdt_allowance = usdt_allowance?;

    Ok(Json(ApiResponse::success(AllowancesResponse {
        address,
        gt: AllowanceInfo {
            spender: state.config.play_game_address.clone(),
            spender_name: "PlayGame".to_string(),
            allowance: format_ether(gt_allowance),
            allowance_wei: gt_allowance.to_string(),
        },
        usdt: AllowanceInfo {
            spender: state.config.token_store_address.clone(),
            spender_name: "TokenStore".to_string(),
            allowance: format_usdt(usdt_allowance)?,
            allowance_wei: usdt_allowance.to_string(),
        },
    })))
}

/// GET /purchase-info?amount=
///
/// Pure quote; the frontend makes the actual purchase with the user's
/// wallet.
pub async fn purchase_info(
    State(state): State<AppState>,
    Query(query): Query<PurchaseInfoQuery>,
) -> Result<Json<ApiResponse<PurchaseInfoResponse>>> {
    let usdt_wei = parse_usdt_amount(&query.amount)?;
    let gt_wei = gt_for_usdt(usdt_wei);

    Ok(Json(ApiResponse::success(PurchaseInfoResponse {
        usdt_amount: query.amount.trim().to_string(),
        usdt_amount_wei: usdt_wei.to_string(),
        gt_amount: format_ether(gt_wei),
        gt_amount_wei: gt_wei.to_string(),
        token_store_address: state.config.token_store_address.clone(),
        usdt_address: state.config.mock_usdt_address.clone(),
    })))
}

/// POST /admin/purchase
///
/// Buys GT with the operator's own USDT, for seeding test accounts.
pub async fn admin_purchase(
    State(state): State<AppState>,
    Json(req): Json<AdminPurchaseRequest>,
) -> Result<Json<ApiResponse<AdminPurchaseResponse>>> {
    let usdt_wei = parse_usdt_amount(&req.usdt_amount)?;
    let tx_hash = state.chain.buy_gt(usdt_wei).await?;

    Ok(Json(ApiResponse::success(AdminPurchaseResponse {
        tx_hash,
        usdt_amount: req.usdt_amount.trim().to_string(),
        gt_out: format_ether(gt_for_usdt(usdt_wei)),
        operator: format!("{:#x}", state.chain.operator_address()),
        message: "Admin purchase successful".to_string(),
    })))
}

/// GET /contracts
pub async fn get_contracts(State(state): State<AppState>) -> Json<ApiResponse<ContractsResponse>> {
    Json(ApiResponse::success(ContractsResponse {
        chain_id: state.config.chain_id,
        rpc_url: state.config.rpc_url.clone(),
        contracts: ContractAddresses {
            game_token: state.config.game_token_address.clone(),
            mock_usdt: state.config.mock_usdt_address.clone(),
            token_store: state.config.token_store_address.clone(),
            play_game: state.config.play_game_address.clone(),
        },
        operator: format!("{:#x}", state.chain.operator_address()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_usdt_amount_scales_to_six_decimals() {
        assert_eq!(parse_usdt_amount("1").unwrap(), U256::from(1_000_000u64));
        assert_eq!(parse_usdt_amount("0.5").unwrap(), U256::from(500_000u64));
        assert_eq!(
            parse_usdt_amount(" 1000 ").unwrap(),
            U256::from(1_000_000_000u64)
        );
    }

    #[test]
    fn parse_usdt_amount_rejects_garbage_and_nonpositive() {
        assert!(parse_usdt_amount("ten").is_err());
        assert!(parse_usdt_amount("0").is_err());
        assert!(parse_usdt_amount("-3").is_err());
        assert!(parse_usdt_amount("").is_err());
    }

    #[test]
    fn quote_is_one_to_one_across_decimal_gap() {
        // 1 USDT (10^6) buys 1 GT (10^18).
        let gt = gt_for_usdt(U256::from(1_000_000u64));
        assert_eq!(gt, U256::exp10(18));
        assert_eq!(format_ether(gt), "1.000000000000000000");
    }

    #[test]
    fn format_usdt_uses_six_decimals() {
        let formatted = format_usdt(U256::from(1_500_000u64)).unwrap();
        assert_eq!(formatted, "1.500000");
    }
}
