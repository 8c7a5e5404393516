use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient GT balance")]
    InsufficientBalance,

    #[error("Insufficient allowance")]
    InsufficientAllowance,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not your turn")]
    OutOfTurn,

    #[error("Game is not active")]
    NotPlayable,

    #[error("Invalid position")]
    InvalidPosition,

    #[error("Position already taken")]
    CellOccupied,

    #[error("Chain call failed: {0}")]
    ChainCall(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine code, shared by HTTP error bodies and socket error
    /// events.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            AppError::InsufficientAllowance => "INSUFFICIENT_ALLOWANCE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::OutOfTurn => "OUT_OF_TURN",
            AppError::NotPlayable => "MATCH_NOT_PLAYABLE",
            AppError::InvalidPosition => "INVALID_POSITION",
            AppError::CellOccupied => "CELL_OCCUPIED",
            AppError::ChainCall(_) => "CHAIN_CALL_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InsufficientBalance => (
                StatusCode::BAD_REQUEST,
                "Insufficient GT balance for this stake".to_string(),
            ),
            AppError::InsufficientAllowance => (
                StatusCode::BAD_REQUEST,
                "Token allowance too low for this operation".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::OutOfTurn => (StatusCode::BAD_REQUEST, "Not your turn".to_string()),
            AppError::NotPlayable => (StatusCode::BAD_REQUEST, "Game is not active".to_string()),
            AppError::InvalidPosition => (
                StatusCode::BAD_REQUEST,
                "Position must be between 0 and 8".to_string(),
            ),
            AppError::CellOccupied => (
                StatusCode::BAD_REQUEST,
                "Position already taken".to_string(),
            ),
            AppError::ChainCall(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
