use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard success envelope; errors use `crate::error::ErrorResponse`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Full match snapshot as exposed over HTTP and room broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchView {
    pub match_id: String,
    pub player1: String,
    pub player2: String,
    pub stake: String,
    pub stake_wei: String,
    pub status: String,
    pub board: Vec<Option<String>>,
    pub current_turn: String,
    pub winner: Option<String>,
    pub draw: bool,
    pub moves: Vec<MoveView>,
    pub player1_staked: bool,
    pub player2_staked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player1_stake_tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player2_stake_tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveView {
    pub player: String,
    pub position: u8,
    pub mark: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_success_sets_flag() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, "ok");
    }

    #[test]
    fn match_view_skips_absent_annotations() {
        let view = MatchView {
            match_id: "match_ab".to_string(),
            player1: "0x1".to_string(),
            player2: "0x2".to_string(),
            stake: "10".to_string(),
            stake_wei: "10000000000000000000".to_string(),
            status: "created".to_string(),
            board: vec![None; 9],
            current_turn: "0x1".to_string(),
            winner: None,
            draw: false,
            moves: vec![],
            player1_staked: false,
            player2_staked: false,
            player1_stake_tx: None,
            player2_stake_tx: None,
            create_tx: None,
            settle_tx: None,
            create_error: None,
            settle_error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("create_error"));
        assert!(!json.contains("settle_tx"));
        assert!(json.contains("\"status\":\"created\""));
    }
}
