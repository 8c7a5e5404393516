pub mod escrow;
pub mod faucet;
pub mod game;
pub mod health;
pub mod leaderboard;
pub mod matchmaking;
pub mod tokens;

use std::sync::Arc;

use crate::config::Config;
use crate::game::{MatchRegistry, MatchmakingQueue};
use crate::services::{ChainClient, LeaderboardStore, SessionGateway};

/// Shared handles for every handler. Everything heavy lives behind an Arc;
/// cloning the state per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub chain: Arc<ChainClient>,
    pub matchmaking: Arc<MatchmakingQueue>,
    pub registry: Arc<MatchRegistry>,
    pub sessions: Arc<SessionGateway>,
    pub leaderboard: Arc<LeaderboardStore>,
}
