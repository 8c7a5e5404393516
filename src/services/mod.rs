pub mod leaderboard;
pub mod onchain;
pub mod session_gateway;

// Re-export for convenience
pub use leaderboard::{LeaderboardIndexer, LeaderboardStore};
pub use onchain::{ChainClient, EscrowBridge};
pub use session_gateway::{ServerEvent, SessionGateway};

use crate::config::Config;
use std::sync::Arc;

fn is_env_flag_enabled(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            normalized == "1" || normalized == "true" || normalized == "yes" || normalized == "on"
        })
        .unwrap_or(false)
}

/// Start all background services
pub async fn start_background_services(
    chain: Arc<ChainClient>,
    leaderboard: Arc<LeaderboardStore>,
    config: Config,
) {
    tracing::info!("Starting background services...");

    let enable_indexer = if std::env::var("ENABLE_LEADERBOARD_INDEXER").is_ok() {
        is_env_flag_enabled("ENABLE_LEADERBOARD_INDEXER")
    } else {
        true
    };
    if enable_indexer {
        let indexer = Arc::new(LeaderboardIndexer::new(chain, leaderboard, &config));
        indexer.start().await;
    } else {
        tracing::warn!("Leaderboard indexer disabled via ENABLE_LEADERBOARD_INDEXER");
    }

    tracing::info!("All background services started");
}
