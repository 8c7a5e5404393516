use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod error;
mod game;
mod models;
mod services;
mod websocket;

use config::Config;
use constants::API_VERSION;
use game::{MatchRegistry, MatchmakingQueue};
use services::{ChainClient, EscrowBridge, LeaderboardStore, SessionGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playgame_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting PlayGame Backend Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);

    // One signing client for everything on-chain; the game services see it
    // only through the EscrowBridge trait.
    let chain = Arc::new(ChainClient::from_config(&config)?);
    let bridge: Arc<dyn EscrowBridge> = chain.clone();

    let sessions = Arc::new(SessionGateway::new());
    let matchmaking = Arc::new(MatchmakingQueue::new(bridge.clone()));
    let registry = Arc::new(MatchRegistry::new(
        bridge,
        sessions.clone(),
        config.match_retention_secs,
    ));
    let leaderboard = Arc::new(LeaderboardStore::new());

    let app_state = api::AppState {
        config: config.clone(),
        chain: chain.clone(),
        matchmaking,
        registry,
        sessions,
        leaderboard: leaderboard.clone(),
    };

    // Build router
    let app = build_router(app_state);

    // Start background services
    tokio::spawn(services::start_background_services(
        chain,
        leaderboard,
        config.clone(),
    ));

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health & stats
        .route("/health", get(api::health::health_check))
        .route("/stats/games", get(api::health::game_stats))
        // Matchmaking
        .route("/matchmaking/join", post(api::matchmaking::join_queue))
        .route("/matchmaking/leave", post(api::matchmaking::leave_queue))
        // Game state & moves
        .route("/game/{match_id}", get(api::game::get_game))
        .route("/game/{match_id}/move", post(api::game::submit_move))
        // Escrow reconciliation
        .route(
            "/match/{match_id}/onchain",
            get(api::escrow::get_onchain_match),
        )
        .route("/match/{match_id}/refund", post(api::escrow::refund_match))
        // Tokens & purchases
        .route("/balance/{address}", get(api::tokens::get_gt_balance))
        .route(
            "/usdt-balance/{address}",
            get(api::tokens::get_combined_balance),
        )
        .route("/allowances/{address}", get(api::tokens::get_allowances))
        .route("/purchase-info", get(api::tokens::purchase_info))
        .route("/admin/purchase", post(api::tokens::admin_purchase))
        .route("/contracts", get(api::tokens::get_contracts))
        // Faucet (testnet)
        .route("/faucet/usdt", post(api::faucet::mint_usdt))
        // Leaderboard
        .route("/leaderboard", get(api::leaderboard::top_players))
        .route(
            "/leaderboard/player/{address}",
            get(api::leaderboard::player_profile),
        )
        .route(
            "/leaderboard/purchases",
            get(api::leaderboard::top_purchasers),
        )
        .route("/leaderboard/events", get(api::leaderboard::recent_events))
        .route(
            "/leaderboard/stats",
            get(api::leaderboard::leaderboard_stats),
        )
        // WebSocket endpoint
        .route("/ws", get(websocket::session::handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
