/// Application constants

// Token decimals
pub const GT_DECIMALS: u32 = 18;
pub const USDT_DECIMALS: u32 = 6;

// TokenStore sells GT 1:1 against USDT; the rate scale bridges the decimal
// gap: gt_wei = usdt_wei * 10^(GT_DECIMALS - USDT_DECIMALS)
pub const PURCHASE_RATE_SCALE: u64 = 10u64.pow(GT_DECIMALS - USDT_DECIMALS);

// Match lifecycle
pub const MATCH_ID_PREFIX: &str = "match_";
pub const DEFAULT_MATCH_RETENTION_SECS: u64 = 300;

// Faucet configuration
pub const DEFAULT_FAUCET_USDT_AMOUNT: &str = "1000";

// Leaderboard indexer
pub const DEFAULT_INDEXER_INTERVAL_SECS: u64 = 15;
pub const INDEXER_TRANSIENT_BACKOFF_MAX_SECS: u64 = 300;
pub const INDEXER_MAX_BLOCKS_PER_TICK: u64 = 2000;
pub const INDEXER_INITIAL_BACKFILL_BLOCKS: u64 = 128;
pub const EVENT_HISTORY_LIMIT: usize = 1000;

// API version
pub const API_VERSION: &str = "v1";

// WebSocket configuration
pub const WS_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const WS_CLIENT_TIMEOUT_SECS: u64 = 60;
