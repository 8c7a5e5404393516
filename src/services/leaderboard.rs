use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::{Serialize, Serializer};
use tokio::sync::RwLock;
use tokio::time::{interval, sleep, Duration};

use crate::{
    config::Config,
    constants::{
        EVENT_HISTORY_LIMIT, INDEXER_INITIAL_BACKFILL_BLOCKS, INDEXER_MAX_BLOCKS_PER_TICK,
        INDEXER_TRANSIENT_BACKOFF_MAX_SECS,
    },
    error::{AppError, Result},
    services::onchain::ChainClient,
};

fn u256_dec<S: Serializer>(value: &U256, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// One decoded contract event. The tag names match the event names on the
/// contracts, so `?type=Settled` filters work against raw history.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ChainEventKind {
    Purchase {
        buyer: String,
        #[serde(serialize_with = "u256_dec")]
        usdt_amount: U256,
        #[serde(serialize_with = "u256_dec")]
        gt_out: U256,
    },
    MatchCreated {
        match_id: String,
        p1: String,
        p2: String,
        #[serde(serialize_with = "u256_dec")]
        stake: U256,
    },
    Staked {
        match_id: String,
        player: String,
    },
    Settled {
        match_id: String,
        winner: String,
        #[serde(serialize_with = "u256_dec")]
        amount: U256,
    },
    Refunded {
        match_id: String,
    },
}

impl ChainEventKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ChainEventKind::Purchase { .. } => "Purchase",
            ChainEventKind::MatchCreated { .. } => "MatchCreated",
            ChainEventKind::Staked { .. } => "Staked",
            ChainEventKind::Settled { .. } => "Settled",
            ChainEventKind::Refunded { .. } => "Refunded",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainEvent {
    #[serde(flatten)]
    pub kind: ChainEventKind,
    pub timestamp: DateTime<Utc>,
    pub block_number: u64,
    pub transaction_hash: String,
}

#[derive(Debug, Clone, Default)]
struct PlayerStats {
    wins: u64,
    losses: u64,
    gt_won: U256,
    gt_lost: U256,
    matches_played: u64,
    total_staked: U256,
}

#[derive(Debug, Clone, Default)]
struct PurchaseStats {
    total_usdt_spent: U256,
    total_gt_received: U256,
    purchase_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStanding {
    pub address: String,
    pub wins: u64,
    pub losses: u64,
    pub gt_won: String,
    pub gt_lost: String,
    pub matches_played: u64,
    pub total_staked: String,
    pub win_rate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaserStanding {
    pub address: String,
    pub total_usdt_spent: String,
    pub total_gt_received: String,
    pub purchase_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerProfile {
    pub gaming: Option<PlayerStanding>,
    pub purchases: Option<PurchaserStanding>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GamingTotals {
    pub total_players: usize,
    pub total_matches: u64,
    pub total_gt_won: String,
    pub total_gt_lost: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseTotals {
    pub total_purchasers: usize,
    pub total_gt_in_circulation: String,
    pub total_usdt_spent: String,
    pub total_purchases: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventTypeCounts {
    pub purchase: u64,
    pub match_created: u64,
    pub staked: u64,
    pub settled: u64,
    pub refunded: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventTotals {
    pub total_events: usize,
    pub event_types: EventTypeCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardTotals {
    pub gaming: GamingTotals,
    pub purchases: PurchaseTotals,
    pub events: EventTotals,
}

#[derive(Default)]
struct LeaderboardState {
    players: HashMap<String, PlayerStats>,
    purchases: HashMap<String, PurchaseStats>,
    events: VecDeque<ChainEvent>,
    last_block: u64,
}

/// Aggregated standings derived purely from contract events. Everything
/// here is rebuilt from chain history on restart.
pub struct LeaderboardStore {
    state: RwLock<LeaderboardState>,
}

impl LeaderboardStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LeaderboardState::default()),
        }
    }

    /// Folds one event into the standings. Events must arrive in chain
    /// order: loser attribution for `Settled` reads the staking history
    /// recorded before it.
    pub async fn record(&self, event: ChainEvent) {
        let mut state = self.state.write().await;
        match &event.kind {
            ChainEventKind::Purchase {
                buyer,
                usdt_amount,
                gt_out,
            } => {
                let entry = state.purchases.entry(buyer.clone()).or_default();
                entry.total_usdt_spent += *usdt_amount;
                entry.total_gt_received += *gt_out;
                entry.purchase_count += 1;
            }
            ChainEventKind::MatchCreated { .. } => {}
            ChainEventKind::Staked { player, .. } => {
                state.players.entry(player.clone()).or_default();
            }
            ChainEventKind::Settled {
                match_id,
                winner,
                amount,
            } => {
                // The pot is both stakes; half of it was the winner's own.
                let half = *amount / U256::from(2);
                {
                    let entry = state.players.entry(winner.clone()).or_default();
                    entry.wins += 1;
                    entry.gt_won += *amount;
                    entry.matches_played += 1;
                    entry.total_staked += half;
                }

                let stakers: Vec<String> = state
                    .events
                    .iter()
                    .filter_map(|e| match &e.kind {
                        ChainEventKind::Staked {
                            match_id: mid,
                            player,
                        } if mid == match_id => Some(player.clone()),
                        _ => None,
                    })
                    .collect();
                let start = stakers.len().saturating_sub(2);
                let loser = stakers[start..]
                    .iter()
                    .find(|p| !p.eq_ignore_ascii_case(winner))
                    .cloned();
                if let Some(loser) = loser {
                    let entry = state.players.entry(loser).or_default();
                    entry.losses += 1;
                    entry.gt_lost += half;
                    entry.matches_played += 1;
                    entry.total_staked += half;
                }
            }
            ChainEventKind::Refunded { .. } => {}
        }

        state.events.push_back(event);
        while state.events.len() > EVENT_HISTORY_LIMIT {
            state.events.pop_front();
        }
    }

    pub async fn top_players(&self, limit: usize) -> Vec<PlayerStanding> {
        let state = self.state.read().await;
        let mut entries: Vec<(String, PlayerStats)> = state
            .players
            .iter()
            .map(|(address, stats)| (address.clone(), stats.clone()))
            .collect();
        entries.sort_by(|a, b| {
            b.1.gt_won
                .cmp(&a.1.gt_won)
                .then(b.1.wins.cmp(&a.1.wins))
                .then(a.1.matches_played.cmp(&b.1.matches_played))
        });
        entries.truncate(limit);
        entries
            .into_iter()
            .map(|(address, stats)| player_standing(address, &stats))
            .collect()
    }

    pub async fn top_purchasers(&self, limit: usize) -> Vec<PurchaserStanding> {
        let state = self.state.read().await;
        let mut entries: Vec<(String, PurchaseStats)> = state
            .purchases
            .iter()
            .map(|(address, stats)| (address.clone(), stats.clone()))
            .collect();
        entries.sort_by(|a, b| b.1.total_gt_received.cmp(&a.1.total_gt_received));
        entries.truncate(limit);
        entries
            .into_iter()
            .map(|(address, stats)| purchaser_standing(address, &stats))
            .collect()
    }

    pub async fn player(&self, address: &str) -> Option<PlayerProfile> {
        let key = address.trim().to_lowercase();
        let state = self.state.read().await;
        let gaming = state
            .players
            .get(&key)
            .map(|stats| player_standing(key.clone(), stats));
        let purchases = state
            .purchases
            .get(&key)
            .map(|stats| purchaser_standing(key.clone(), stats));
        if gaming.is_none() && purchases.is_none() {
            return None;
        }
        Some(PlayerProfile { gaming, purchases })
    }

    /// Most recent first, optionally narrowed to one event type.
    pub async fn recent_events(&self, limit: usize, type_filter: Option<&str>) -> Vec<ChainEvent> {
        let state = self.state.read().await;
        state
            .events
            .iter()
            .rev()
            .filter(|e| type_filter.map_or(true, |t| e.kind.type_name() == t))
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn totals(&self) -> LeaderboardTotals {
        let state = self.state.read().await;
        let mut counts = EventTypeCounts {
            purchase: 0,
            match_created: 0,
            staked: 0,
            settled: 0,
            refunded: 0,
        };
        for event in &state.events {
            match event.kind {
                ChainEventKind::Purchase { .. } => counts.purchase += 1,
                ChainEventKind::MatchCreated { .. } => counts.match_created += 1,
                ChainEventKind::Staked { .. } => counts.staked += 1,
                ChainEventKind::Settled { .. } => counts.settled += 1,
                ChainEventKind::Refunded { .. } => counts.refunded += 1,
            }
        }

        LeaderboardTotals {
            gaming: GamingTotals {
                total_players: state.players.len(),
                // Every settled match added two matches_played entries.
                total_matches: state.players.values().map(|p| p.matches_played).sum::<u64>() / 2,
                total_gt_won: state
                    .players
                    .values()
                    .fold(U256::zero(), |acc, p| acc + p.gt_won)
                    .to_string(),
                total_gt_lost: state
                    .players
                    .values()
                    .fold(U256::zero(), |acc, p| acc + p.gt_lost)
                    .to_string(),
            },
            purchases: PurchaseTotals {
                total_purchasers: state.purchases.len(),
                total_gt_in_circulation: state
                    .purchases
                    .values()
                    .fold(U256::zero(), |acc, p| acc + p.total_gt_received)
                    .to_string(),
                total_usdt_spent: state
                    .purchases
                    .values()
                    .fold(U256::zero(), |acc, p| acc + p.total_usdt_spent)
                    .to_string(),
                total_purchases: state.purchases.values().map(|p| p.purchase_count).sum(),
            },
            events: EventTotals {
                total_events: state.events.len(),
                event_types: counts,
            },
        }
    }

    pub async fn last_block(&self) -> u64 {
        self.state.read().await.last_block
    }

    pub async fn set_last_block(&self, block: u64) {
        self.state.write().await.last_block = block;
    }
}

impl Default for LeaderboardStore {
    fn default() -> Self {
        Self::new()
    }
}

fn player_standing(address: String, stats: &PlayerStats) -> PlayerStanding {
    let win_rate = if stats.matches_played > 0 {
        format!(
            "{:.1}",
            stats.wins as f64 / stats.matches_played as f64 * 100.0
        )
    } else {
        "0.0".to_string()
    };
    PlayerStanding {
        address,
        wins: stats.wins,
        losses: stats.losses,
        gt_won: stats.gt_won.to_string(),
        gt_lost: stats.gt_lost.to_string(),
        matches_played: stats.matches_played,
        total_staked: stats.total_staked.to_string(),
        win_rate,
    }
}

fn purchaser_standing(address: String, stats: &PurchaseStats) -> PurchaserStanding {
    PurchaserStanding {
        address,
        total_usdt_spent: stats.total_usdt_spent.to_string(),
        total_gt_received: stats.total_gt_received.to_string(),
        purchase_count: stats.purchase_count,
    }
}

fn is_transient_chain_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("too many requests")
        || lower.contains("429")
        || lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("gateway")
        || lower.contains("temporarily unavailable")
        || lower.contains("connection reset")
        || lower.contains("connection refused")
        || lower.contains("eof while parsing")
}

fn transient_backoff_secs(base_secs: u64, failures: u32) -> u64 {
    let exponent = failures.saturating_sub(1).min(5);
    let multiplier = 1_u64 << exponent;
    let candidate = base_secs.saturating_mul(multiplier);
    candidate.clamp(
        base_secs.min(INDEXER_TRANSIENT_BACKOFF_MAX_SECS),
        INDEXER_TRANSIENT_BACKOFF_MAX_SECS,
    )
}

/// Polls the escrow and token store contracts for events and folds them
/// into the store.
pub struct LeaderboardIndexer {
    chain: Arc<ChainClient>,
    store: Arc<LeaderboardStore>,
    interval_secs: u64,
    start_block: Option<u64>,
}

impl LeaderboardIndexer {
    pub fn new(chain: Arc<ChainClient>, store: Arc<LeaderboardStore>, config: &Config) -> Self {
        Self {
            chain,
            store,
            interval_secs: config.indexer_interval_secs,
            start_block: config.indexer_start_block,
        }
    }

    pub async fn start(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(self.interval_secs));
            let mut transient_failures: u32 = 0;

            loop {
                ticker.tick().await;

                match self.scan_events().await {
                    Ok(()) => {
                        transient_failures = 0;
                    }
                    Err(e) => {
                        let err_text = e.to_string();
                        if is_transient_chain_error(&err_text) {
                            transient_failures = transient_failures.saturating_add(1);
                            let backoff_secs =
                                transient_backoff_secs(self.interval_secs, transient_failures);
                            tracing::warn!(
                                "Leaderboard indexer transient error: {} (backoff={}s, failures={})",
                                err_text,
                                backoff_secs,
                                transient_failures
                            );
                            sleep(Duration::from_secs(backoff_secs)).await;
                        } else {
                            transient_failures = 0;
                            tracing::error!("Leaderboard indexer error: {}", err_text);
                        }
                    }
                }
            }
        });
    }

    async fn scan_events(&self) -> Result<()> {
        let head = self.chain.block_number().await?;
        let previous = self.store.last_block().await;

        let from = if previous == 0 {
            self.start_block
                .unwrap_or_else(|| head.saturating_sub(INDEXER_INITIAL_BACKFILL_BLOCKS - 1))
        } else {
            previous + 1
        };
        if from > head {
            return Ok(());
        }
        let to = from
            .saturating_add(INDEXER_MAX_BLOCKS_PER_TICK.saturating_sub(1))
            .min(head);
        tracing::debug!("Scanning blocks {} to {} (head {})", from, to, head);

        let play_game = self.chain.play_game();
        let token_store = self.chain.token_store();

        let created = play_game
            .match_created_filter()
            .from_block(from)
            .to_block(to)
            .query_with_meta()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        let staked = play_game
            .staked_filter()
            .from_block(from)
            .to_block(to)
            .query_with_meta()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        let settled = play_game
            .settled_filter()
            .from_block(from)
            .to_block(to)
            .query_with_meta()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        let refunded = play_game
            .refunded_filter()
            .from_block(from)
            .to_block(to)
            .query_with_meta()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        let purchases = token_store
            .purchase_filter()
            .from_block(from)
            .to_block(to)
            .query_with_meta()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;

        let now = Utc::now();
        let mut batch: Vec<(u64, U256, ChainEvent)> = Vec::new();
        for (event, meta) in created {
            batch.push((
                meta.block_number.as_u64(),
                meta.log_index,
                ChainEvent {
                    kind: ChainEventKind::MatchCreated {
                        match_id: format!("0x{}", hex::encode(event.match_id)),
                        p1: format!("{:#x}", event.p_1),
                        p2: format!("{:#x}", event.p_2),
                        stake: event.stake,
                    },
                    timestamp: now,
                    block_number: meta.block_number.as_u64(),
                    transaction_hash: format!("{:#x}", meta.transaction_hash),
                },
            ));
        }
        for (event, meta) in staked {
            batch.push((
                meta.block_number.as_u64(),
                meta.log_index,
                ChainEvent {
                    kind: ChainEventKind::Staked {
                        match_id: format!("0x{}", hex::encode(event.match_id)),
                        player: format!("{:#x}", event.player),
                    },
                    timestamp: now,
                    block_number: meta.block_number.as_u64(),
                    transaction_hash: format!("{:#x}", meta.transaction_hash),
                },
            ));
        }
        for (event, meta) in settled {
            batch.push((
                meta.block_number.as_u64(),
                meta.log_index,
                ChainEvent {
                    kind: ChainEventKind::Settled {
                        match_id: format!("0x{}", hex::encode(event.match_id)),
                        winner: format!("{:#x}", event.winner),
                        amount: event.amount,
                    },
                    timestamp: now,
                    block_number: meta.block_number.as_u64(),
                    transaction_hash: format!("{:#x}", meta.transaction_hash),
                },
            ));
        }
        for (event, meta) in refunded {
            batch.push((
                meta.block_number.as_u64(),
                meta.log_index,
                ChainEvent {
                    kind: ChainEventKind::Refunded {
                        match_id: format!("0x{}", hex::encode(event.match_id)),
                    },
                    timestamp: now,
                    block_number: meta.block_number.as_u64(),
                    transaction_hash: format!("{:#x}", meta.transaction_hash),
                },
            ));
        }
        for (event, meta) in purchases {
            batch.push((
                meta.block_number.as_u64(),
                meta.log_index,
                ChainEvent {
                    kind: ChainEventKind::Purchase {
                        buyer: format!("{:#x}", event.buyer),
                        usdt_amount: event.usdt_amount,
                        gt_out: event.gt_out,
                    },
                    timestamp: now,
                    block_number: meta.block_number.as_u64(),
                    transaction_hash: format!("{:#x}", meta.transaction_hash),
                },
            ));
        }

        // Chain order, so staking history lands before the settlement that
        // consults it.
        batch.sort_by_key(|(block, log_index, _)| (*block, *log_index));
        let count = batch.len();
        for (_, _, event) in batch {
            self.store.record(event).await;
        }
        if count > 0 {
            tracing::info!("Indexed {} events from blocks {}..{}", count, from, to);
        }

        self.store.set_last_block(to).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: ChainEventKind, block_number: u64) -> ChainEvent {
        ChainEvent {
            kind,
            timestamp: Utc::now(),
            block_number,
            transaction_hash: format!("0x{:064x}", block_number),
        }
    }

    fn staked(match_id: &str, player: &str, block: u64) -> ChainEvent {
        event(
            ChainEventKind::Staked {
                match_id: match_id.to_string(),
                player: player.to_string(),
            },
            block,
        )
    }

    fn settled(match_id: &str, winner: &str, amount: u64, block: u64) -> ChainEvent {
        event(
            ChainEventKind::Settled {
                match_id: match_id.to_string(),
                winner: winner.to_string(),
                amount: U256::from(amount),
            },
            block,
        )
    }

    fn purchase(buyer: &str, usdt: u64, gt: u64, block: u64) -> ChainEvent {
        event(
            ChainEventKind::Purchase {
                buyer: buyer.to_string(),
                usdt_amount: U256::from(usdt),
                gt_out: U256::from(gt),
            },
            block,
        )
    }

    #[tokio::test]
    async fn settlement_credits_winner_and_attributes_loser() {
        let store = LeaderboardStore::new();
        store.record(staked("0xaaaa", "0x01", 1)).await;
        store.record(staked("0xaaaa", "0x02", 2)).await;
        store.record(settled("0xaaaa", "0x01", 20, 3)).await;

        let top = store.top_players(10).await;
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].address, "0x01");
        assert_eq!(top[0].wins, 1);
        assert_eq!(top[0].gt_won, "20");
        assert_eq!(top[0].total_staked, "10");
        assert_eq!(top[0].win_rate, "100.0");

        assert_eq!(top[1].address, "0x02");
        assert_eq!(top[1].losses, 1);
        assert_eq!(top[1].gt_lost, "10");
        assert_eq!(top[1].matches_played, 1);
        assert_eq!(top[1].win_rate, "0.0");
    }

    #[tokio::test]
    async fn settlement_without_staking_history_only_credits_winner() {
        let store = LeaderboardStore::new();
        store.record(settled("0xbbbb", "0x01", 20, 1)).await;

        let top = store.top_players(10).await;
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].wins, 1);
        assert_eq!(top[0].losses, 0);
    }

    #[tokio::test]
    async fn purchases_accumulate_per_buyer() {
        let store = LeaderboardStore::new();
        store.record(purchase("0x0a", 5_000_000, 5, 1)).await;
        store.record(purchase("0x0a", 3_000_000, 3, 2)).await;
        store.record(purchase("0x0b", 9_000_000, 9, 3)).await;

        let top = store.top_purchasers(10).await;
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].address, "0x0b");
        assert_eq!(top[1].address, "0x0a");
        assert_eq!(top[1].total_usdt_spent, "8000000");
        assert_eq!(top[1].total_gt_received, "8");
        assert_eq!(top[1].purchase_count, 2);
    }

    #[tokio::test]
    async fn ranking_breaks_ties_by_wins_then_efficiency() {
        let store = LeaderboardStore::new();
        for (m, winner, loser) in [
            ("0xm1", "0x01", "0x0a"),
            ("0xm2", "0x02", "0x0b"),
            ("0xm3", "0x02", "0x01"),
            ("0xm4", "0x03", "0x0c"),
        ] {
            store.record(staked(m, winner, 1)).await;
            store.record(staked(m, loser, 2)).await;
            store.record(settled(m, winner, 10, 3)).await;
        }

        let top = store.top_players(3).await;
        // gt_won: 0x02 = 20, then 0x01 and 0x03 tie at 10 with one win
        // each; 0x03 got there in fewer matches.
        assert_eq!(top[0].address, "0x02");
        assert_eq!(top[1].address, "0x03");
        assert_eq!(top[2].address, "0x01");
    }

    #[tokio::test]
    async fn player_profile_merges_gaming_and_purchases() {
        let store = LeaderboardStore::new();
        store.record(purchase("0x0a", 1_000_000, 1, 1)).await;
        store.record(staked("0xm", "0x0b", 2)).await;
        store.record(staked("0xm", "0x0c", 3)).await;
        store.record(settled("0xm", "0x0b", 4, 4)).await;

        let buyer_only = store.player("0x0A").await.unwrap();
        assert!(buyer_only.gaming.is_none());
        assert_eq!(buyer_only.purchases.unwrap().purchase_count, 1);

        let gamer_only = store.player("0x0b").await.unwrap();
        assert_eq!(gamer_only.gaming.unwrap().wins, 1);
        assert!(gamer_only.purchases.is_none());

        assert!(store.player("0x0f").await.is_none());
    }

    #[tokio::test]
    async fn event_history_is_capped_and_served_newest_first() {
        let store = LeaderboardStore::new();
        for i in 0..(EVENT_HISTORY_LIMIT as u64 + 5) {
            store
                .record(event(
                    ChainEventKind::Refunded {
                        match_id: format!("0x{:04x}", i),
                    },
                    i,
                ))
                .await;
        }
        assert_eq!(
            store.totals().await.events.total_events,
            EVENT_HISTORY_LIMIT
        );

        let recent = store.recent_events(3, None).await;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].block_number, EVENT_HISTORY_LIMIT as u64 + 4);
        assert!(recent[0].block_number > recent[2].block_number);
    }

    #[tokio::test]
    async fn event_filter_narrows_by_type_name() {
        let store = LeaderboardStore::new();
        store.record(purchase("0x0a", 1, 1, 1)).await;
        store.record(staked("0xm", "0x0b", 2)).await;
        store.record(purchase("0x0a", 2, 2, 3)).await;

        let purchases = store.recent_events(10, Some("Purchase")).await;
        assert_eq!(purchases.len(), 2);
        assert!(store.recent_events(10, Some("Settled")).await.is_empty());
    }

    #[tokio::test]
    async fn totals_aggregate_across_players_and_events() {
        let store = LeaderboardStore::new();
        store.record(staked("0xm", "0x01", 1)).await;
        store.record(staked("0xm", "0x02", 2)).await;
        store.record(settled("0xm", "0x01", 20, 3)).await;
        store.record(purchase("0x03", 7_000_000, 7, 4)).await;

        let totals = store.totals().await;
        assert_eq!(totals.gaming.total_players, 2);
        assert_eq!(totals.gaming.total_matches, 1);
        assert_eq!(totals.gaming.total_gt_won, "20");
        assert_eq!(totals.gaming.total_gt_lost, "10");
        assert_eq!(totals.purchases.total_purchasers, 1);
        assert_eq!(totals.purchases.total_purchases, 1);
        assert_eq!(totals.events.total_events, 4);
        assert_eq!(totals.events.event_types.staked, 2);
        assert_eq!(totals.events.event_types.settled, 1);
        assert_eq!(totals.events.event_types.purchase, 1);
    }

    #[test]
    fn events_serialize_with_contract_tag_and_decimal_amounts() {
        let json = serde_json::to_value(settled("0xabcd", "0x01", 20, 7)).unwrap();
        assert_eq!(json["type"], "Settled");
        assert_eq!(json["amount"], "20");
        assert_eq!(json["block_number"], 7);
    }

    #[test]
    fn backoff_grows_and_stays_capped() {
        assert_eq!(transient_backoff_secs(15, 1), 15);
        assert_eq!(transient_backoff_secs(15, 2), 30);
        assert_eq!(transient_backoff_secs(15, 10), 300);
        // Interval above the cap never panics and pins to the cap.
        assert_eq!(transient_backoff_secs(600, 1), 300);
    }
}
