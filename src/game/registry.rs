use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ethers::types::U256;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use tokio::time::{sleep, Duration};

use crate::{
    constants::MATCH_ID_PREFIX,
    error::{AppError, Result},
    game::addr_eq,
    game::board::{Board, Mark, Outcome},
    game::matchmaking::QueueEntry,
    models::{MatchView, MoveView},
    services::onchain::EscrowBridge,
    services::session_gateway::{ServerEvent, SessionGateway},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Created,
    Staking,
    Playing,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Created => "created",
            MatchStatus::Staking => "staking",
            MatchStatus::Playing => "playing",
            MatchStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MoveRecord {
    pub player: String,
    pub position: u8,
    pub mark: Mark,
    pub timestamp: DateTime<Utc>,
}

/// One tic-tac-toe match. player1 opens and plays X; player2 plays O.
#[derive(Debug, Clone)]
pub struct Match {
    pub id: String,
    pub player1: String,
    pub player2: String,
    pub stake: String,
    pub stake_wei: U256,
    pub status: MatchStatus,
    pub board: Board,
    pub current_turn: String,
    pub winner: Option<String>,
    pub moves: Vec<MoveRecord>,
    pub player1_staked: bool,
    pub player2_staked: bool,
    pub player1_stake_tx: Option<String>,
    pub player2_stake_tx: Option<String>,
    pub create_tx: Option<String>,
    pub settle_tx: Option<String>,
    pub create_error: Option<String>,
    pub settle_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

struct AppliedMove {
    mark: Mark,
    finished: bool,
}

impl Match {
    fn new(id: &str, player1: &str, player2: &str, stake: &str, stake_wei: U256) -> Self {
        Self {
            id: id.to_string(),
            player1: player1.to_string(),
            player2: player2.to_string(),
            stake: stake.to_string(),
            stake_wei,
            status: MatchStatus::Created,
            board: Board::new(),
            current_turn: player1.to_string(),
            winner: None,
            moves: Vec::new(),
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
        }
    }

    /// Records a client-asserted stake. Returns true when this was the
    /// second confirmation and the match just flipped to `playing`.
    fn confirm_stake(&mut self, player: &str, tx_hash: &str) -> Result<bool> {
        if !matches!(self.status, MatchStatus::Created | MatchStatus::Staking) {
            return Ok(false);
        }
        if addr_eq(player, &self.player1) {
            self.player1_staked = true;
            self.player1_stake_tx = Some(tx_hash.to_string());
        } else if addr_eq(player, &self.player2) {
            self.player2_staked = true;
            self.player2_stake_tx = Some(tx_hash.to_string());
        } else {
            return Err(AppError::InvalidInput(
                "Not a participant of this match".to_string(),
            ));
        }

        if self.player1_staked && self.player2_staked {
            self.status = MatchStatus::Playing;
            self.started_at = Some(Utc::now());
            Ok(true)
        } else {
            self.status = MatchStatus::Staking;
            Ok(false)
        }
    }

    /// Turn check runs before the status check, mirroring the exposed
    /// rejection order (OutOfTurn for strangers too).
    fn apply_move(&mut self, player: &str, position: i64) -> Result<AppliedMove> {
        if !addr_eq(player, &self.current_turn) {
            return Err(AppError::OutOfTurn);
        }
        if self.status != MatchStatus::Playing {
            return Err(AppError::NotPlayable);
        }
        if !(0..=8).contains(&position) {
            return Err(AppError::InvalidPosition);
        }

        let mark = if addr_eq(player, &self.player1) {
            Mark::X
        } else {
            Mark::O
        };
        self.board.place(position as usize, mark)?;
        let acting = self.current_turn.clone();
        self.moves.push(MoveRecord {
            player: acting,
            position: position as u8,
            mark,
            timestamp: Utc::now(),
        });

        match self.board.evaluate() {
            Outcome::Won(winning_mark) => {
                self.status = MatchStatus::Finished;
                self.winner = Some(if winning_mark == Mark::X {
                    self.player1.clone()
                } else {
                    self.player2.clone()
                });
                self.finished_at = Some(Utc::now());
            }
            Outcome::Draw => {
                self.status = MatchStatus::Finished;
                self.winner = None;
                self.finished_at = Some(Utc::now());
            }
            Outcome::InProgress => {
                self.current_turn = if addr_eq(&self.current_turn, &self.player1) {
                    self.player2.clone()
                } else {
                    self.player1.clone()
                };
            }
        }

        Ok(AppliedMove {
            mark,
            finished: self.status == MatchStatus::Finished,
        })
    }

    pub fn to_view(&self) -> MatchView {
        MatchView {
            match_id: self.id.clone(),
            player1: self.player1.clone(),
            player2: self.player2.clone(),
            stake: self.stake.clone(),
            stake_wei: self.stake_wei.to_string(),
            status: self.status.as_str().to_string(),
            board: self
                .board
                .cells()
                .iter()
                .map(|cell| cell.map(|mark| mark.as_str().to_string()))
                .collect(),
            current_turn: self.current_turn.clone(),
            winner: self.winner.clone(),
            draw: self.status == MatchStatus::Finished && self.winner.is_none(),
            moves: self
                .moves
                .iter()
                .map(|m| MoveView {
                    player: m.player.clone(),
                    position: m.position,
                    mark: m.mark.as_str().to_string(),
                    timestamp: m.timestamp,
                })
                .collect(),
            player1_staked: self.player1_staked,
            player2_staked: self.player2_staked,
            player1_stake_tx: self.player1_stake_tx.clone(),
            player2_stake_tx: self.player2_stake_tx.clone(),
            create_tx: self.create_tx.clone(),
            settle_tx: self.settle_tx.clone(),
            create_error: self.create_error.clone(),
            settle_error: self.settle_error.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

fn generate_match_id() -> String {
    format!("{}{}", MATCH_ID_PREFIX, hex::encode(rand::random::<[u8; 16]>()))
}

/// Single source of truth for match lifecycle. All in-memory mutations
/// happen under one write-lock acquisition; bridge calls never run under
/// the lock, so readers only ever observe complete interim states.
pub struct MatchRegistry {
    bridge: Arc<dyn EscrowBridge>,
    gateway: Arc<SessionGateway>,
    matches: Arc<RwLock<HashMap<String, Match>>>,
    cleanups: Arc<RwLock<HashMap<String, AbortHandle>>>,
    retention: Duration,
}

impl MatchRegistry {
    pub fn new(
        bridge: Arc<dyn EscrowBridge>,
        gateway: Arc<SessionGateway>,
        retention_secs: u64,
    ) -> Self {
        Self {
            bridge,
            gateway,
            matches: Arc::new(RwLock::new(HashMap::new())),
            cleanups: Arc::new(RwLock::new(HashMap::new())),
            retention: Duration::from_secs(retention_secs),
        }
    }

    /// Creates the in-memory record, then registers the match on-chain.
    /// A failed chain call leaves the match usable but annotated; both
    /// players are notified either way.
    pub async fn create_match(
        &self,
        player1: QueueEntry,
        player2: QueueEntry,
        stake: &str,
        stake_wei: U256,
    ) -> Result<MatchView> {
        let match_id = generate_match_id();
        {
            let mut matches = self.matches.write().await;
            matches.insert(
                match_id.clone(),
                Match::new(
                    &match_id,
                    &player1.address,
                    &player2.address,
                    stake,
                    stake_wei,
                ),
            );
        }
        tracing::info!(
            "Match created: {} between {} and {}",
            match_id,
            player1.address,
            player2.address
        );

        match self
            .bridge
            .register_match(&match_id, &player1.address, &player2.address, stake_wei)
            .await
        {
            Ok(tx_hash) => {
                tracing::info!("Match {} registered on chain: {}", match_id, tx_hash);
                let mut matches = self.matches.write().await;
                if let Some(record) = matches.get_mut(&match_id) {
                    record.create_tx = Some(tx_hash);
                }
            }
            Err(e) => {
                tracing::error!("On-chain create failed for {}: {}", match_id, e);
                let mut matches = self.matches.write().await;
                if let Some(record) = matches.get_mut(&match_id) {
                    record.create_error = Some(e.to_string());
                }
            }
        }

        let view = self.get(&match_id).await?;
        for (entry, opponent) in [
            (&player1, &player2.address),
            (&player2, &player1.address),
        ] {
            if let Some(session_id) = entry.session_id.as_deref() {
                self.gateway
                    .notify_session(
                        session_id,
                        ServerEvent::MatchFound {
                            match_id: match_id.clone(),
                            opponent: opponent.clone(),
                            game: view.clone(),
                        },
                    )
                    .await;
            }
        }
        Ok(view)
    }

    pub async fn get(&self, match_id: &str) -> Result<MatchView> {
        let matches = self.matches.read().await;
        matches
            .get(match_id)
            .map(Match::to_view)
            .ok_or_else(|| AppError::NotFound("Game not found".to_string()))
    }

    /// Applies a client-asserted stake confirmation. On the second
    /// confirmation the match starts and the room is told.
    pub async fn confirm_stake(
        &self,
        match_id: &str,
        player: &str,
        tx_hash: &str,
    ) -> Result<MatchView> {
        let (started, view) = {
            let mut matches = self.matches.write().await;
            let record = matches
                .get_mut(match_id)
                .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;
            let started = record.confirm_stake(player, tx_hash)?;
            (started, record.to_view())
        };

        if started {
            tracing::info!("Game {} started, both players staked", match_id);
            self.gateway
                .broadcast_room(
                    match_id,
                    ServerEvent::GameStarted {
                        match_id: match_id.to_string(),
                        game: view.clone(),
                    },
                )
                .await;
        }
        Ok(view)
    }

    /// Validates and applies one move, broadcasts it, and settles when the
    /// move ended the game.
    pub async fn submit_move(
        &self,
        match_id: &str,
        player: &str,
        position: i64,
    ) -> Result<MatchView> {
        let (applied, view) = {
            let mut matches = self.matches.write().await;
            let record = matches
                .get_mut(match_id)
                .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;
            let applied = record.apply_move(player, position)?;
            (applied, record.to_view())
        };

        self.gateway
            .broadcast_room(
                match_id,
                ServerEvent::GameMove {
                    match_id: match_id.to_string(),
                    player: player.to_string(),
                    position: position as u8,
                    mark: applied.mark.as_str().to_string(),
                    game: view.clone(),
                },
            )
            .await;

        if applied.finished {
            return self.settle(match_id).await;
        }
        Ok(view)
    }

    /// Pays out a decided match through the bridge; draws skip the chain
    /// call entirely and leave the stakes escrowed. Always broadcasts the
    /// end of the game and schedules removal of the record.
    pub async fn settle(&self, match_id: &str) -> Result<MatchView> {
        let winner = {
            let matches = self.matches.read().await;
            let record = matches
                .get(match_id)
                .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;
            record.winner.clone()
        };
        tracing::info!(
            "Game {} ended, winner: {}",
            match_id,
            winner.as_deref().unwrap_or("draw")
        );

        if let Some(winner_addr) = winner {
            match self.bridge.commit_result(match_id, &winner_addr).await {
                Ok(tx_hash) => {
                    tracing::info!("Payout complete for {}: {}", winner_addr, tx_hash);
                    let mut matches = self.matches.write().await;
                    if let Some(record) = matches.get_mut(match_id) {
                        record.settle_tx = Some(tx_hash);
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to commit result for {}: {}", match_id, e);
                    let mut matches = self.matches.write().await;
                    if let Some(record) = matches.get_mut(match_id) {
                        record.settle_error = Some(e.to_string());
                    }
                }
            }
        }

        let view = self.get(match_id).await?;
        self.gateway
            .broadcast_room(
                match_id,
                ServerEvent::GameEnded {
                    match_id: match_id.to_string(),
                    winner: view.winner.clone(),
                    draw: view.draw,
                    payout_tx: view.settle_tx.clone(),
                    game: view.clone(),
                },
            )
            .await;

        self.schedule_cleanup(match_id).await;
        Ok(view)
    }

    /// Keeps the finished record readable for a retention window, then
    /// drops it together with its room.
    async fn schedule_cleanup(&self, match_id: &str) {
        let id = match_id.to_string();
        let matches = Arc::clone(&self.matches);
        let cleanups = Arc::clone(&self.cleanups);
        let gateway = Arc::clone(&self.gateway);
        let retention = self.retention;

        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            sleep(retention).await;
            matches.write().await.remove(&task_id);
            gateway.close_room(&task_id).await;
            cleanups.write().await.remove(&task_id);
            tracing::debug!("Retired match {}", task_id);
        });

        let mut cleanups = self.cleanups.write().await;
        if let Some(previous) = cleanups.insert(id, handle.abort_handle()) {
            previous.abort();
        }
    }

    /// Aborts a pending removal.
    pub async fn cancel_cleanup(&self, match_id: &str) -> bool {
        let mut cleanups = self.cleanups.write().await;
        match cleanups.remove(match_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drops a record right away instead of waiting out the retention
    /// window. Called after an on-chain refund dissolves the escrow.
    pub async fn retire(&self, match_id: &str) -> bool {
        self.cancel_cleanup(match_id).await;
        let removed = self.matches.write().await.remove(match_id).is_some();
        if removed {
            self.gateway.close_room(match_id).await;
            tracing::debug!("Retired match {}", match_id);
        }
        removed
    }

    pub async fn match_count(&self) -> usize {
        self.matches.read().await.len()
    }

    pub async fn finished_count(&self) -> usize {
        let matches = self.matches.read().await;
        matches
            .values()
            .filter(|m| m.status == MatchStatus::Finished)
            .count()
    }
}
