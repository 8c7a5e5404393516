use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ethers::types::U256;
use ethers::utils::parse_ether;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::{
    config::is_evm_address,
    error::{AppError, Result},
    game::addr_eq,
    services::onchain::EscrowBridge,
};

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub address: String,
    pub session_id: Option<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum JoinOutcome {
    Queued {
        tier: String,
        position: usize,
        queue_size: usize,
    },
    Paired {
        tier: String,
        stake_wei: U256,
        player1: QueueEntry,
        player2: QueueEntry,
    },
}

/// Per-stake-tier FIFO queues. The tier key is the stake string as
/// submitted; it is only normalized to wei when two players pair up.
pub struct MatchmakingQueue {
    bridge: Arc<dyn EscrowBridge>,
    queues: RwLock<HashMap<String, VecDeque<QueueEntry>>>,
}

impl MatchmakingQueue {
    pub fn new(bridge: Arc<dyn EscrowBridge>) -> Self {
        Self {
            bridge,
            queues: RwLock::new(HashMap::new()),
        }
    }

    /// Queues the player, or pairs them with the longest-waiting entrant of
    /// the same tier. Re-joining while already queued (any tier) returns the
    /// existing position without inserting a duplicate.
    pub async fn join(
        &self,
        address: &str,
        stake: &str,
        session_id: Option<String>,
    ) -> Result<JoinOutcome> {
        let address = address.trim();
        if !is_evm_address(address) {
            return Err(AppError::InvalidInput("Invalid player address".to_string()));
        }

        let tier = stake.trim().to_string();
        let amount = Decimal::from_str(&tier)
            .map_err(|_| AppError::InvalidInput("Invalid stake amount".to_string()))?;
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "Stake must be a positive amount".to_string(),
            ));
        }
        let stake_wei = parse_ether(tier.as_str())
            .map_err(|_| AppError::InvalidInput("Invalid stake amount".to_string()))?;

        // Balance gate happens before touching the queues, outside the lock.
        let balance = self.bridge.gt_balance(address).await?;
        if balance < stake_wei {
            return Err(AppError::InsufficientBalance);
        }

        let mut queues = self.queues.write().await;

        for (queued_tier, queue) in queues.iter() {
            if let Some(index) = queue.iter().position(|e| addr_eq(&e.address, address)) {
                return Ok(JoinOutcome::Queued {
                    tier: queued_tier.clone(),
                    position: index + 1,
                    queue_size: queue.len(),
                });
            }
        }

        let queue = queues.entry(tier.clone()).or_default();
        queue.push_back(QueueEntry {
            address: address.to_string(),
            session_id,
            joined_at: Utc::now(),
        });

        if queue.len() >= 2 {
            let player1 = queue.pop_front().ok_or_else(|| {
                AppError::Internal("Matchmaking queue emptied mid-pairing".to_string())
            })?;
            let player2 = queue.pop_front().ok_or_else(|| {
                AppError::Internal("Matchmaking queue emptied mid-pairing".to_string())
            })?;
            if queue.is_empty() {
                queues.remove(&tier);
            }
            tracing::info!(
                "Paired {} vs {} at stake {}",
                player1.address,
                player2.address,
                tier
            );
            return Ok(JoinOutcome::Paired {
                tier,
                stake_wei,
                player1,
                player2,
            });
        }

        let position = queue.len();
        let queue_size = queue.len();
        Ok(JoinOutcome::Queued {
            tier,
            position,
            queue_size,
        })
    }

    /// Removes the player from whichever tier holds them. Idempotent.
    pub async fn leave(&self, address: &str) -> bool {
        let mut queues = self.queues.write().await;
        let mut removed = false;
        queues.retain(|_, queue| {
            if !removed {
                if let Some(index) = queue.iter().position(|e| addr_eq(&e.address, address)) {
                    queue.remove(index);
                    removed = true;
                }
            }
            !queue.is_empty()
        });
        removed
    }

    /// Drops every entry tied to a disconnected session.
    pub async fn remove_session(&self, session_id: &str) {
        let mut queues = self.queues.write().await;
        queues.retain(|_, queue| {
            queue.retain(|e| e.session_id.as_deref() != Some(session_id));
            !queue.is_empty()
        });
    }

    pub async fn queued_players(&self) -> usize {
        let queues = self.queues.read().await;
        queues.values().map(|q| q.len()).sum()
    }

    pub async fn sizes_by_tier(&self) -> HashMap<String, usize> {
        let queues = self.queues.read().await;
        queues
            .iter()
            .map(|(tier, queue)| (tier.clone(), queue.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticBridge {
        balance: U256,
    }

    #[async_trait::async_trait]
    impl EscrowBridge for StaticBridge {
        async fn gt_balance(&self, _address: &str) -> Result<U256> {
            Ok(self.balance)
        }

        async fn register_match(
            &self,
            _match_id: &str,
            _player1: &str,
            _player2: &str,
            _stake_wei: U256,
        ) -> Result<String> {
            Ok("0xcreate".to_string())
        }

        async fn commit_result(&self, _match_id: &str, _winner: &str) -> Result<String> {
            Ok("0xsettle".to_string())
        }
    }

    fn queue_with_balance(gt: &str) -> MatchmakingQueue {
        MatchmakingQueue::new(Arc::new(StaticBridge {
            balance: parse_ether(gt).unwrap(),
        }))
    }

    fn addr(n: u8) -> String {
        format!("0x{:040x}", n)
    }

    #[tokio::test]
    async fn second_entrant_pairs_with_first() {
        let queue = queue_with_balance("100");

        let first = queue.join(&addr(1), "10", None).await.unwrap();
        assert!(matches!(first, JoinOutcome::Queued { position: 1, .. }));

        let second = queue.join(&addr(2), "10", None).await.unwrap();
        match second {
            JoinOutcome::Paired {
                player1, player2, ..
            } => {
                assert_eq!(player1.address, addr(1));
                assert_eq!(player2.address, addr(2));
            }
            other => panic!("expected pairing, got {:?}", other),
        }
        assert_eq!(queue.queued_players().await, 0);
    }

    #[tokio::test]
    async fn third_entrant_starts_a_fresh_queue() {
        let queue = queue_with_balance("100");
        queue.join(&addr(1), "10", None).await.unwrap();
        queue.join(&addr(2), "10", None).await.unwrap();

        let third = queue.join(&addr(3), "10", None).await.unwrap();
        assert!(matches!(third, JoinOutcome::Queued { position: 1, .. }));
        assert_eq!(queue.queued_players().await, 1);
    }

    #[tokio::test]
    async fn rejoin_returns_existing_position_without_duplicate() {
        let queue = queue_with_balance("100");
        queue.join(&addr(1), "10", None).await.unwrap();

        let again = queue.join(&addr(1), "10", None).await.unwrap();
        match again {
            JoinOutcome::Queued {
                position,
                queue_size,
                ..
            } => {
                assert_eq!(position, 1);
                assert_eq!(queue_size, 1);
            }
            other => panic!("expected queued, got {:?}", other),
        }
        assert_eq!(queue.queued_players().await, 1);
    }

    #[tokio::test]
    async fn rejoin_on_other_tier_reports_original_tier() {
        let queue = queue_with_balance("100");
        queue.join(&addr(1), "10", None).await.unwrap();

        // Address comparison is case-insensitive.
        let shouted = addr(1).to_uppercase().replace("0X", "0x");
        let again = queue.join(&shouted, "25", None).await.unwrap();
        match again {
            JoinOutcome::Queued { tier, position, .. } => {
                assert_eq!(tier, "10");
                assert_eq!(position, 1);
            }
            other => panic!("expected queued, got {:?}", other),
        }
        assert_eq!(queue.queued_players().await, 1);
    }

    #[tokio::test]
    async fn tiers_do_not_cross_match() {
        let queue = queue_with_balance("100");
        queue.join(&addr(1), "10", None).await.unwrap();
        let other_tier = queue.join(&addr(2), "25", None).await.unwrap();
        assert!(matches!(other_tier, JoinOutcome::Queued { position: 1, .. }));
        assert_eq!(queue.queued_players().await, 2);
    }

    #[tokio::test]
    async fn join_rejects_malformed_input() {
        let queue = queue_with_balance("100");
        assert!(matches!(
            queue.join("nope", "10", None).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            queue.join(&addr(1), "-5", None).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            queue.join(&addr(1), "ten", None).await,
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(queue.queued_players().await, 0);
    }

    #[tokio::test]
    async fn join_rejects_insufficient_balance() {
        let queue = queue_with_balance("5");
        assert!(matches!(
            queue.join(&addr(1), "10", None).await,
            Err(AppError::InsufficientBalance)
        ));
        assert_eq!(queue.queued_players().await, 0);
    }

    #[tokio::test]
    async fn leave_is_idempotent() {
        let queue = queue_with_balance("100");
        queue.join(&addr(1), "10", None).await.unwrap();

        assert!(queue.leave(&addr(1)).await);
        assert!(!queue.leave(&addr(1)).await);
        assert_eq!(queue.queued_players().await, 0);
    }

    #[tokio::test]
    async fn disconnect_drops_session_entries() {
        let queue = queue_with_balance("100");
        queue
            .join(&addr(1), "10", Some("sess-1".to_string()))
            .await
            .unwrap();
        queue
            .join(&addr(2), "25", Some("sess-2".to_string()))
            .await
            .unwrap();

        queue.remove_session("sess-1").await;
        assert_eq!(queue.queued_players().await, 1);
        let sizes = queue.sizes_by_tier().await;
        assert_eq!(sizes.get("25"), Some(&1));
        assert!(!sizes.contains_key("10"));
    }
}
