use serde::Deserialize;
use std::env;

use crate::constants::{
    DEFAULT_FAUCET_USDT_AMOUNT, DEFAULT_INDEXER_INTERVAL_SECS, DEFAULT_MATCH_RETENTION_SECS,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Blockchain
    pub rpc_url: String,
    pub chain_id: u64,
    pub operator_private_key: String,

    // Contract Addresses
    pub game_token_address: String,
    pub mock_usdt_address: String,
    pub token_store_address: String,
    pub play_game_address: String,

    // Match lifecycle
    pub match_retention_secs: u64,

    // Faucet
    pub faucet_usdt_amount: String,

    // Leaderboard indexer
    pub indexer_interval_secs: u64,
    pub indexer_start_block: Option<u64>,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("GAME_SERVER_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:8545".to_string()),
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "31337".to_string())
                .parse()?,
            operator_private_key: env::var("PRIVATE_KEY")?,

            game_token_address: env::var("GAMETOKEN_ADDR")?,
            mock_usdt_address: env::var("MOCKUSDT_ADDR")?,
            token_store_address: env::var("TOKENSTORE_ADDR")?,
            play_game_address: env::var("PLAYGAME_ADDR")?,

            match_retention_secs: env::var("MATCH_RETENTION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MATCH_RETENTION_SECS),

            faucet_usdt_amount: env::var("FAUCET_USDT_AMOUNT")
                .unwrap_or_else(|_| DEFAULT_FAUCET_USDT_AMOUNT.to_string()),

            indexer_interval_secs: env::var("INDEXER_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_INDEXER_INTERVAL_SECS),
            indexer_start_block: env::var("INDEXER_START_BLOCK")
                .ok()
                .and_then(|s| s.parse().ok()),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc_url.trim().is_empty() {
            anyhow::bail!("RPC_URL is empty");
        }
        if url::Url::parse(&self.rpc_url).is_err() {
            anyhow::bail!("RPC_URL is not a valid URL: {}", self.rpc_url);
        }
        if self.operator_private_key.trim().is_empty() {
            anyhow::bail!("PRIVATE_KEY is empty");
        }

        for (name, addr) in [
            ("GAMETOKEN_ADDR", &self.game_token_address),
            ("MOCKUSDT_ADDR", &self.mock_usdt_address),
            ("TOKENSTORE_ADDR", &self.token_store_address),
            ("PLAYGAME_ADDR", &self.play_game_address),
        ] {
            if !is_evm_address(addr) {
                anyhow::bail!("{} is not a valid EVM address: {}", name, addr);
            }
            if addr.trim_start_matches("0x").chars().all(|c| c == '0') {
                tracing::warn!("Using placeholder address for {}", name);
            }
        }

        if self.match_retention_secs == 0 {
            tracing::warn!("MATCH_RETENTION_SECS is 0; finished matches are removed immediately");
        }

        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn is_testnet(&self) -> bool {
        if self.environment == "development" || self.environment == "testnet" {
            return true;
        }
        // Hardhat / Anvil local chains
        self.chain_id == 31337 || self.chain_id == 1337
    }
}

pub fn is_evm_address(value: &str) -> bool {
    let normalized = value.trim();
    normalized.starts_with("0x")
        && normalized.len() == 42
        && normalized[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337,
            operator_private_key: "0xabc123".to_string(),
            game_token_address: format!("0x{}", "1".repeat(40)),
            mock_usdt_address: format!("0x{}", "2".repeat(40)),
            token_store_address: format!("0x{}", "3".repeat(40)),
            play_game_address: format!("0x{}", "4".repeat(40)),
            match_retention_secs: 300,
            faucet_usdt_amount: "1000".to_string(),
            indexer_interval_secs: 15,
            indexer_start_block: None,
            cors_allowed_origins: "*".to_string(),
        }
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_contract_address() {
        let mut config = test_config();
        config.play_game_address = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_rpc_url() {
        let mut config = test_config();
        config.rpc_url = "definitely not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn local_chain_counts_as_testnet() {
        let mut config = test_config();
        config.environment = "production".to_string();
        assert!(config.is_testnet());
        config.chain_id = 1;
        assert!(!config.is_testnet());
    }

    #[test]
    fn is_evm_address_checks_shape() {
        assert!(is_evm_address(&format!("0x{}", "a".repeat(40))));
        assert!(!is_evm_address("0x123"));
        assert!(!is_evm_address(&format!("0x{}", "g".repeat(40))));
        assert!(!is_evm_address(&"a".repeat(42)));
    }
}
