use std::str::FromStr;
use std::sync::Arc;

use ethers::{
    core::utils::keccak256,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, U256},
};

use crate::{
    config::Config,
    error::{AppError, Result},
};

/// Escrow-side chain operations the game flow depends on. The registry and
/// the matchmaking queue only ever see this trait, so tests can swap in a
/// recording fake.
#[async_trait::async_trait]
pub trait EscrowBridge: Send + Sync {
    async fn gt_balance(&self, address: &str) -> Result<U256>;

    async fn register_match(
        &self,
        match_id: &str,
        player1: &str,
        player2: &str,
        stake_wei: U256,
    ) -> Result<String>;

    async fn commit_result(&self, match_id: &str, winner: &str) -> Result<String>;
}

pub type Operator = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Raw `matches(bytes32)` record as stored by the escrow contract.
#[derive(Debug, Clone)]
pub struct OnchainMatchRecord {
    pub p1: Address,
    pub p2: Address,
    pub stake: U256,
    pub start_time: U256,
    pub status: u8,
    pub winner: Address,
}

/// Signing handle to the four game contracts. All writes go out under the
/// operator key from the config.
pub struct ChainClient {
    client: Arc<Operator>,
    operator: Address,
    game_token: GameToken<Operator>,
    mock_usdt: MockUsdt<Operator>,
    token_store: TokenStore<Operator>,
    play_game: PlayGame<Operator>,
}

impl ChainClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = Provider::<Http>::try_from(&config.rpc_url)
            .map_err(|e| AppError::Internal(format!("Invalid RPC URL: {}", e)))?;
        let wallet = config
            .operator_private_key
            .parse::<LocalWallet>()
            .map_err(|e| AppError::Internal(format!("Invalid operator key: {}", e)))?
            .with_chain_id(config.chain_id);
        let operator = wallet.address();
        let client = Arc::new(SignerMiddleware::new(provider, wallet));

        Ok(Self {
            game_token: GameToken::new(
                parse_address(&config.game_token_address)?,
                client.clone(),
            ),
            mock_usdt: MockUsdt::new(parse_address(&config.mock_usdt_address)?, client.clone()),
            token_store: TokenStore::new(
                parse_address(&config.token_store_address)?,
                client.clone(),
            ),
            play_game: PlayGame::new(parse_address(&config.play_game_address)?, client.clone()),
            client,
            operator,
        })
    }

    pub fn operator_address(&self) -> Address {
        self.operator
    }

    pub fn play_game(&self) -> &PlayGame<Operator> {
        &self.play_game
    }

    pub fn token_store(&self) -> &TokenStore<Operator> {
        &self.token_store
    }

    pub async fn block_number(&self) -> Result<u64> {
        self.client
            .get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(|e| AppError::ChainCall(e.to_string()))
    }

    pub async fn gt_balance_of(&self, address: &str) -> Result<U256> {
        let owner = parse_address(address)?;
        self.game_token
            .balance_of(owner)
            .call()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))
    }

    pub async fn usdt_balance_of(&self, address: &str) -> Result<U256> {
        let owner = parse_address(address)?;
        self.mock_usdt
            .balance_of(owner)
            .call()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))
    }

    /// GT allowance granted by `owner` to the escrow contract.
    pub async fn gt_allowance_of(&self, owner: &str) -> Result<U256> {
        let owner = parse_address(owner)?;
        self.game_token
            .allowance(owner, self.play_game.address())
            .call()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))
    }

    /// USDT allowance granted by `owner` to the token store.
    pub async fn usdt_allowance_of(&self, owner: &str) -> Result<U256> {
        let owner = parse_address(owner)?;
        self.mock_usdt
            .allowance(owner, self.token_store.address())
            .call()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))
    }

    pub async fn mint_usdt(&self, address: &str, amount: U256) -> Result<String> {
        let to = parse_address(address)?;
        let call = self.mock_usdt.mint(to, amount);
        let pending = call
            .send()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        let tx_hash = pending.tx_hash();
        pending
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        Ok(format!("{:#x}", tx_hash))
    }

    /// Buys GT with the operator's USDT. Balance and allowance are checked
    /// up front so callers get a typed error instead of a revert string.
    pub async fn buy_gt(&self, usdt_amount: U256) -> Result<String> {
        let balance = self
            .mock_usdt
            .balance_of(self.operator)
            .call()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        if balance < usdt_amount {
            return Err(AppError::InsufficientBalance);
        }
        let allowance = self
            .mock_usdt
            .allowance(self.operator, self.token_store.address())
            .call()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        if allowance < usdt_amount {
            return Err(AppError::InsufficientAllowance);
        }

        let call = self.token_store.buy(usdt_amount);
        let pending = call
            .send()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        let tx_hash = pending.tx_hash();
        pending
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        Ok(format!("{:#x}", tx_hash))
    }

    /// Reads the escrow record for a match. A zeroed p1 means the contract
    /// never saw this id.
    pub async fn onchain_match(&self, match_id: &str) -> Result<OnchainMatchRecord> {
        let id = encode_match_id(match_id);
        let (p1, p2, stake, start_time, status, winner) = self
            .play_game
            .matches(id)
            .call()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        if p1 == Address::zero() {
            return Err(AppError::NotFound("Match not found".to_string()));
        }
        Ok(OnchainMatchRecord {
            p1,
            p2,
            stake,
            start_time,
            status,
            winner,
        })
    }

    pub async fn refund_match(&self, match_id: &str) -> Result<String> {
        let id = encode_match_id(match_id);
        let call = self.play_game.refund(id);
        let pending = call
            .send()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        let tx_hash = pending.tx_hash();
        pending
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        Ok(format!("{:#x}", tx_hash))
    }
}

#[async_trait::async_trait]
impl EscrowBridge for ChainClient {
    async fn gt_balance(&self, address: &str) -> Result<U256> {
        self.gt_balance_of(address).await
    }

    async fn register_match(
        &self,
        match_id: &str,
        player1: &str,
        player2: &str,
        stake_wei: U256,
    ) -> Result<String> {
        let id = encode_match_id(match_id);
        let p1 = parse_address(player1)?;
        let p2 = parse_address(player2)?;
        let call = self.play_game.create_match(id, p1, p2, stake_wei);
        let pending = call
            .send()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        let tx_hash = pending.tx_hash();
        pending
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        Ok(format!("{:#x}", tx_hash))
    }

    async fn commit_result(&self, match_id: &str, winner: &str) -> Result<String> {
        let id = encode_match_id(match_id);
        let winner = parse_address(winner)?;
        let call = self.play_game.commit_result(id, winner);
        let pending = call
            .send()
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        let tx_hash = pending.tx_hash();
        pending
            .await
            .map_err(|e| AppError::ChainCall(e.to_string()))?;
        Ok(format!("{:#x}", tx_hash))
    }
}

pub fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value.trim())
        .map_err(|_| AppError::InvalidInput("Invalid EVM address".to_string()))
}

/// Match ids are readable strings longer than 31 bytes, so they are hashed
/// into the bytes32 the contracts key on rather than zero-padded.
pub fn encode_match_id(match_id: &str) -> [u8; 32] {
    keccak256(match_id.as_bytes())
}

ethers::contract::abigen!(
    GameToken,
    r#"[
        function balanceOf(address) view returns (uint256)
        function allowance(address, address) view returns (uint256)
    ]"#
);

ethers::contract::abigen!(
    MockUsdt,
    r#"[
        function balanceOf(address) view returns (uint256)
        function allowance(address, address) view returns (uint256)
        function mint(address, uint256)
    ]"#
);

ethers::contract::abigen!(
    TokenStore,
    r#"[
        function buy(uint256)
        event Purchase(address indexed buyer, uint256 usdtAmount, uint256 gtOut)
    ]"#
);

ethers::contract::abigen!(
    PlayGame,
    r#"[
        function createMatch(bytes32, address, address, uint256)
        function commitResult(bytes32, address)
        function refund(bytes32)
        function matches(bytes32) view returns (address, address, uint256, uint256, uint8, address)
        event MatchCreated(bytes32 indexed matchId, address p1, address p2, uint256 stake)
        event Staked(bytes32 indexed matchId, address indexed player)
        event Settled(bytes32 indexed matchId, address indexed winner, uint256 amount)
        event Refunded(bytes32 indexed matchId)
    ]"#
);
