//! Environment-driven configuration for the orchestrator binary.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result, bail};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub rpc_url: url::Url,
    pub faucet_private_key: String,
    pub funding_token: Address,
    pub funding_decimals: u32,
    pub swap_router: Address,
    pub room_registry: Address,
    pub agent_registry: Address,
    pub llm_base_url: String,
    pub llm_model: String,
    pub ipfs_gateway: String,
    pub wallet_store_path: PathBuf,
    pub listen_addr: String,
    pub max_turns: u32,
    pub slippage_bps: u32,
    pub faucet_min_balance: U256,
    pub event_poll_interval: Duration,
    /// Ticker → token address, parsed from `TOKENS=USDT=0x..,WBTC=0x..`.
    pub tokens: HashMap<String, Address>,
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            rpc_url: env_or("RPC_URL", "http://localhost:8545")
                .parse()
                .context("RPC_URL is not a valid URL")?,
            faucet_private_key: required("FAUCET_PRIVATE_KEY")?,
            funding_token: parse_address(&required("FUNDING_TOKEN_ADDRESS")?)?,
            funding_decimals: parse_or("FUNDING_DECIMALS", 6)?,
            swap_router: parse_address(&required("SWAP_ROUTER_ADDRESS")?)?,
            room_registry: parse_address(&required("ROOM_REGISTRY_ADDRESS")?)?,
            agent_registry: parse_address(&required("AGENT_REGISTRY_ADDRESS")?)?,
            llm_base_url: env_or("LLM_BASE_URL", "http://localhost:8080"),
            llm_model: env_or("LLM_MODEL", "gpt-4o-mini"),
            ipfs_gateway: env_or("IPFS_GATEWAY", "https://ipfs.io"),
            wallet_store_path: env_or("WALLET_STORE_PATH", "room-wallets.json").into(),
            listen_addr: env_or("LISTEN_ADDR", "0.0.0.0:3001"),
            max_turns: parse_or("MAX_TURNS", 5)?,
            slippage_bps: parse_or("SLIPPAGE_BPS", 5000)?,
            faucet_min_balance: U256::from_str_radix(
                &env_or("FAUCET_MIN_BALANCE", "10000000000000000"),
                10,
            )
            .context("FAUCET_MIN_BALANCE is not a decimal integer")?,
            event_poll_interval: Duration::from_secs(parse_or("EVENT_POLL_SECS", 10)?),
            tokens: parse_tokens(&env_or("TOKENS", ""))?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{key} is invalid")),
        Err(_) => Ok(default),
    }
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.parse()
        .with_context(|| format!("Invalid address: {raw}"))
}

fn parse_tokens(raw: &str) -> Result<HashMap<String, Address>> {
    let mut tokens = HashMap::new();
    for pair in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let Some((ticker, address)) = pair.split_once('=') else {
            bail!("TOKENS entry missing '=': {pair}");
        };
        tokens.insert(
            ticker.trim().to_uppercase(),
            parse_address(address.trim())?,
        );
    }
    Ok(tokens)
}
