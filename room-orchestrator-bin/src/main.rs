//! Service binary for the secure-room orchestrator.
//!
//! Wires the runtime together: faucet wallet on the configured chain, the
//! room wallet manager with its serialized faucet queue, the swap engine,
//! the conversation engine, and the public HTTP API. Rooms are picked up
//! from on-chain `RoomCreated` events.

mod config;
mod prompts;
mod room_events;

use std::sync::Arc;

use anyhow::{Context, Result};

use room_http_api::volume::VolumeBoard;
use room_http_api::{RoomApiState, build_router};
use room_runtime::chain::ChainClient;
use room_runtime::engine::{ConversationEngine, EngineConfig};
use room_runtime::ledger::RoomActionLedger;
use room_runtime::llm::ChatClient;
use room_runtime::participants::{AgentDirectory, OnChainDirectory, ParticipantResolver};
use room_runtime::prompt::PromptFetcher;
use room_runtime::swap::{OnChainDex, SwapConfig, SwapEngine};
use room_runtime::wallet::{ChainFunding, RoomWalletManager, WalletManagerConfig};

use config::OrchestratorConfig;
use room_events::RoomWatcher;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_log();

    let config = OrchestratorConfig::from_env()?;
    tracing::info!(rpc = %config.rpc_url, listen = %config.listen_addr, "starting orchestrator");

    let chain = Arc::new(ChainClient::new(
        config.rpc_url.as_str(),
        &config.faucet_private_key,
    )?);

    let mut wallet_config =
        WalletManagerConfig::new(config.wallet_store_path.clone(), config.rpc_url.clone());
    wallet_config.min_faucet_balance = config.faucet_min_balance;
    let wallets = Arc::new(RoomWalletManager::new(
        wallet_config,
        Arc::new(ChainFunding::new(Arc::clone(&chain))),
    ));
    // Refuses to come up against an underfunded faucet wallet.
    wallets.start().await.context("wallet manager startup")?;

    let directory: Arc<dyn AgentDirectory> = Arc::new(OnChainDirectory::new(
        Arc::clone(&chain),
        config.room_registry,
        config.agent_registry,
    ));
    let resolver = Arc::new(ParticipantResolver::new(
        Arc::clone(&directory),
        PromptFetcher::new(config.ipfs_gateway.clone()),
    ));

    let ledger = Arc::new(RoomActionLedger::new());
    let mut swap_config = SwapConfig::new(config.funding_token, config.swap_router);
    swap_config.slippage_bps = config.slippage_bps;
    let swaps = Arc::new(SwapEngine::new(
        swap_config,
        Arc::clone(&wallets),
        Arc::new(OnChainDex::new(Arc::clone(&chain))),
        Arc::clone(&ledger),
    ));

    let mut engine_config = EngineConfig::new(config.tokens.clone());
    engine_config.max_turns = config.max_turns;
    let engine = Arc::new(ConversationEngine::new(
        engine_config,
        ChatClient::new(config.llm_base_url.clone(), config.llm_model.clone()),
        Arc::clone(&resolver),
        Arc::clone(&directory),
        Arc::clone(&swaps),
        Arc::clone(&ledger),
    ));
    engine.start();

    let watcher = RoomWatcher::new(
        Arc::clone(&chain),
        config.room_registry,
        config.event_poll_interval,
    );
    tokio::spawn(watcher.run(Arc::clone(&engine)));

    let state = Arc::new(RoomApiState {
        wallets: Arc::clone(&wallets),
        volume: VolumeBoard::new(Arc::clone(&ledger)),
        ledger,
        funding_decimals: config.funding_decimals,
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "http api listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal(engine, wallets))
        .await
        .context("http server")?;

    Ok(())
}

async fn shutdown_signal(engine: Arc<ConversationEngine>, wallets: Arc<RoomWalletManager>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "shutdown signal listener failed");
    }
    tracing::info!("shutting down");
    engine.stop();
    wallets.stop();
}

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}
