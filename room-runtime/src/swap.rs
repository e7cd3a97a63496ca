//! Swap execution state machine.
//!
//! One `swap` call walks wallet resolution → balance check → allowance /
//! approval → quote → swap submission, recording every transition in the
//! room ledger. Submission steps retry on transient failure; balance and
//! quote problems are logic errors and fail fast. Calls for the same room
//! are serialized so two swaps cannot race on allowance state.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use alloy::providers::Provider;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::chain::ChainClient;
use crate::contracts::{IERC20, ISwapRouter};
use crate::error::RoomError;
use crate::ledger::RoomActionLedger;
use crate::types::{ActionType, TransactionAction};
use crate::wallet::RoomWalletManager;

/// Chain-facing operations the state machine needs. Reads go through the
/// observing client; submissions are signed by the room wallet passed in.
#[async_trait]
pub trait DexClient: Send + Sync {
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, RoomError>;
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, RoomError>;
    /// Submit an unlimited approval from the room wallet; returns the
    /// transaction hash without waiting for the receipt.
    async fn approve_max(
        &self,
        wallet: &ChainClient,
        token: Address,
        spender: Address,
    ) -> Result<String, RoomError>;
    async fn get_amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, RoomError>;
    /// Submit the swap from the room wallet; returns the transaction hash
    /// without waiting for the receipt.
    async fn swap_exact_tokens(
        &self,
        wallet: &ChainClient,
        router: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        deadline: U256,
    ) -> Result<String, RoomError>;
    async fn wait_confirmed(&self, tx_hash: &str) -> Result<(), RoomError>;
}

/// Production `DexClient` over alloy contract bindings.
pub struct OnChainDex {
    chain: Arc<ChainClient>,
}

impl OnChainDex {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl DexClient for OnChainDex {
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, RoomError> {
        IERC20::new(token, self.chain.provider())
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| RoomError::ChainError(format!("balanceOf failed: {e}")))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, RoomError> {
        IERC20::new(token, self.chain.provider())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| RoomError::ChainError(format!("allowance failed: {e}")))
    }

    async fn approve_max(
        &self,
        wallet: &ChainClient,
        token: Address,
        spender: Address,
    ) -> Result<String, RoomError> {
        let pending = IERC20::new(token, wallet.provider())
            .approve(spender, U256::MAX)
            .send()
            .await
            .map_err(|e| RoomError::ChainError(format!("approve failed: {e}")))?;
        Ok(format!("0x{}", hex::encode(pending.tx_hash().as_slice())))
    }

    async fn get_amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, RoomError> {
        ISwapRouter::new(router, self.chain.provider())
            .getAmountsOut(amount_in, path.to_vec())
            .call()
            .await
            .map_err(|e| RoomError::ChainError(format!("getAmountsOut failed: {e}")))
    }

    async fn swap_exact_tokens(
        &self,
        wallet: &ChainClient,
        router: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        deadline: U256,
    ) -> Result<String, RoomError> {
        let pending = ISwapRouter::new(router, wallet.provider())
            .swapExactTokensForTokens(
                amount_in,
                amount_out_min,
                path.to_vec(),
                wallet.address,
                deadline,
            )
            .send()
            .await
            .map_err(|e| RoomError::ChainError(format!("swap failed: {e}")))?;
        Ok(format!("0x{}", hex::encode(pending.tx_hash().as_slice())))
    }

    async fn wait_confirmed(&self, tx_hash: &str) -> Result<(), RoomError> {
        let hash: B256 = tx_hash
            .parse()
            .map_err(|e| RoomError::ChainError(format!("Invalid tx hash: {e}")))?;
        loop {
            let receipt = self
                .chain
                .provider()
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| RoomError::ChainError(format!("Receipt fetch failed: {e}")))?;
            if receipt.is_some() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct SwapConfig {
    /// Token rooms are funded with and swaps are paid from.
    pub funding_token: Address,
    pub router: Address,
    /// Accepted slippage in basis points off the quoted output. The
    /// default is deliberately loose for this environment.
    pub slippage_bps: u32,
    pub deadline_secs: u64,
    pub tx_attempts: u32,
    pub retry_backoff: Duration,
}

impl SwapConfig {
    pub fn new(funding_token: Address, router: Address) -> Self {
        Self {
            funding_token,
            router,
            slippage_bps: 5000,
            deadline_secs: 3600,
            tx_attempts: 3,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

pub struct SwapEngine {
    config: SwapConfig,
    wallets: Arc<RoomWalletManager>,
    dex: Arc<dyn DexClient>,
    ledger: Arc<RoomActionLedger>,
    room_locks: DashMap<u64, Arc<Mutex<()>>>,
}

impl SwapEngine {
    pub fn new(
        config: SwapConfig,
        wallets: Arc<RoomWalletManager>,
        dex: Arc<dyn DexClient>,
        ledger: Arc<RoomActionLedger>,
    ) -> Self {
        Self {
            config,
            wallets,
            dex,
            ledger,
            room_locks: DashMap::new(),
        }
    }

    /// Swap `amount_in` of the funding token into `token_out` from the
    /// room's custodial wallet. Returns the swap transaction hash; the
    /// swap receipt itself is not awaited here.
    ///
    /// Any failure past wallet resolution lands in the room ledger as a
    /// `failed` entry before it propagates.
    pub async fn swap(
        &self,
        room_id: u64,
        token_out: Address,
        amount_in: U256,
    ) -> Result<String, RoomError> {
        let lock = self.room_lock(room_id);
        let _guard = lock.lock().await;

        match self.swap_inner(room_id, token_out, amount_in).await {
            Ok(tx_hash) => Ok(tx_hash),
            Err(e) => {
                self.ledger.add_or_update_transaction_action(
                    room_id,
                    TransactionAction::failed(ActionType::Swap, e.to_string()),
                );
                Err(e)
            }
        }
    }

    async fn swap_inner(
        &self,
        room_id: u64,
        token_out: Address,
        amount_in: U256,
    ) -> Result<String, RoomError> {
        let (wallet, owner) = self.wallets.get_or_create_wallet(room_id).await?;

        let balance = self
            .dex
            .balance_of(self.config.funding_token, owner)
            .await?;
        if balance < amount_in {
            return Err(RoomError::InsufficientBalance {
                have: balance.to_string(),
                need: amount_in.to_string(),
            });
        }

        let allowance = self
            .dex
            .allowance(self.config.funding_token, owner, self.config.router)
            .await?;
        if allowance < U256::MAX {
            self.approve_router(room_id, &wallet).await?;
        }

        let path = [self.config.funding_token, token_out];
        let amounts = self
            .dex
            .get_amounts_out(self.config.router, amount_in, &path)
            .await?;
        if amounts.len() < 2 {
            return Err(RoomError::InvalidQuote(format!(
                "router returned {} amounts for a 2-hop path",
                amounts.len()
            )));
        }
        let quoted_out = amounts[1];
        let amount_out_min =
            quoted_out * U256::from(10_000 - self.config.slippage_bps) / U256::from(10_000);
        let deadline = U256::from(Utc::now().timestamp().max(0) as u64 + self.config.deadline_secs);

        let tx_hash = self
            .with_retry("swap", || {
                self.dex.swap_exact_tokens(
                    &wallet,
                    self.config.router,
                    amount_in,
                    amount_out_min,
                    &path,
                    deadline,
                )
            })
            .await?;

        let volume = u128::try_from(amount_in).unwrap_or(u128::MAX);
        self.ledger.add_or_update_transaction_action(
            room_id,
            TransactionAction::pending(ActionType::Swap, tx_hash.clone(), volume),
        );
        tracing::info!(room_id, tx_hash = %tx_hash, %amount_in, "swap submitted");

        Ok(tx_hash)
    }

    /// Submit an unlimited approval (with retry), then hold for its
    /// receipt. The ledger sees a `pending` row that flips to `confirmed`
    /// on the same hash.
    async fn approve_router(&self, room_id: u64, wallet: &ChainClient) -> Result<(), RoomError> {
        let tx_hash = self
            .with_retry("approve", || {
                self.dex
                    .approve_max(wallet, self.config.funding_token, self.config.router)
            })
            .await?;

        self.ledger.add_or_update_transaction_action(
            room_id,
            TransactionAction::pending(ActionType::Approve, tx_hash.clone(), 0),
        );
        self.dex.wait_confirmed(&tx_hash).await?;
        self.ledger.add_or_update_transaction_action(
            room_id,
            TransactionAction::confirmed(ActionType::Approve, tx_hash.clone(), 0),
        );
        tracing::info!(room_id, tx_hash = %tx_hash, "router approval confirmed");
        Ok(())
    }

    async fn with_retry<F, Fut>(&self, label: &str, mut op: F) -> Result<String, RoomError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, RoomError>>,
    {
        let mut last_error = None;
        for attempt in 1..=self.config.tx_attempts {
            match op().await {
                Ok(tx_hash) => return Ok(tx_hash),
                Err(e) => {
                    tracing::warn!(label, attempt, error = %e, "transaction attempt failed");
                    last_error = Some(e);
                    if attempt < self.config.tx_attempts {
                        tokio::time::sleep(self.config.retry_backoff).await;
                    }
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| RoomError::ChainError(format!("{label}: no attempts made"))))
    }

    fn room_lock(&self, room_id: u64) -> Arc<Mutex<()>> {
        self.room_locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
