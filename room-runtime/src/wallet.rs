//! Custodial wallet lifecycle for rooms, plus the serialized faucet queue.
//!
//! Every room gets at most one wallet. The room → wallet map is persisted
//! as a JSON file and rewritten wholly on each mutation; wallet count is
//! small and writes are rare next to swap volume. Faucet traffic is pushed
//! through a single FIFO queue with one in-flight request process-wide,
//! because the faucet wallet's nonce must be managed sequentially.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, oneshot};

use crate::chain::ChainClient;
use crate::contracts::IERC20;
use crate::error::RoomError;
use crate::types::WalletRecord;

/// Executes funding transfers from the faucet-holding wallet.
#[async_trait]
pub trait FundingProvider: Send + Sync {
    /// Native balance of the faucet wallet itself.
    async fn faucet_balance(&self) -> Result<U256, RoomError>;
    async fn send_native(&self, to: Address, amount: U256) -> Result<String, RoomError>;
    async fn send_token(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<String, RoomError>;
}

/// `FundingProvider` backed by the faucet wallet's chain client.
pub struct ChainFunding {
    chain: Arc<ChainClient>,
}

impl ChainFunding {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl FundingProvider for ChainFunding {
    async fn faucet_balance(&self) -> Result<U256, RoomError> {
        self.chain.native_balance(self.chain.address).await
    }

    async fn send_native(&self, to: Address, amount: U256) -> Result<String, RoomError> {
        self.chain.send_native(to, amount).await
    }

    async fn send_token(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<String, RoomError> {
        let erc20 = IERC20::new(token, self.chain.provider());
        let pending = erc20
            .transfer(to, amount)
            .send()
            .await
            .map_err(|e| RoomError::ChainError(format!("Token transfer failed: {e}")))?;
        Ok(format!("0x{}", hex::encode(pending.tx_hash().as_slice())))
    }
}

#[derive(Debug, Clone)]
pub struct WalletManagerConfig {
    pub store_path: PathBuf,
    pub rpc_url: url::Url,
    /// Reject new faucet requests once this many are already pending.
    pub queue_limit: usize,
    /// Pause between consecutive faucet dispatches, paces the upstream
    /// rate limit.
    pub dispatch_delay: Duration,
    /// Startup fails unless the faucet wallet holds at least this much.
    pub min_faucet_balance: U256,
    pub default_native_amount: U256,
    pub default_token_amount: U256,
}

impl WalletManagerConfig {
    pub fn new(store_path: PathBuf, rpc_url: url::Url) -> Self {
        Self {
            store_path,
            rpc_url,
            queue_limit: 10,
            dispatch_delay: Duration::from_millis(1400),
            min_faucet_balance: U256::from(10u64.pow(16)), // 0.01 native
            default_native_amount: U256::from(10u64.pow(15)),
            default_token_amount: U256::from(1_000_000_000u64),
        }
    }
}

enum FaucetKind {
    Native,
    Token { token: Address },
}

struct FaucetRequest {
    kind: FaucetKind,
    address: Address,
    amount: U256,
    resolver: oneshot::Sender<Result<String, RoomError>>,
}

pub struct RoomWalletManager {
    config: WalletManagerConfig,
    funding: Arc<dyn FundingProvider>,
    records: Mutex<HashMap<u64, WalletRecord>>,
    queue: Mutex<VecDeque<FaucetRequest>>,
    queue_notify: Notify,
    running: AtomicBool,
}

impl RoomWalletManager {
    pub fn new(config: WalletManagerConfig, funding: Arc<dyn FundingProvider>) -> Self {
        Self {
            config,
            funding,
            records: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            queue_notify: Notify::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Rehydrate the wallet map, verify the faucet balance precondition,
    /// and start the queue worker. An underfunded faucet is fatal here,
    /// not retried.
    pub async fn start(self: &Arc<Self>) -> Result<(), RoomError> {
        let records = load_records(&self.config.store_path)?;
        tracing::info!(wallets = records.len(), "wallet store rehydrated");
        *self.records.lock().await = records;

        let balance = self.funding.faucet_balance().await?;
        if balance < self.config.min_faucet_balance {
            return Err(RoomError::FaucetUnderfunded {
                balance: balance.to_string(),
                minimum: self.config.min_faucet_balance.to_string(),
            });
        }

        self.running.store(true, Ordering::SeqCst);
        let worker = Arc::clone(self);
        tokio::spawn(async move { worker.run_queue().await });
        Ok(())
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.queue_notify.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Pure lookup, no side effects.
    pub async fn get_wallet_address(&self, room_id: u64) -> Option<String> {
        self.records
            .lock()
            .await
            .get(&room_id)
            .map(|r| r.wallet_address.clone())
    }

    /// Return the room's wallet client, creating and persisting a new
    /// wallet on first use. The store is rewritten before the new wallet
    /// is handed out: durability precedes use.
    pub async fn get_or_create_wallet(
        &self,
        room_id: u64,
    ) -> Result<(ChainClient, Address), RoomError> {
        if !self.is_running() {
            return Err(RoomError::NotRunning("wallet manager"));
        }

        let mut records = self.records.lock().await;
        if let Some(record) = records.get(&room_id) {
            let signer: PrivateKeySigner = record
                .credential
                .parse()
                .map_err(|e| RoomError::WalletError(format!("Corrupt credential blob: {e}")))?;
            let client = ChainClient::from_signer(self.config.rpc_url.clone(), signer);
            let address = client.address;
            return Ok((client, address));
        }

        let signer = PrivateKeySigner::random();
        let address = signer.address();
        let record = WalletRecord {
            room_id,
            wallet_address: format!("{address}"),
            credential: format!("0x{}", hex::encode(signer.to_bytes())),
        };
        records.insert(room_id, record);
        persist_records(&self.config.store_path, &records)?;
        tracing::info!(room_id, wallet = %address, "created custodial wallet");

        let client = ChainClient::from_signer(self.config.rpc_url.clone(), signer);
        Ok((client, address))
    }

    /// Queue a funding request. Rejected immediately, without enqueuing,
    /// when the queue is already at its limit.
    pub async fn faucet_token(
        &self,
        address: Address,
        token: Option<Address>,
        amount: Option<U256>,
    ) -> Result<String, RoomError> {
        if !self.is_running() {
            return Err(RoomError::NotRunning("wallet manager"));
        }

        let (kind, amount) = match token {
            Some(token) => (
                FaucetKind::Token { token },
                amount.unwrap_or(self.config.default_token_amount),
            ),
            None => (
                FaucetKind::Native,
                amount.unwrap_or(self.config.default_native_amount),
            ),
        };

        let rx = {
            let mut queue = self.queue.lock().await;
            if queue.len() >= self.config.queue_limit {
                return Err(RoomError::FaucetQueueFull);
            }
            let (tx, rx) = oneshot::channel();
            queue.push_back(FaucetRequest {
                kind,
                address,
                amount,
                resolver: tx,
            });
            rx
        };
        self.queue_notify.notify_one();

        rx.await
            .map_err(|_| RoomError::WalletError("faucet worker dropped request".into()))?
    }

    /// Single worker loop: strictly one in-flight request, FIFO order, a
    /// fixed pause after each dispatch.
    async fn run_queue(self: Arc<Self>) {
        while self.is_running() {
            let request = self.queue.lock().await.pop_front();
            match request {
                Some(request) => {
                    let result = self.dispatch(&request).await;
                    if let Err(e) = &result {
                        tracing::warn!(address = %request.address, error = %e, "faucet dispatch failed");
                    }
                    // Receiver may have gone away; the outcome is still consumed.
                    let _ = request.resolver.send(result);
                    tokio::time::sleep(self.config.dispatch_delay).await;
                }
                None => self.queue_notify.notified().await,
            }
        }
    }

    async fn dispatch(&self, request: &FaucetRequest) -> Result<String, RoomError> {
        match request.kind {
            FaucetKind::Native => {
                self.funding
                    .send_native(request.address, request.amount)
                    .await
            }
            FaucetKind::Token { token } => {
                self.funding
                    .send_token(token, request.address, request.amount)
                    .await
            }
        }
    }
}

fn load_records(path: &Path) -> Result<HashMap<u64, WalletRecord>, RoomError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| RoomError::WalletError(format!("Wallet store read failed: {e}")))?;
    let records: Vec<WalletRecord> = serde_json::from_str(&raw)
        .map_err(|e| RoomError::WalletError(format!("Wallet store corrupt: {e}")))?;
    Ok(records.into_iter().map(|r| (r.room_id, r)).collect())
}

fn persist_records(path: &Path, records: &HashMap<u64, WalletRecord>) -> Result<(), RoomError> {
    let mut all: Vec<&WalletRecord> = records.values().collect();
    all.sort_by_key(|r| r.room_id);
    let raw = serde_json::to_string_pretty(&all)?;
    std::fs::write(path, raw)
        .map_err(|e| RoomError::WalletError(format!("Wallet store write failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct MockFunding {
        balance: U256,
        in_flight: AtomicBool,
        overlap_seen: AtomicBool,
        dispatched: AtomicUsize,
    }

    impl MockFunding {
        fn new(balance: U256) -> Self {
            Self {
                balance,
                in_flight: AtomicBool::new(false),
                overlap_seen: AtomicBool::new(false),
                dispatched: AtomicUsize::new(0),
            }
        }

        async fn transfer(&self) -> Result<String, RoomError> {
            if self.in_flight.swap(true, Ordering::SeqCst) {
                self.overlap_seen.store(true, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.store(false, Ordering::SeqCst);
            let n = self.dispatched.fetch_add(1, Ordering::SeqCst);
            Ok(format!("0xfaucet{n}"))
        }
    }

    #[async_trait]
    impl FundingProvider for MockFunding {
        async fn faucet_balance(&self) -> Result<U256, RoomError> {
            Ok(self.balance)
        }

        async fn send_native(&self, _to: Address, _amount: U256) -> Result<String, RoomError> {
            self.transfer().await
        }

        async fn send_token(
            &self,
            _token: Address,
            _to: Address,
            _amount: U256,
        ) -> Result<String, RoomError> {
            self.transfer().await
        }
    }

    fn test_config(dir: &tempfile::TempDir) -> WalletManagerConfig {
        WalletManagerConfig::new(
            dir.path().join("wallets.json"),
            "http://localhost:8545".parse().unwrap(),
        )
    }

    fn addr(n: u8) -> Address {
        Address::from([n; 20])
    }

    #[tokio::test]
    async fn start_fails_on_underfunded_faucet() {
        let dir = tempfile::TempDir::new().unwrap();
        let funding = Arc::new(MockFunding::new(U256::ZERO));
        let manager = Arc::new(RoomWalletManager::new(test_config(&dir), funding));

        let err = manager.start().await.unwrap_err();
        assert!(matches!(err, RoomError::FaucetUnderfunded { .. }));
        assert!(!manager.is_running());
    }

    #[tokio::test]
    async fn operations_require_running_manager() {
        let dir = tempfile::TempDir::new().unwrap();
        let funding = Arc::new(MockFunding::new(U256::MAX));
        let manager = RoomWalletManager::new(test_config(&dir), funding);

        assert!(matches!(
            manager.get_or_create_wallet(1).await,
            Err(RoomError::NotRunning(_))
        ));
        assert!(matches!(
            manager.faucet_token(addr(1), None, None).await,
            Err(RoomError::NotRunning(_))
        ));
    }

    #[tokio::test]
    async fn wallet_is_created_once_and_persisted() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = test_config(&dir);
        let store_path = config.store_path.clone();
        let funding = Arc::new(MockFunding::new(U256::MAX));
        let manager = Arc::new(RoomWalletManager::new(config, funding));
        manager.start().await.unwrap();

        let (_, first) = manager.get_or_create_wallet(42).await.unwrap();
        let (_, second) = manager.get_or_create_wallet(42).await.unwrap();
        assert_eq!(first, second);

        let persisted: Vec<WalletRecord> =
            serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].room_id, 42);
        assert_eq!(persisted[0].wallet_address, format!("{first}"));
    }

    #[tokio::test]
    async fn wallet_map_survives_restart() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = test_config(&dir);
        let funding = Arc::new(MockFunding::new(U256::MAX));

        let manager = Arc::new(RoomWalletManager::new(config.clone(), funding.clone()));
        manager.start().await.unwrap();
        let (_, created) = manager.get_or_create_wallet(7).await.unwrap();
        manager.stop();

        let revived = Arc::new(RoomWalletManager::new(config, funding));
        revived.start().await.unwrap();
        assert_eq!(
            revived.get_wallet_address(7).await,
            Some(format!("{created}"))
        );
        let (_, restored) = revived.get_or_create_wallet(7).await.unwrap();
        assert_eq!(restored, created);
    }

    #[tokio::test]
    async fn lookup_has_no_side_effects() {
        let dir = tempfile::TempDir::new().unwrap();
        let funding = Arc::new(MockFunding::new(U256::MAX));
        let manager = Arc::new(RoomWalletManager::new(test_config(&dir), funding));
        manager.start().await.unwrap();

        assert!(manager.get_wallet_address(3).await.is_none());
        assert!(manager.get_wallet_address(3).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn eleventh_concurrent_request_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let funding = Arc::new(MockFunding::new(U256::MAX));
        let manager = Arc::new(RoomWalletManager::new(test_config(&dir), funding.clone()));
        manager.start().await.unwrap();

        let calls = (0..11).map(|n| {
            let manager = Arc::clone(&manager);
            async move { manager.faucet_token(addr(n), None, None).await }
        });
        let results = futures::future::join_all(calls).await;

        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(RoomError::FaucetQueueFull)))
            .count();
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(rejected, 1);
        assert_eq!(succeeded, 10);
        assert!(!funding.overlap_seen.load(Ordering::SeqCst));
        assert_eq!(funding.dispatched.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_preserves_fifo_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let funding = Arc::new(MockFunding::new(U256::MAX));
        let manager = Arc::new(RoomWalletManager::new(test_config(&dir), funding));
        manager.start().await.unwrap();

        let calls = (0..4).map(|n| {
            let manager = Arc::clone(&manager);
            async move { manager.faucet_token(addr(n), None, None).await.unwrap() }
        });
        let hashes = futures::future::join_all(calls).await;
        assert_eq!(hashes, vec!["0xfaucet0", "0xfaucet1", "0xfaucet2", "0xfaucet3"]);
    }
}
