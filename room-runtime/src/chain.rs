//! Chain client for EVM-compatible networks.
//!
//! Wraps an alloy HTTP provider with a local signer so both the faucet
//! wallet and per-room custodial wallets submit transactions through the
//! same fill stack (nonce, gas, chain id).

use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, U256};
use alloy::providers::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy::providers::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;

use crate::error::RoomError;

/// The concrete provider type produced by `ProviderBuilder::new().wallet(...).connect_http(...)`.
pub type HttpProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
    Ethereum,
>;

/// A signing chain client bound to one wallet.
pub struct ChainClient {
    pub provider: HttpProvider,
    pub address: Address,
    rpc_url: url::Url,
}

impl ChainClient {
    /// Create a client from an RPC URL and hex-encoded private key
    /// (with or without "0x" prefix).
    pub fn new(rpc_url: &str, private_key: &str) -> Result<Self, RoomError> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| RoomError::ConfigError(format!("Invalid private key: {e}")))?;
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| RoomError::ConfigError(format!("Invalid RPC URL: {e}")))?;
        Ok(Self::from_signer(url, signer))
    }

    /// Create a client for an already-constructed signer. Used for room
    /// custodial wallets restored from their credential blob.
    pub fn from_signer(rpc_url: url::Url, signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(rpc_url.clone());
        Self {
            provider,
            address,
            rpc_url,
        }
    }

    pub fn provider(&self) -> &HttpProvider {
        &self.provider
    }

    pub fn rpc_url(&self) -> &url::Url {
        &self.rpc_url
    }

    /// Native balance of an address.
    pub async fn native_balance(&self, address: Address) -> Result<U256, RoomError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| RoomError::ChainError(format!("Balance read failed: {e}")))
    }

    /// Send native funds and return the transaction hash without waiting
    /// for the receipt.
    pub async fn send_native(&self, to: Address, amount: U256) -> Result<String, RoomError> {
        let tx = TransactionRequest::default().to(to).value(amount);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| RoomError::ChainError(format!("Native transfer failed: {e}")))?;
        Ok(format!("0x{}", hex::encode(pending.tx_hash().as_slice())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hardhat account #0
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn chain_client_creation() {
        let client = ChainClient::new("http://localhost:8545", TEST_KEY);
        assert!(client.is_ok());
        let client = client.unwrap();
        assert_eq!(
            client.address,
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn invalid_private_key_rejected() {
        assert!(ChainClient::new("http://localhost:8545", "not-a-key").is_err());
    }

    #[test]
    fn invalid_rpc_url_rejected() {
        assert!(ChainClient::new("not a url", TEST_KEY).is_err());
    }
}
