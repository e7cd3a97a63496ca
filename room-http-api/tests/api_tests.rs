//! Integration tests for the secure-room HTTP API.
//!
//! Exercises route handlers against a real axum router with an in-memory
//! ledger and a mock funding provider behind the wallet manager.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use axum::body::Body;
use http_body_util::BodyExt;
use hyper::Request;
use tower::ServiceExt;

use room_http_api::volume::VolumeBoard;
use room_http_api::{RoomApiState, build_router};
use room_runtime::RoomError;
use room_runtime::ledger::RoomActionLedger;
use room_runtime::types::{ActionType, TransactionAction};
use room_runtime::wallet::{FundingProvider, RoomWalletManager, WalletManagerConfig};

struct MockFunding;

#[async_trait]
impl FundingProvider for MockFunding {
    async fn faucet_balance(&self) -> Result<U256, RoomError> {
        Ok(U256::MAX)
    }

    async fn send_native(&self, _to: Address, _amount: U256) -> Result<String, RoomError> {
        Ok("0xnative".into())
    }

    async fn send_token(
        &self,
        _token: Address,
        _to: Address,
        _amount: U256,
    ) -> Result<String, RoomError> {
        Ok("0xtoken".into())
    }
}

async fn test_state(dir: &tempfile::TempDir) -> Arc<RoomApiState> {
    let wallets = Arc::new(RoomWalletManager::new(
        WalletManagerConfig::new(
            dir.path().join("wallets.json"),
            "http://localhost:8545".parse().unwrap(),
        ),
        Arc::new(MockFunding),
    ));
    wallets.start().await.unwrap();

    let ledger = Arc::new(RoomActionLedger::new());
    Arc::new(RoomApiState {
        wallets,
        volume: VolumeBoard::new(Arc::clone(&ledger)),
        ledger,
        funding_decimals: 6,
    })
}

async fn get_json(
    state: Arc<RoomApiState>,
    uri: &str,
) -> (hyper::StatusCode, serde_json::Value) {
    let response = build_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_is_open() {
    let dir = tempfile::TempDir::new().unwrap();
    let (status, body) = get_json(test_state(&dir).await, "/health").await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_room_wallet_is_404() {
    let dir = tempfile::TempDir::new().unwrap();
    let (status, body) = get_json(test_state(&dir).await, "/secure-room/wallet/99").await;
    assert_eq!(status, hyper::StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn known_room_wallet_is_returned() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(&dir).await;
    let (_, address) = state.wallets.get_or_create_wallet(5).await.unwrap();

    let (status, body) = get_json(Arc::clone(&state), "/secure-room/wallet/5").await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["roomId"], 5);
    assert_eq!(body["walletAddress"], format!("{address}"));
}

#[tokio::test]
async fn faucet_returns_transaction_hash() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(&dir).await;

    let (status, body) = get_json(
        state,
        "/secure-room/faucet/0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
    )
    .await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["tx"], "0xnative");
}

#[tokio::test]
async fn faucet_rejects_malformed_address() {
    let dir = tempfile::TempDir::new().unwrap();
    let (status, body) = get_json(test_state(&dir).await, "/secure-room/faucet/not-hex").await;
    assert_eq!(status, hyper::StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn actions_format_volume_as_decimal_strings() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(&dir).await;
    state.ledger.add_or_update_transaction_action(
        42,
        TransactionAction::pending(ActionType::Swap, "0xswap".into(), 100_000000),
    );
    state.ledger.increment_computation_count(42);

    let (status, body) = get_json(Arc::clone(&state), "/secure-room/actions/42").await;
    assert_eq!(status, hyper::StatusCode::OK);
    let room = &body["room"];
    assert_eq!(room["totalVolumeUSD"], "100");
    assert_eq!(room["computationCount"], 1);
    assert_eq!(room["isStopped"], false);
    assert_eq!(room["transactions"][0]["volumeUSD"], "100");
    assert_eq!(room["transactions"][0]["type"], "swap");
}

#[tokio::test]
async fn actions_for_unknown_room_is_404() {
    let dir = tempfile::TempDir::new().unwrap();
    let (status, _) = get_json(test_state(&dir).await, "/secure-room/actions/404").await;
    assert_eq!(status, hyper::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_actions_cover_requested_rooms() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(&dir).await;
    state.ledger.add_or_update_transaction_action(
        1,
        TransactionAction::pending(ActionType::Swap, "0xa".into(), 1_500000),
    );

    let (status, body) =
        get_json(Arc::clone(&state), "/secure-room/actions?roomIds=1,2").await;
    assert_eq!(status, hyper::StatusCode::OK);
    let rooms = body["rooms"].as_array().unwrap();
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0]["roomId"], 1);
    assert_eq!(rooms[0]["totalVolumeUSD"], "1.5");
    assert_eq!(rooms[1]["roomId"], 2);
    assert_eq!(rooms[1]["totalVolumeUSD"], "0");
}

#[tokio::test]
async fn volume_ranking_is_stable_per_period() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(&dir).await;
    state.ledger.add_or_update_transaction_action(
        1,
        TransactionAction::pending(ActionType::Swap, "0xa".into(), 100),
    );
    state.ledger.add_or_update_transaction_action(
        2,
        TransactionAction::pending(ActionType::Swap, "0xb".into(), 300),
    );

    let (_, first) = get_json(Arc::clone(&state), "/secure-room/volume/7d").await;
    state.ledger.add_or_update_transaction_action(
        1,
        TransactionAction::pending(ActionType::Swap, "0xc".into(), 10_000),
    );
    let (_, second) = get_json(Arc::clone(&state), "/secure-room/volume/7d").await;
    assert_eq!(first["rooms"], second["rooms"]);

    let (_, daily) = get_json(state, "/secure-room/volume/1d").await;
    assert_ne!(daily["rooms"], second["rooms"]);
}

#[tokio::test]
async fn volume_rejects_bad_period() {
    let dir = tempfile::TempDir::new().unwrap();
    let (status, _) = get_json(test_state(&dir).await, "/secure-room/volume/fortnight").await;
    assert_eq!(status, hyper::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn volume_rejects_non_ascii_period() {
    let dir = tempfile::TempDir::new().unwrap();
    // Percent-encoded "7é"; must come back as a structured 400, not a panic.
    let (status, body) = get_json(test_state(&dir).await, "/secure-room/volume/7%C3%A9").await;
    assert_eq!(status, hyper::StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
