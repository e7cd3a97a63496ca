use alloy::primitives::{Address, U256};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::error_response;
use crate::RoomApiState;

pub fn router() -> Router<Arc<RoomApiState>> {
    Router::new().route("/secure-room/faucet/{address}", get(faucet))
}

#[derive(Debug, Deserialize)]
struct FaucetParams {
    /// ERC-20 token to send instead of native funds.
    token: Option<String>,
    /// Override amount, in smallest units.
    amount: Option<String>,
}

async fn faucet(
    State(state): State<Arc<RoomApiState>>,
    Path(address): Path<String>,
    Query(params): Query<FaucetParams>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let address: Address = address
        .parse()
        .map_err(|_| bad_request(format!("Invalid address: {address}")))?;
    let token = params
        .token
        .map(|t| {
            t.parse::<Address>()
                .map_err(|_| bad_request(format!("Invalid token address: {t}")))
        })
        .transpose()?;
    let amount = params
        .amount
        .map(|a| {
            U256::from_str_radix(&a, 10).map_err(|_| bad_request(format!("Invalid amount: {a}")))
        })
        .transpose()?;

    let tx = state
        .wallets
        .faucet_token(address, token, amount)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({"success": true, "tx": tx})))
}

fn bad_request(message: String) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "error": message})),
    )
}
