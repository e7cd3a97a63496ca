use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::RoomApiState;

pub fn router() -> Router<Arc<RoomApiState>> {
    Router::new().route("/secure-room/wallet/{room_id}", get(get_wallet))
}

async fn get_wallet(
    State(state): State<Arc<RoomApiState>>,
    Path(room_id): Path<u64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.wallets.get_wallet_address(room_id).await {
        Some(wallet_address) => Ok(Json(json!({
            "success": true,
            "walletAddress": wallet_address,
            "roomId": room_id,
        }))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": format!("No wallet for room {room_id}")})),
        )),
    }
}
