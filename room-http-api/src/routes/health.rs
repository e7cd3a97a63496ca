use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::RoomApiState;

pub fn router() -> Router<Arc<RoomApiState>> {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
