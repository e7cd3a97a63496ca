use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use room_runtime::types::{ActionStatus, ActionType, RoomActionData};

use crate::RoomApiState;

pub fn router() -> Router<Arc<RoomApiState>> {
    Router::new()
        .route("/secure-room/actions", get(get_many))
        .route("/secure-room/actions/{room_id}", get(get_one))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomActionsView {
    room_id: u64,
    #[serde(rename = "totalVolumeUSD")]
    total_volume_usd: String,
    computation_count: u64,
    is_stopped: bool,
    transactions: Vec<TransactionView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionView {
    #[serde(rename = "type")]
    action_type: ActionType,
    tx_hash: Option<String>,
    status: ActionStatus,
    #[serde(rename = "volumeUSD")]
    volume_usd: String,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn get_one(
    State(state): State<Arc<RoomApiState>>,
    Path(room_id): Path<u64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.ledger.get_room_action_data(room_id) {
        Some(data) => {
            let view = room_view(&state, room_id, data);
            Ok(Json(json!({"success": true, "room": view})))
        }
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": format!("No actions for room {room_id}")})),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct ManyParams {
    /// Comma-separated room ids.
    #[serde(rename = "roomIds")]
    room_ids: String,
}

async fn get_many(
    State(state): State<Arc<RoomApiState>>,
    Query(params): Query<ManyParams>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut rooms = Vec::new();
    for raw in params.room_ids.split(',').filter(|s| !s.trim().is_empty()) {
        let room_id: u64 = raw.trim().parse().map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": format!("Invalid room id: {raw}")})),
            )
        })?;
        // Unknown rooms simply have no activity yet.
        let data = state.ledger.get_room_action_data(room_id).unwrap_or_default();
        rooms.push(room_view(&state, room_id, data));
    }
    Ok(Json(json!({"success": true, "rooms": rooms})))
}

fn room_view(state: &RoomApiState, room_id: u64, data: RoomActionData) -> RoomActionsView {
    let decimals = state.funding_decimals;
    RoomActionsView {
        room_id,
        total_volume_usd: format_units(state.ledger.total_volume(room_id), decimals),
        computation_count: data.computation_count,
        is_stopped: data.is_stopped,
        transactions: data
            .transactions
            .into_iter()
            .map(|t| TransactionView {
                action_type: t.action_type,
                tx_hash: t.tx_hash,
                status: t.status,
                volume_usd: format_units(t.volume_usd, decimals),
                timestamp: t.timestamp,
                error: t.error,
            })
            .collect(),
    }
}

/// Render a smallest-unit integer as a decimal string, e.g. 100_000000
/// with 6 decimals → "100".
pub(crate) fn format_units(value: u128, decimals: u32) -> String {
    match i128::try_from(value) {
        Ok(v) => Decimal::from_i128_with_scale(v, decimals)
            .normalize()
            .to_string(),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_amounts() {
        assert_eq!(format_units(100_000000, 6), "100");
        assert_eq!(format_units(0, 6), "0");
    }

    #[test]
    fn formats_fractional_amounts() {
        assert_eq!(format_units(1_500000, 6), "1.5");
        assert_eq!(format_units(123, 6), "0.000123");
    }
}
