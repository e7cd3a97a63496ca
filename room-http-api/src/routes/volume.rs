use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

use super::{actions::format_units, error_response};
use crate::RoomApiState;

pub fn router() -> Router<Arc<RoomApiState>> {
    Router::new().route("/secure-room/volume/{period}", get(get_volume))
}

async fn get_volume(
    State(state): State<Arc<RoomApiState>>,
    Path(period): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let ranking = state.volume.get_volume(&period).map_err(error_response)?;
    let rooms: Vec<Value> = ranking
        .into_iter()
        .map(|r| {
            json!({
                "roomId": r.room_id,
                "totalVolumeUSD": format_units(r.volume, state.funding_decimals),
            })
        })
        .collect();
    Ok(Json(json!({"success": true, "period": period, "rooms": rooms})))
}
