pub mod actions;
pub mod faucet;
pub mod health;
pub mod volume;
pub mod wallet;

use axum::Json;
use axum::http::StatusCode;
use serde_json::json;

use room_runtime::RoomError;

/// Map an internal error to the `{success:false, error}` wire shape.
///
/// Typed, caller-actionable messages pass through; anything else becomes a
/// generic 500 so internals never leak.
pub(crate) fn error_response(e: RoomError) -> (StatusCode, Json<serde_json::Value>) {
    let (status, message) = match &e {
        RoomError::FaucetQueueFull => (StatusCode::TOO_MANY_REQUESTS, e.to_string()),
        RoomError::InsufficientBalance { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
        RoomError::ConfigError(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        RoomError::UnknownRoom(_) => (StatusCode::NOT_FOUND, e.to_string()),
        _ => {
            tracing::error!(error = %e, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        }
    };
    (status, Json(json!({"success": false, "error": message})))
}
