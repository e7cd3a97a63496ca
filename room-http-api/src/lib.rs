pub mod routes;
pub mod volume;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use room_runtime::ledger::RoomActionLedger;
use room_runtime::wallet::RoomWalletManager;

use crate::volume::VolumeBoard;

pub struct RoomApiState {
    pub wallets: Arc<RoomWalletManager>,
    pub ledger: Arc<RoomActionLedger>,
    pub volume: VolumeBoard,
    /// Decimals of the funding token, used to render volume strings.
    pub funding_decimals: u32,
}

pub fn build_router(state: Arc<RoomApiState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::wallet::router())
        .merge(routes::faucet::router())
        .merge(routes::actions::router())
        .merge(routes::volume::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
