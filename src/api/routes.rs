//! HTTP route table

use crate::api::handlers::{self, ApiState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub const ADDR_PATH: &str = "/addr";
pub const GETADDR_PATH: &str = "/getaddr";
pub const HEARTBEAT_PATH: &str = "/heartbeat";
pub const TRANSACTIONS_PATH: &str = "/transactions";
pub const BLOCKS_PATH: &str = "/blocks";
pub const CHAIN_PATH: &str = "/chain";

/// Create the router serving peers and clients
pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Peer directory
        .route(ADDR_PATH, post(handlers::announce_address))
        .route(GETADDR_PATH, get(handlers::get_addresses))
        .route(HEARTBEAT_PATH, get(handlers::heartbeat))
        // Ledger
        .route(TRANSACTIONS_PATH, post(handlers::submit_transaction))
        .route(
            BLOCKS_PATH,
            post(handlers::submit_block).get(handlers::get_blocks_since),
        )
        .route(CHAIN_PATH, get(handlers::get_chain))
        .with_state(state)
        .layer(cors)
}
