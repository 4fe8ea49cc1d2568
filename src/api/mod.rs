//! HTTP API module
//!
//! Every node serves the same routes; peers and clients share them.
//!
//! # Endpoints
//!
//! ## Peers
//! - `POST /addr` - Announce an address
//! - `GET /getaddr` - Known addresses with last-seen times
//! - `GET /heartbeat` - Liveness probe
//!
//! ## Ledger
//! - `POST /transactions` - Submit a transaction
//! - `POST /blocks` - Submit a block
//! - `GET /blocks?since=ISO` - Blocks newer than a timestamp
//! - `GET /chain` - Full chain export

pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
