//! Peer-to-peer networking
//!
//! Gossip runs over plain HTTP request/response:
//! - Address announcement and directory exchange
//! - Heartbeat liveness sweeps
//! - Block broadcast and catch-up sync

pub mod client;
pub mod discovery;
pub mod node;
pub mod peer;

pub use client::{HttpPeerClient, PeerClient};
pub use node::{parse_timestamp, BlockOutcome, Node, NodeConfig, NodeError, NodeState, NodeStatus};
pub use peer::{is_valid_address, PeerDirectory, PeerError};
