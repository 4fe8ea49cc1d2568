//! Ledger node: a minimal peer-to-peer UTXO ledger in Rust
//!
//! This crate provides:
//! - ECDSA-signed UTXO transactions (secp256k1)
//! - Timestamp/prev-hash linked blocks without proof of work
//! - Orphan parking and reattachment for out-of-order blocks
//! - Gossip over HTTP: address exchange, heartbeats, block broadcast
//! - JSON persistence of the committed chain
//!
//! # Example
//!
//! ```rust
//! use ledger_node::core::{Block, Blockchain, TransactionOutput};
//! use ledger_node::core::verify_transaction;
//! use ledger_node::wallet::Wallet;
//!
//! let alice = Wallet::new();
//! let bob = Wallet::new();
//!
//! let genesis = Block::genesis(&alice.public_key(), 100);
//! let chain = Blockchain::with_genesis(genesis.clone()).unwrap();
//!
//! let mut tx = alice
//!     .create_transaction(
//!         &genesis.transactions[0].hash,
//!         0,
//!         vec![
//!             TransactionOutput::new(5, &bob.public_key()),
//!             TransactionOutput::new(95, &alice.public_key()),
//!         ],
//!     )
//!     .unwrap();
//!
//! let hash = verify_transaction(&mut tx, &chain).unwrap();
//! assert_eq!(hash, tx.hash);
//! ```

pub mod api;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod network;
pub mod storage;
pub mod wallet;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use core::{Block, Blockchain, Transaction, DEFAULT_DIFFICULTY, GENESIS_PREV_HASH};
pub use crypto::KeyPair;
pub use mining::{Mempool, Packer};
pub use network::{Node, NodeConfig, NodeError};
pub use storage::Storage;
pub use wallet::Wallet;
