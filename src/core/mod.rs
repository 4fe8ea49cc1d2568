//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Transactions (UTXO-style inputs and outputs, signed per input)
//! - Blocks (timestamp/prev-hash linked, no proof of work)
//! - Blockchain (append-only chain store)
//! - Validation (transaction solvency and signatures, block linkage)
//! - Chain state (orphan parking and reattachment)

pub mod block;
pub mod blockchain;
pub mod chain_state;
pub mod transaction;
pub mod validation;

pub use block::{Block, DEFAULT_DIFFICULTY, GENESIS_PREV_HASH};
pub use blockchain::Blockchain;
pub use chain_state::{OrphanBlock, OrphanPool};
pub use transaction::{Transaction, TransactionError, TransactionInput, TransactionOutput};
pub use validation::{verify_block_linkage, verify_transaction, LinkageError, ValidationError};
