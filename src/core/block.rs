//! Block implementation for the ledger
//!
//! A block bundles transactions and links to its parent by hash.

use crate::core::transaction::Transaction;
use crate::crypto::chained_sha256_hex;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// `prev_hash` of the genesis block, and the tip of an empty chain
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Difficulty recorded on new blocks. Carried only, never enforced.
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// A block in the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Block creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Transactions carried by this block
    pub transactions: Vec<Transaction>,
    /// Hash of the parent block
    pub prev_hash: String,
    /// Block hash, empty until [`Block::set_hash`] runs
    pub hash: String,
    /// Reserved
    pub nonce: u64,
    /// Zero-based position in the chain
    pub height: u64,
    /// Reserved
    pub difficulty: u32,
}

impl Block {
    /// Create a new block stamped with the current time (hash not yet set)
    pub fn new(transactions: Vec<Transaction>, prev_hash: &str, height: u64, difficulty: u32) -> Self {
        Self {
            timestamp: Utc::now(),
            transactions,
            prev_hash: prev_hash.to_string(),
            hash: String::new(),
            nonce: 0,
            height,
            difficulty,
        }
    }

    /// Create the genesis block crediting `amount` to `owner_public_key`
    pub fn genesis(owner_public_key: &str, amount: u64) -> Self {
        let coinbase = Transaction::coinbase(owner_public_key, amount);
        let mut block = Self::new(vec![coinbase], GENESIS_PREV_HASH, 0, DEFAULT_DIFFICULTY);
        block.set_hash();
        block
    }

    /// Hash of `timestamp ‖ prev_hash`; no other field contributes
    pub fn compute_hash(&self) -> String {
        let header = format!(
            "{}{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
            self.prev_hash
        );
        chained_sha256_hex(header.as_bytes())
    }

    /// Compute and store the block hash
    pub fn set_hash(&mut self) -> &str {
        self.hash = self.compute_hash();
        &self.hash
    }

    /// Whether this block carries a transaction with the given hash
    pub fn contains_transaction(&self, tx_hash: &str) -> bool {
        self.transactions.iter().any(|tx| tx.hash == tx_hash)
    }

    /// Get number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis("owner", 100);
        assert_eq!(genesis.height, 0);
        assert_eq!(genesis.prev_hash, GENESIS_PREV_HASH);
        assert_eq!(genesis.hash, genesis.compute_hash());
        assert_eq!(genesis.tx_count(), 1);
        assert!(genesis.transactions[0].is_coinbase());
    }

    #[test]
    fn test_hash_depends_only_on_timestamp_and_prev() {
        let mut block = Block::genesis("owner", 100);
        let original = block.hash.clone();

        block.nonce = 42;
        block.difficulty = 9;
        block.height = 7;
        block.transactions.clear();
        assert_eq!(block.compute_hash(), original);

        block.prev_hash = "ff".repeat(32);
        assert_ne!(block.compute_hash(), original);
    }

    #[test]
    fn test_new_block_has_empty_hash() {
        let block = Block::new(vec![Transaction::coinbase("a", 1)], GENESIS_PREV_HASH, 1, 4);
        assert!(block.hash.is_empty());
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn test_hash_survives_serde() {
        let block = Block::genesis("owner", 100);
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.compute_hash(), block.hash);
    }
}
