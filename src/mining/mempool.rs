//! Transaction pool (mempool) for pending transactions
//!
//! Holds verified transactions waiting to be packed into a block,
//! keyed by hash and kept in acceptance order.

use crate::core::{Block, Transaction};
use std::collections::{HashMap, HashSet};

/// Memory pool for accepted, not yet mined transactions
#[derive(Debug, Default)]
pub struct Mempool {
    /// Transactions indexed by hash
    entries: HashMap<String, Transaction>,
    /// Transaction hashes in order of acceptance
    by_time: Vec<String>,
}

impl Mempool {
    /// Create a new mempool
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a verified transaction. Returns false if it is already pending.
    pub fn add_transaction(&mut self, tx: Transaction) -> bool {
        if self.entries.contains_key(&tx.hash) {
            return false;
        }

        let tx_hash = tx.hash.clone();
        self.by_time.push(tx_hash.clone());
        self.entries.insert(tx_hash, tx);
        true
    }

    /// Pending transactions in acceptance order
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.by_time
            .iter()
            .filter_map(|hash| self.entries.get(hash))
            .cloned()
            .collect()
    }

    /// Remove exactly the given transactions; later arrivals are untouched
    pub fn remove_transactions(&mut self, tx_hashes: &[String]) {
        let doomed: HashSet<&str> = tx_hashes.iter().map(String::as_str).collect();
        self.by_time.retain(|h| !doomed.contains(h.as_str()));
        self.entries.retain(|h, _| !doomed.contains(h.as_str()));
    }

    /// Drop every pending transaction already carried by `block`
    pub fn remove_included(&mut self, block: &Block) -> usize {
        let included: Vec<String> = block
            .transactions
            .iter()
            .filter(|tx| self.entries.contains_key(&tx.hash))
            .map(|tx| tx.hash.clone())
            .collect();
        self.remove_transactions(&included);
        included.len()
    }

    /// Check if transaction is pending
    pub fn contains(&self, tx_hash: &str) -> bool {
        self.entries.contains_key(tx_hash)
    }

    /// Get transaction by hash
    pub fn get(&self, tx_hash: &str) -> Option<&Transaction> {
        self.entries.get(tx_hash)
    }

    /// Get number of pending transactions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if mempool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
