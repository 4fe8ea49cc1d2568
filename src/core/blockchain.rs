//! Blockchain implementation
//!
//! The chain store: an append-only sequence of committed blocks with a
//! tip pointer, plus hash indexes for blocks and transactions.

use crate::core::block::{Block, GENESIS_PREV_HASH};
use crate::core::transaction::{Transaction, TransactionOutput};
use crate::core::validation::{verify_block_linkage, LinkageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// On-disk / wire form: just the ordered blocks.
#[derive(Deserialize)]
struct ChainSnapshot {
    blocks: Vec<Block>,
}

impl TryFrom<ChainSnapshot> for Blockchain {
    type Error = LinkageError;

    fn try_from(snapshot: ChainSnapshot) -> Result<Self, Self::Error> {
        Blockchain::from_blocks(snapshot.blocks)
    }
}

/// The committed chain of blocks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "ChainSnapshot")]
pub struct Blockchain {
    /// Committed blocks, genesis first
    blocks: Vec<Block>,
    /// Block hash -> position in `blocks`
    #[serde(skip)]
    block_index: HashMap<String, usize>,
    /// Transaction hash -> (block position, transaction position).
    /// The earliest commit of a hash wins.
    #[serde(skip)]
    tx_index: HashMap<String, (usize, usize)>,
}

impl Blockchain {
    /// Create an empty chain whose tip is [`GENESIS_PREV_HASH`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chain holding only the given genesis block
    pub fn with_genesis(genesis: Block) -> Result<Self, LinkageError> {
        let mut chain = Self::new();
        chain.commit(genesis)?;
        Ok(chain)
    }

    /// Rebuild a chain by committing `blocks` in order
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, LinkageError> {
        let mut chain = Self::new();
        for block in blocks {
            chain.commit(block)?;
        }
        Ok(chain)
    }

    /// Append a block that extends the tip.
    ///
    /// Linkage is re-checked here; on failure the chain is unchanged.
    pub fn commit(&mut self, block: Block) -> Result<(), LinkageError> {
        verify_block_linkage(&block, self)?;

        let position = self.blocks.len();
        for (tx_position, tx) in block.transactions.iter().enumerate() {
            if tx.hash.is_empty() {
                continue;
            }
            self.tx_index
                .entry(tx.hash.clone())
                .or_insert((position, tx_position));
        }
        self.block_index.insert(block.hash.clone(), position);
        self.blocks.push(block);

        Ok(())
    }

    /// Hash of the last committed block
    pub fn tip_hash(&self) -> &str {
        self.blocks
            .last()
            .map(|b| b.hash.as_str())
            .unwrap_or(GENESIS_PREV_HASH)
    }

    /// Number of committed blocks
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All committed blocks, in chain order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Get the latest block
    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Get a block by hash
    pub fn lookup_block(&self, hash: &str) -> Option<&Block> {
        self.block_index.get(hash).map(|&i| &self.blocks[i])
    }

    pub fn contains_block(&self, hash: &str) -> bool {
        self.block_index.contains_key(hash)
    }

    /// Blocks with a timestamp strictly after `since`, oldest first
    pub fn blocks_since(&self, since: DateTime<Utc>) -> Vec<Block> {
        self.blocks
            .iter()
            .filter(|b| b.timestamp > since)
            .cloned()
            .collect()
    }

    /// Blocks in positions `start..end`, clamped to the chain length
    pub fn range(&self, start: usize, end: usize) -> &[Block] {
        let end = end.min(self.blocks.len());
        let start = start.min(end);
        &self.blocks[start..end]
    }

    /// Get a committed transaction by hash
    pub fn find_transaction(&self, tx_hash: &str) -> Option<&Transaction> {
        self.tx_index
            .get(tx_hash)
            .map(|&(b, t)| &self.blocks[b].transactions[t])
    }

    /// Resolve `tx_hash:index` to a committed output
    pub fn find_output(&self, tx_hash: &str, index: u32) -> Option<&TransactionOutput> {
        self.find_transaction(tx_hash)
            .and_then(|tx| tx.outputs.get(index as usize))
    }

    pub fn contains_transaction(&self, tx_hash: &str) -> bool {
        self.tx_index.contains_key(tx_hash)
    }
}
