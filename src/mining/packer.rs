//! Block packing
//!
//! Turns the pending pool into the next block. There is no proof of work:
//! a block is valid as soon as its hash is set and it links to the tip.

use crate::core::{Block, Blockchain, LinkageError, DEFAULT_DIFFICULTY};
use crate::mining::Mempool;
use log::info;

/// Packs pending transactions into blocks
#[derive(Debug, Clone)]
pub struct Packer {
    /// Difficulty recorded on packed blocks
    pub difficulty: u32,
}

impl Default for Packer {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
        }
    }
}

impl Packer {
    pub fn new(difficulty: u32) -> Self {
        Self { difficulty }
    }

    /// Pack every pending transaction into a new block and commit it.
    ///
    /// Returns `Ok(None)` when the pool is empty. Only the snapped
    /// transactions are removed from the pool. The caller must hold
    /// exclusive access to both `chain` and `mempool`.
    pub fn pack(
        &self,
        chain: &mut Blockchain,
        mempool: &mut Mempool,
    ) -> Result<Option<Block>, LinkageError> {
        if mempool.is_empty() {
            return Ok(None);
        }

        let transactions = mempool.snapshot();
        let snapped: Vec<String> = transactions.iter().map(|tx| tx.hash.clone()).collect();

        let mut block = Block::new(transactions, chain.tip_hash(), chain.height(), self.difficulty);
        block.set_hash();

        chain.commit(block.clone())?;
        mempool.remove_transactions(&snapped);

        info!(
            "Packed block {} at height {} with {} transactions",
            block.hash,
            block.height,
            snapped.len()
        );

        Ok(Some(block))
    }
}
