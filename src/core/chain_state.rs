//! Orphan block handling
//!
//! Blocks whose parent is not the current tip are parked here and
//! reattached, one linear chain at a time, once their parent commits.

use crate::core::block::Block;
use crate::core::blockchain::Blockchain;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// An orphan block waiting for its parent
#[derive(Debug, Clone)]
pub struct OrphanBlock {
    /// The block itself
    pub block: Block,
    /// When this orphan was received
    pub received_at: DateTime<Utc>,
}

/// Blocks parked until their parent commits.
///
/// Siblings (orphans sharing a parent) are kept in arrival order; on
/// reattachment the earliest arrival wins and the rest stay parked.
#[derive(Debug, Clone, Default)]
pub struct OrphanPool {
    /// Orphans keyed by their own hash
    orphans: HashMap<String, OrphanBlock>,
    /// Parent hash -> orphan hashes, in arrival order
    by_parent: HashMap<String, Vec<String>>,
}

impl OrphanPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a block. Returns false if it is already parked.
    pub fn park(&mut self, block: Block) -> bool {
        if self.orphans.contains_key(&block.hash) {
            return false;
        }

        let hash = block.hash.clone();
        self.by_parent
            .entry(block.prev_hash.clone())
            .or_default()
            .push(hash.clone());
        self.orphans.insert(
            hash,
            OrphanBlock {
                block,
                received_at: Utc::now(),
            },
        );

        true
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.orphans.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.orphans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orphans.is_empty()
    }

    /// Remove and return the earliest-arrived orphan whose parent is `parent_hash`
    fn take_child_of(&mut self, parent_hash: &str) -> Option<OrphanBlock> {
        let siblings = self.by_parent.get_mut(parent_hash)?;
        let hash = siblings.remove(0);
        if siblings.is_empty() {
            self.by_parent.remove(parent_hash);
        }
        self.orphans.remove(&hash)
    }

    /// Undo [`OrphanPool::take_child_of`], keeping its place ahead of later siblings
    fn restore_front(&mut self, orphan: OrphanBlock) {
        let hash = orphan.block.hash.clone();
        self.by_parent
            .entry(orphan.block.prev_hash.clone())
            .or_default()
            .insert(0, hash.clone());
        self.orphans.insert(hash, orphan);
    }

    /// Commit every orphan that chains from `parent_hash`.
    ///
    /// Walks the chain of descendants with an explicit loop: take the first
    /// orphan whose parent is `parent_hash`, commit it, continue from its
    /// hash. Returns the committed blocks in order.
    pub fn try_attach_all(&mut self, parent_hash: &str, chain: &mut Blockchain) -> Vec<Block> {
        let mut attached = Vec::new();
        let mut parent = parent_hash.to_string();

        while let Some(orphan) = self.take_child_of(&parent) {
            let block = orphan.block.clone();
            let hash = block.hash.clone();
            match chain.commit(block.clone()) {
                Ok(()) => {
                    let waited = Utc::now() - orphan.received_at;
                    log::info!(
                        "Reattached orphan block {} at height {} after {}ms",
                        hash,
                        block.height,
                        waited.num_milliseconds()
                    );
                    attached.push(block);
                    parent = hash;
                }
                Err(e) => {
                    log::warn!("Failed to reattach orphan {}: {}", hash, e);
                    self.restore_front(orphan);
                    break;
                }
            }
        }

        attached
    }
}
