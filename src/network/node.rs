//! Ledger node coordinator
//!
//! The node owns the chain, the pending pool, the orphan pool and the peer
//! directory behind a single lock. Every documented operation runs as one
//! critical section; peer I/O is always done with the lock released.

use crate::core::{
    verify_transaction, Block, Blockchain, LinkageError, OrphanPool, Transaction, ValidationError,
};
use crate::mining::{Mempool, Packer};
use crate::network::client::{HttpPeerClient, PeerClient};
use crate::network::peer::{PeerDirectory, PeerError};
use crate::storage::{Storage, StorageConfig, StorageError};
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::future::join_all;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Node errors surfaced to callers
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    InvalidBlock(#[from] LinkageError),
    #[error("Malformed address: {0}")]
    MalformedAddress(String),
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Peer error: {0}")]
    Peer(PeerError),
}

impl From<PeerError> for NodeError {
    fn from(err: PeerError) -> Self {
        match err {
            PeerError::MalformedAddress(addr) => NodeError::MalformedAddress(addr),
            other => NodeError::Peer(other),
        }
    }
}

impl NodeError {
    /// Stable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            NodeError::Validation(e) => e.kind(),
            NodeError::InvalidBlock(_) => "InvalidBlock",
            NodeError::MalformedAddress(_) => "MalformedAddress",
            NodeError::MalformedTimestamp(_) => "MalformedTimestamp",
            NodeError::Storage(_) => "Storage",
            NodeError::Peer(_) => "PeerUnreachable",
        }
    }
}

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Host part of our announced address
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Initial peers (our own address is filtered out)
    pub seed_peers: Vec<String>,
    /// Data directory for the chain snapshot
    pub data_dir: PathBuf,
    /// Lower bound of the random packing interval
    pub pack_interval_min: Duration,
    /// Upper bound of the random packing interval
    pub pack_interval_max: Duration,
    /// Time between heartbeat sweeps
    pub heartbeat_interval: Duration,
    /// Timeout applied to every peer call
    pub peer_timeout: Duration,
    /// Write the chain to disk after each commit
    pub persist: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8333,
            seed_peers: vec!["127.0.0.1:8333".to_string()],
            data_dir: PathBuf::from(".ledger_data"),
            pack_interval_min: Duration::from_secs(1),
            pack_interval_max: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            peer_timeout: Duration::from_secs(5),
            persist: true,
        }
    }
}

impl NodeConfig {
    /// Our own `host:port`
    pub fn self_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            data_dir: self.data_dir.clone(),
            ..Default::default()
        }
    }
}

/// Result of submitting a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BlockOutcome {
    /// Block extended the chain; `attached` orphans followed it
    Committed { height: u64, attached: usize },
    /// Parent unknown; block parked until it arrives
    Orphaned,
    /// Block already committed or already parked
    Duplicate,
}

/// Node status information
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub address: String,
    pub height: u64,
    pub tip_hash: String,
    pub pending: usize,
    pub orphans: usize,
    pub peers: usize,
}

/// Everything guarded by the node lock
#[derive(Debug)]
pub struct NodeState {
    pub chain: Blockchain,
    pub mempool: Mempool,
    pub orphans: OrphanPool,
    pub peers: PeerDirectory,
}

/// The ledger node
pub struct Node {
    config: NodeConfig,
    state: Mutex<NodeState>,
    pub(crate) client: Arc<dyn PeerClient>,
    storage: Option<Storage>,
    packer: Packer,
    shutdown: CancellationToken,
}

impl Node {
    /// Create a node over an existing chain
    pub fn new(
        config: NodeConfig,
        chain: Blockchain,
        client: Arc<dyn PeerClient>,
    ) -> Result<Self, NodeError> {
        let storage = if config.persist {
            Some(Storage::new(config.storage_config())?)
        } else {
            None
        };
        let peers = PeerDirectory::with_seeds(&config.self_addr(), &config.seed_peers);

        Ok(Self {
            state: Mutex::new(NodeState {
                chain,
                mempool: Mempool::new(),
                orphans: OrphanPool::new(),
                peers,
            }),
            client,
            storage,
            packer: Packer::default(),
            shutdown: CancellationToken::new(),
            config,
        })
    }

    /// Load the chain snapshot from `data_dir` and talk to peers over HTTP
    pub fn open(config: NodeConfig) -> Result<Self, NodeError> {
        let storage = Storage::new(config.storage_config())?;
        log::info!("Loading blockchain from {}", storage.blockchain_path().display());
        let chain = storage.load()?;
        let client = Arc::new(HttpPeerClient::new(config.peer_timeout)?);
        Self::new(config, chain, client)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn self_addr(&self) -> String {
        self.config.self_addr()
    }

    /// Exclusive access to node state
    pub async fn lock(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().await
    }

    fn persist(&self, chain: &Blockchain) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.save(chain) {
                log::error!("Failed to save blockchain: {}", e);
            }
        }
    }

    // =========================================================================
    // Operations exposed to the transport layer
    // =========================================================================

    /// Record a peer's announced address
    pub async fn announce_address(&self, addr: &str) -> Result<(), NodeError> {
        let mut state = self.state.lock().await;
        state.peers.announce(addr)?;
        log::debug!("Peer announced: {}", addr);
        Ok(())
    }

    /// Known peers and when each was last seen
    pub async fn known_addresses(&self) -> BTreeMap<String, DateTime<Utc>> {
        self.state.lock().await.peers.listing()
    }

    /// Verify a transaction and queue it for packing.
    ///
    /// Resubmitting a transaction that is already pending is a no-op
    /// success.
    pub async fn submit_transaction(&self, mut tx: Transaction) -> Result<String, NodeError> {
        let mut state = self.state.lock().await;
        let hash = verify_transaction(&mut tx, &state.chain)?;
        if state.mempool.add_transaction(tx) {
            log::info!("Accepted transaction {}", hash);
        }
        Ok(hash)
    }

    /// Commit a block, or park it if its parent has not arrived yet
    pub async fn submit_block(&self, block: Block) -> Result<BlockOutcome, NodeError> {
        let mut guard = self.state.lock().await;
        let NodeState {
            chain,
            mempool,
            orphans,
            ..
        } = &mut *guard;

        let pruned = mempool.remove_included(&block);
        if pruned > 0 {
            log::debug!("Pruned {} pending transactions mined in {}", pruned, block.hash);
        }

        if chain.contains_block(&block.hash) || orphans.contains(&block.hash) {
            return Ok(BlockOutcome::Duplicate);
        }

        let hash = block.hash.clone();
        match chain.commit(block.clone()) {
            Ok(()) => {
                log::info!("Committed block {} at height {}", hash, block.height);
                let attached = orphans.try_attach_all(&hash, chain);
                for child in &attached {
                    mempool.remove_included(child);
                }
                self.persist(chain);
                let height = chain.height();
                self.log_status(&guard);
                Ok(BlockOutcome::Committed {
                    height,
                    attached: attached.len(),
                })
            }
            Err(e) if e.is_parkable() => {
                log::info!("Parked orphan block {} ({})", hash, e);
                orphans.park(block);
                Ok(BlockOutcome::Orphaned)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Committed blocks newer than `since`, oldest first
    pub async fn chain_since(&self, since: DateTime<Utc>) -> Vec<Block> {
        self.state.lock().await.chain.blocks_since(since)
    }

    /// [`Node::chain_since`] with an ISO-8601 timestamp
    pub async fn chain_since_str(&self, since: &str) -> Result<Vec<Block>, NodeError> {
        let since = parse_timestamp(since)?;
        Ok(self.chain_since(since).await)
    }

    /// Copy of the whole committed chain
    pub async fn chain_snapshot(&self) -> Blockchain {
        self.state.lock().await.chain.clone()
    }

    pub async fn status(&self) -> NodeStatus {
        let state = self.state.lock().await;
        self.status_of(&state)
    }

    fn status_of(&self, state: &NodeState) -> NodeStatus {
        NodeStatus {
            address: self.self_addr(),
            height: state.chain.height(),
            tip_hash: state.chain.tip_hash().to_string(),
            pending: state.mempool.len(),
            orphans: state.orphans.len(),
            peers: state.peers.len(),
        }
    }

    fn log_status(&self, state: &NodeState) {
        let status = self.status_of(state);
        log::info!(
            "Chain height {} tip {} | pending {} orphans {} peers {}",
            status.height,
            status.tip_hash,
            status.pending,
            status.orphans,
            status.peers
        );
    }

    // =========================================================================
    // Packing
    // =========================================================================

    /// One packing iteration: pack everything pending, then broadcast.
    pub async fn pack_once(&self) -> Option<Block> {
        let block = {
            let mut guard = self.state.lock().await;
            let NodeState {
                chain,
                mempool,
                orphans,
                ..
            } = &mut *guard;

            match self.packer.pack(chain, mempool) {
                Ok(Some(block)) => {
                    for child in orphans.try_attach_all(&block.hash, chain) {
                        mempool.remove_included(&child);
                    }
                    self.persist(chain);
                    self.log_status(&guard);
                    block
                }
                Ok(None) => return None,
                Err(e) => {
                    log::error!("Failed to commit packed block: {}", e);
                    return None;
                }
            }
        };

        self.broadcast_block(&block).await;
        Some(block)
    }

    /// Send `block` to every known peer. Returns how many accepted it.
    pub async fn broadcast_block(&self, block: &Block) -> usize {
        let targets = self.state.lock().await.peers.addresses();

        let results = join_all(
            targets
                .iter()
                .map(|peer| self.client.send_block(peer, block)),
        )
        .await;

        let mut delivered = 0;
        for (peer, result) in targets.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => log::warn!("Failed to send block {} to {}: {}", block.hash, peer, e),
            }
        }
        delivered
    }

    fn next_pack_interval(&self) -> Duration {
        let min = self.config.pack_interval_min.as_millis() as u64;
        let max = self.config.pack_interval_max.as_millis() as u64;
        let (low, high) = (min.min(max), min.max(max));
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }

    // =========================================================================
    // Background tasks and shutdown
    // =========================================================================

    /// Spawn the packing loop and the gossip/heartbeat loop
    pub fn spawn_background_tasks(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let packer = Arc::clone(self);
        let packing = tokio::spawn(async move {
            loop {
                let wait = packer.next_pack_interval();
                tokio::select! {
                    _ = packer.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
                packer.pack_once().await;
            }
            log::info!("Packing loop stopped");
        });

        let gossip = Arc::clone(self);
        let heartbeat = tokio::spawn(async move {
            tokio::select! {
                _ = gossip.shutdown.cancelled() => return,
                _ = gossip.bootstrap() => {}
            }

            let mut ticker = tokio::time::interval(gossip.config.heartbeat_interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = gossip.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        gossip.heartbeat_sweep().await;
                    }
                }
            }
            log::info!("Heartbeat loop stopped");
        });

        vec![packing, heartbeat]
    }

    /// Stop background loops after their current iteration
    pub fn shutdown(&self) {
        log::info!("Node shutting down...");
        self.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token cancelled on shutdown, for wiring into servers
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

/// Parse an ISO-8601 timestamp; a missing offset is read as UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, NodeError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| NodeError::MalformedTimestamp(raw.to_string()))
}
