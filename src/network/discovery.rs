//! Peer discovery and liveness
//!
//! Gossip rounds snapshot the peer directory under the node lock, fan out
//! to every peer with the lock released, then re-lock to apply results.

use crate::network::node::{BlockOutcome, Node};
use chrono::{DateTime, Utc};
use futures::future::join_all;

impl Node {
    /// Startup gossip: announce ourselves, pull directories, then catch up
    /// on blocks committed while we were away.
    pub async fn bootstrap(&self) {
        let announced = self.push_self().await;
        let merged = self.pull_peers().await;
        let fetched = self.catch_up().await;
        log::info!(
            "Bootstrap complete: announced to {}, merged {} addresses, fetched {} blocks",
            announced,
            merged,
            fetched
        );
    }

    /// Announce our address to every known peer. Returns how many accepted.
    pub async fn push_self(&self) -> usize {
        let targets = self.lock().await.peers.addresses();
        let own = self.self_addr();

        let results = join_all(targets.iter().map(|peer| self.client.announce(peer, &own))).await;

        let mut accepted = 0;
        for (peer, result) in targets.iter().zip(results) {
            match result {
                Ok(()) => accepted += 1,
                Err(e) => log::warn!("Failed to announce to {}: {}", peer, e),
            }
        }
        accepted
    }

    /// Merge every reachable peer's directory into ours. Returns the number
    /// of entries written.
    pub async fn pull_peers(&self) -> usize {
        let targets = self.lock().await.peers.addresses();

        let results = join_all(targets.iter().map(|peer| self.client.get_addresses(peer))).await;

        let mut state = self.lock().await;
        let mut merged = 0;
        for (peer, result) in targets.iter().zip(results) {
            match result {
                Ok(listing) => merged += state.peers.merge(listing),
                Err(e) => log::warn!("Failed to get addresses from {}: {}", peer, e),
            }
        }
        merged
    }

    /// Probe every peer once. Peers that fail are dropped; the rest are
    /// stamped as seen now.
    pub async fn heartbeat_sweep(&self) -> usize {
        let targets = self.lock().await.peers.addresses();

        let results = join_all(targets.iter().map(|peer| self.client.heartbeat(peer))).await;

        let mut state = self.lock().await;
        let mut removed = 0;
        for (peer, result) in targets.iter().zip(results) {
            match result {
                Ok(()) => state.peers.refresh(peer),
                Err(e) => {
                    log::info!("Dropping unresponsive peer {}: {}", peer, e);
                    if state.peers.remove(peer) {
                        removed += 1;
                    }
                }
            }
        }
        removed
    }

    /// Fetch blocks newer than our tip from every peer and submit them in
    /// the order each peer returned them. Returns the number committed.
    pub async fn catch_up(&self) -> usize {
        let (targets, since) = {
            let state = self.lock().await;
            let since = state
                .chain
                .latest_block()
                .map(|b| b.timestamp)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            (state.peers.addresses(), since)
        };

        let results = join_all(
            targets
                .iter()
                .map(|peer| self.client.fetch_blocks_since(peer, since)),
        )
        .await;

        let mut committed = 0;
        for (peer, result) in targets.iter().zip(results) {
            let blocks = match result {
                Ok(blocks) => blocks,
                Err(e) => {
                    log::warn!("Failed to fetch blocks from {}: {}", peer, e);
                    continue;
                }
            };
            for block in blocks {
                let hash = block.hash.clone();
                match self.submit_block(block).await {
                    Ok(BlockOutcome::Committed { attached, .. }) => committed += 1 + attached,
                    Ok(_) => {}
                    Err(e) => log::warn!("Rejected block {} from {}: {}", hash, peer, e),
                }
            }
        }
        committed
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{Block, Blockchain, Transaction};
    use crate::network::client::testing::MockPeerClient;
    use crate::network::client::HttpPeerClient;
    use crate::network::node::{Node, NodeConfig};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    const SEED_A: &str = "127.0.0.1:18333";
    const SEED_B: &str = "127.0.0.1:18335";

    fn node_with(client: Arc<MockPeerClient>) -> (Node, Block) {
        let genesis = Block::genesis("alice", 100);
        let chain = Blockchain::with_genesis(genesis.clone()).unwrap();
        let config = NodeConfig {
            port: 18334,
            seed_peers: vec![SEED_A.to_string(), SEED_B.to_string()],
            persist: false,
            ..Default::default()
        };
        (Node::new(config, chain, client).unwrap(), genesis)
    }

    fn child_of(prev: &Block) -> Block {
        let mut block = Block::new(
            vec![Transaction::coinbase("miner", prev.height + 1)],
            &prev.hash,
            prev.height + 1,
            4,
        );
        block.timestamp = prev.timestamp + chrono::Duration::milliseconds(10);
        block.set_hash();
        block
    }

    #[tokio::test]
    async fn test_push_self_reaches_live_peers() {
        let client = Arc::new(MockPeerClient::default());
        client.set_down(SEED_B);
        let (node, _) = node_with(client.clone());

        assert_eq!(node.push_self().await, 1);
        assert_eq!(
            client.announced(),
            vec![(SEED_A.to_string(), "127.0.0.1:18334".to_string())]
        );
    }

    #[tokio::test]
    async fn test_pull_peers_merges_listings() {
        let client = Arc::new(MockPeerClient::default());
        let mut listing = HashMap::new();
        listing.insert("10.1.1.1:7000".to_string(), chrono::Utc::now());
        listing.insert("127.0.0.1:18334".to_string(), chrono::Utc::now());
        listing.insert("garbage".to_string(), chrono::Utc::now());
        client.set_directory(SEED_A, listing);
        client.set_down(SEED_B);
        let (node, _) = node_with(client);

        assert_eq!(node.pull_peers().await, 1);
        let known = node.known_addresses().await;
        assert!(known.contains_key("10.1.1.1:7000"));
        assert!(!known.contains_key("127.0.0.1:18334"));
        // Pull failures do not evict
        assert!(known.contains_key(SEED_B));
    }

    #[tokio::test]
    async fn test_heartbeat_drops_dead_peers() {
        let client = Arc::new(MockPeerClient::default());
        client.set_down(SEED_B);
        let (node, _) = node_with(client);
        let before = node.known_addresses().await[SEED_A];

        assert_eq!(node.heartbeat_sweep().await, 1);
        let known = node.known_addresses().await;
        assert_eq!(known.len(), 1);
        assert!(known[SEED_A] >= before);
    }

    #[tokio::test]
    async fn test_catch_up_commits_missing_blocks() {
        let client = Arc::new(MockPeerClient::default());
        let (node, genesis) = node_with(client.clone());
        let b1 = child_of(&genesis);
        let b2 = child_of(&b1);
        let b3 = child_of(&b2);

        client.set_blocks(SEED_A, vec![genesis.clone(), b1.clone(), b2.clone()]);
        // Second peer is ahead but returns its blocks newest first
        client.set_blocks(SEED_B, vec![b3.clone(), b2.clone(), b1.clone()]);

        assert_eq!(node.catch_up().await, 3);
        let status = node.status().await;
        assert_eq!(status.height, 4);
        assert_eq!(status.tip_hash, b3.hash);
        assert_eq!(status.orphans, 0);
    }

    #[tokio::test]
    async fn test_catch_up_tolerates_unreachable_peers() {
        let client = Arc::new(MockPeerClient::default());
        client.set_down(SEED_A);
        client.set_down(SEED_B);
        let (node, _) = node_with(client);

        assert_eq!(node.catch_up().await, 0);
        assert_eq!(node.status().await.height, 1);
    }

    #[tokio::test]
    async fn test_heartbeat_drops_peer_that_never_answers() {
        // Accepts connections and holds them open without replying
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let silent = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = NodeConfig {
            port: 18336,
            seed_peers: vec![silent.clone()],
            persist: false,
            ..Default::default()
        };
        let client = Arc::new(HttpPeerClient::new(Duration::from_millis(300)).unwrap());
        let chain = Blockchain::with_genesis(Block::genesis("alice", 100)).unwrap();
        let node = Node::new(config, chain, client).unwrap();
        assert!(node.known_addresses().await.contains_key(&silent));

        let removed = tokio::time::timeout(Duration::from_secs(5), node.heartbeat_sweep())
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(node.known_addresses().await.is_empty());
    }
}
