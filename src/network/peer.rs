//! Peer directory for gossip networking
//!
//! Tracks known peer addresses (`ipv4:port`) and when each was last seen.
//! The node's own address is never a member.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddrV4;
use thiserror::Error;

/// Peer errors
#[derive(Error, Debug)]
pub enum PeerError {
    #[error("Malformed address: {0}")]
    MalformedAddress(String),
    #[error("Peer unreachable: {0}")]
    PeerUnreachable(String),
    #[error("Bad response from {peer}: {reason}")]
    BadResponse { peer: String, reason: String },
}

/// Check the strict `ipv4-literal:port` syntax
pub fn is_valid_address(addr: &str) -> bool {
    addr.parse::<SocketAddrV4>().is_ok()
}

/// Known peers and their last-seen times
#[derive(Debug, Clone)]
pub struct PeerDirectory {
    /// Our own announced address
    self_addr: String,
    /// Peer address -> last seen
    entries: HashMap<String, DateTime<Utc>>,
}

impl PeerDirectory {
    pub fn new(self_addr: &str) -> Self {
        Self {
            self_addr: self_addr.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Create a directory pre-seeded with bootstrap peers.
    /// Malformed seeds and our own address are skipped.
    pub fn with_seeds(self_addr: &str, seeds: &[String]) -> Self {
        let mut directory = Self::new(self_addr);
        for seed in seeds {
            if let Err(e) = directory.announce(seed) {
                log::warn!("Ignoring seed peer: {}", e);
            }
        }
        directory
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    /// Record an announced address, stamped with the current time
    pub fn announce(&mut self, addr: &str) -> Result<(), PeerError> {
        if !is_valid_address(addr) {
            return Err(PeerError::MalformedAddress(addr.to_string()));
        }
        if addr != self.self_addr {
            self.entries.insert(addr.to_string(), Utc::now());
        }
        Ok(())
    }

    /// Merge a peer-reported directory, keeping the reported timestamps.
    ///
    /// Malformed addresses and our own address are skipped. Returns the
    /// number of entries written.
    pub fn merge(&mut self, reported: HashMap<String, DateTime<Utc>>) -> usize {
        let mut merged = 0;
        for (addr, seen) in reported {
            if addr == self.self_addr || !is_valid_address(&addr) {
                continue;
            }
            self.entries.insert(addr, seen);
            merged += 1;
        }
        merged
    }

    /// Refresh an existing entry's last-seen time to now
    pub fn refresh(&mut self, addr: &str) {
        if let Some(seen) = self.entries.get_mut(addr) {
            *seen = Utc::now();
        }
    }

    pub fn remove(&mut self, addr: &str) -> bool {
        self.entries.remove(addr).is_some()
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.entries.contains_key(addr)
    }

    pub fn last_seen(&self, addr: &str) -> Option<DateTime<Utc>> {
        self.entries.get(addr).copied()
    }

    /// Addresses to contact, sorted for stable fan-out order
    pub fn addresses(&self) -> Vec<String> {
        let mut addrs: Vec<String> = self.entries.keys().cloned().collect();
        addrs.sort();
        addrs
    }

    /// Full directory, address -> last seen
    pub fn listing(&self) -> BTreeMap<String, DateTime<Utc>> {
        self.entries.iter().map(|(a, t)| (a.clone(), *t)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
