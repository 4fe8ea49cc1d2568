//! Outbound calls to peers
//!
//! [`PeerClient`] is the seam between the node and whatever carries its
//! requests; [`HttpPeerClient`] speaks the node's own HTTP routes.

use crate::api::handlers::{AnnounceRequest, HeartbeatResponse};
use crate::api::routes::{ADDR_PATH, BLOCKS_PATH, GETADDR_PATH, HEARTBEAT_PATH};
use crate::core::Block;
use crate::network::peer::PeerError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

/// Calls a node can make on a peer. Every call is independent; a failure
/// says nothing about other peers.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Tell `peer` about our address
    async fn announce(&self, peer: &str, own_addr: &str) -> Result<(), PeerError>;

    /// Ask `peer` for its directory
    async fn get_addresses(&self, peer: &str)
        -> Result<HashMap<String, DateTime<Utc>>, PeerError>;

    /// Liveness probe
    async fn heartbeat(&self, peer: &str) -> Result<(), PeerError>;

    /// Push a freshly committed block
    async fn send_block(&self, peer: &str, block: &Block) -> Result<(), PeerError>;

    /// Fetch the peer's blocks newer than `since`
    async fn fetch_blocks_since(
        &self,
        peer: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Block>, PeerError>;
}

/// [`PeerClient`] over HTTP with a per-request timeout
#[derive(Clone)]
pub struct HttpPeerClient {
    inner: Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let inner = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::PeerUnreachable(e.to_string()))?;
        Ok(Self { inner })
    }

    fn url(peer: &str, path: &str) -> String {
        format!("http://{}{}", peer, path)
    }

    fn check(peer: &str, response: Response) -> Result<Response, PeerError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(PeerError::BadResponse {
                peer: peer.to_string(),
                reason: format!("HTTP {}", response.status()),
            })
        }
    }

    async fn decode<T: DeserializeOwned>(peer: &str, response: Response) -> Result<T, PeerError> {
        Self::check(peer, response)?
            .json::<T>()
            .await
            .map_err(|e| PeerError::BadResponse {
                peer: peer.to_string(),
                reason: e.to_string(),
            })
    }
}

fn unreachable(peer: &str, err: reqwest::Error) -> PeerError {
    PeerError::PeerUnreachable(format!("{}: {}", peer, err))
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn announce(&self, peer: &str, own_addr: &str) -> Result<(), PeerError> {
        let body = AnnounceRequest {
            address: own_addr.to_string(),
        };
        let response = self
            .inner
            .post(Self::url(peer, ADDR_PATH))
            .json(&body)
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;
        Self::check(peer, response).map(|_| ())
    }

    async fn get_addresses(
        &self,
        peer: &str,
    ) -> Result<HashMap<String, DateTime<Utc>>, PeerError> {
        let response = self
            .inner
            .get(Self::url(peer, GETADDR_PATH))
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;
        Self::decode(peer, response).await
    }

    async fn heartbeat(&self, peer: &str) -> Result<(), PeerError> {
        let response = self
            .inner
            .get(Self::url(peer, HEARTBEAT_PATH))
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;
        let ack: HeartbeatResponse = Self::decode(peer, response).await?;
        if ack.alive {
            Ok(())
        } else {
            Err(PeerError::BadResponse {
                peer: peer.to_string(),
                reason: "peer reported not alive".to_string(),
            })
        }
    }

    async fn send_block(&self, peer: &str, block: &Block) -> Result<(), PeerError> {
        let response = self
            .inner
            .post(Self::url(peer, BLOCKS_PATH))
            .json(block)
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;
        Self::check(peer, response).map(|_| ())
    }

    async fn fetch_blocks_since(
        &self,
        peer: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Block>, PeerError> {
        let since = since.to_rfc3339_opts(SecondsFormat::Nanos, true);
        let response = self
            .inner
            .get(Self::url(peer, BLOCKS_PATH))
            .query(&[("since", since)])
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;
        Self::decode(peer, response).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_urls() {
        assert_eq!(
            HttpPeerClient::url("127.0.0.1:8333", BLOCKS_PATH),
            "http://127.0.0.1:8333/blocks"
        );
        assert_eq!(
            HttpPeerClient::url("10.0.0.1:9000", HEARTBEAT_PATH),
            "http://10.0.0.1:9000/heartbeat"
        );
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_an_error() {
        let client = HttpPeerClient::new(Duration::from_millis(300)).unwrap();
        // Port 9 on loopback has no listener in test environments
        let err = client.heartbeat("127.0.0.1:9").await.unwrap_err();
        assert!(matches!(err, PeerError::PeerUnreachable(_)));
    }
}
