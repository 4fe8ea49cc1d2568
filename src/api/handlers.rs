//! HTTP handlers for node operations

use crate::core::{Block, Blockchain, Transaction};
use crate::network::{BlockOutcome, Node, NodeError};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub node: Arc<Node>,
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AnnounceRequest {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub alive: bool,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitTransactionRequest {
    pub transaction: Transaction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTransactionResponse {
    pub hash: String,
}

#[derive(Debug, Deserialize)]
pub struct SinceQuery {
    pub since: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub kind: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn reject(err: NodeError) -> (StatusCode, Json<ApiError>) {
    let status = match err {
        NodeError::Storage(_) | NodeError::Peer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ApiError {
            error: err.to_string(),
            kind: err.kind().to_string(),
        }),
    )
}

// ============================================================================
// Peer Directory Handlers
// ============================================================================

/// POST /addr - Record an announced peer address
pub async fn announce_address(
    State(state): State<ApiState>,
    Json(req): Json<AnnounceRequest>,
) -> ApiResult<MessageResponse> {
    state
        .node
        .announce_address(&req.address)
        .await
        .map_err(reject)?;

    Ok(Json(MessageResponse {
        message: format!("Address {} recorded", req.address),
    }))
}

/// GET /getaddr - Known peer addresses with last-seen times
pub async fn get_addresses(State(state): State<ApiState>) -> Json<BTreeMap<String, DateTime<Utc>>> {
    Json(state.node.known_addresses().await)
}

/// GET /heartbeat - Liveness probe
pub async fn heartbeat(State(state): State<ApiState>) -> Json<HeartbeatResponse> {
    Json(HeartbeatResponse {
        alive: true,
        address: state.node.self_addr(),
    })
}

// ============================================================================
// Ledger Handlers
// ============================================================================

/// POST /transactions - Verify and queue a transaction
pub async fn submit_transaction(
    State(state): State<ApiState>,
    Json(req): Json<SubmitTransactionRequest>,
) -> ApiResult<SubmitTransactionResponse> {
    let hash = state
        .node
        .submit_transaction(req.transaction)
        .await
        .map_err(reject)?;
    Ok(Json(SubmitTransactionResponse { hash }))
}

/// POST /blocks - Commit or park a block from a peer
pub async fn submit_block(
    State(state): State<ApiState>,
    Json(block): Json<Block>,
) -> ApiResult<BlockOutcome> {
    let outcome = state.node.submit_block(block).await.map_err(reject)?;
    Ok(Json(outcome))
}

/// GET /blocks?since=ISO - Committed blocks newer than `since`
pub async fn get_blocks_since(
    State(state): State<ApiState>,
    Query(query): Query<SinceQuery>,
) -> ApiResult<Vec<Block>> {
    let blocks = state
        .node
        .chain_since_str(&query.since)
        .await
        .map_err(reject)?;
    Ok(Json(blocks))
}

/// GET /chain - Full chain export
pub async fn get_chain(State(state): State<ApiState>) -> Json<Blockchain> {
    Json(state.node.chain_snapshot().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransactionOutput;
    use crate::network::client::testing::MockPeerClient;
    use crate::network::NodeConfig;
    use crate::wallet::Wallet;

    fn state() -> (ApiState, Wallet, Block) {
        let alice = Wallet::new();
        let genesis = Block::genesis(&alice.public_key(), 100);
        let chain = Blockchain::with_genesis(genesis.clone()).unwrap();
        let config = NodeConfig {
            port: 18400,
            seed_peers: Vec::new(),
            persist: false,
            ..Default::default()
        };
        let node = Node::new(config, chain, Arc::new(MockPeerClient::default())).unwrap();
        (
            ApiState {
                node: Arc::new(node),
            },
            alice,
            genesis,
        )
    }

    #[tokio::test]
    async fn test_heartbeat_reports_self() {
        let (state, _, _) = state();
        let Json(ack) = heartbeat(State(state)).await;
        assert!(ack.alive);
        assert_eq!(ack.address, "127.0.0.1:18400");
    }

    #[tokio::test]
    async fn test_announce_then_list() {
        let (state, _, _) = state();
        let Json(ack) = announce_address(
            State(state.clone()),
            Json(AnnounceRequest {
                address: "10.0.0.3:8333".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(ack.message.contains("10.0.0.3:8333"));

        let Json(listing) = get_addresses(State(state.clone())).await;
        assert!(listing.contains_key("10.0.0.3:8333"));

        let (status, Json(err)) = announce_address(
            State(state),
            Json(AnnounceRequest {
                address: "10.0.0.3".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, "MalformedAddress");
    }

    #[tokio::test]
    async fn test_submit_transaction_errors_carry_kind() {
        let (state, alice, _) = state();
        let tx = alice
            .create_transaction(
                &"00".repeat(32),
                0,
                vec![TransactionOutput::new(1, &alice.public_key())],
            )
            .unwrap();

        let (status, Json(err)) = submit_transaction(
            State(state),
            Json(SubmitTransactionRequest { transaction: tx }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, "UnresolvedInput");
    }

    #[tokio::test]
    async fn test_submit_transaction_returns_hash() {
        let (state, alice, genesis) = state();
        let tx = alice
            .create_transaction(
                &genesis.transactions[0].hash,
                0,
                vec![TransactionOutput::new(40, &alice.public_key())],
            )
            .unwrap();
        let expected = tx.compute_hash();

        let Json(resp) = submit_transaction(
            State(state),
            Json(SubmitTransactionRequest { transaction: tx }),
        )
        .await
        .unwrap();
        assert_eq!(resp.hash, expected);
    }

    #[tokio::test]
    async fn test_block_submission_and_export() {
        let (state, _, genesis) = state();
        let mut block = Block::new(vec![Transaction::coinbase("miner", 1)], &genesis.hash, 1, 4);
        block.set_hash();

        let Json(outcome) = submit_block(State(state.clone()), Json(block.clone()))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            BlockOutcome::Committed {
                height: 2,
                attached: 0
            }
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "committed");

        let Json(blocks) = get_blocks_since(
            State(state.clone()),
            Query(SinceQuery {
                since: genesis.timestamp.to_rfc3339(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(blocks, vec![block]);

        let Json(chain) = get_chain(State(state)).await;
        assert_eq!(chain.height(), 2);
    }

    #[tokio::test]
    async fn test_bad_since_is_rejected() {
        let (state, _, _) = state();
        let (status, Json(err)) = get_blocks_since(
            State(state),
            Query(SinceQuery {
                since: "not a time".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, "MalformedTimestamp");
    }
}
