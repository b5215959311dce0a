use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use forge_core::pow::find_proof;
use forge_core::{Block, Ledger, LedgerError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::consensus;
use crate::peers::PeerClient;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub node_id: String,
    pub peers: PeerClient,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chain", get(full_chain))
        .route("/mine", get(mine))
        .route("/transactions/new", post(new_transaction))
        .route("/nodes", get(list_nodes))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve_conflicts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Request failures. No request can take the process down; rejected
/// inputs map to a 4xx and internal faults to a 5xx, always with a
/// `message` body.
#[derive(Debug)]
pub enum ApiError {
    MissingValues,
    EmptyNodeList,
    Ledger(LedgerError),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingValues => {
                (StatusCode::BAD_REQUEST, "Some values are missing".to_string())
            }
            ApiError::EmptyNodeList => {
                (StatusCode::BAD_REQUEST, "Invalid list of nodes".to_string())
            }
            ApiError::Ledger(LedgerError::NoPendingWork) => {
                (StatusCode::NOT_FOUND, "No transactions found".to_string())
            }
            ApiError::Ledger(err @ LedgerError::InvalidAddress(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Ledger(err @ LedgerError::StaleProof) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[derive(Serialize)]
struct ChainView {
    chain: Vec<Block>,
    length: usize,
}

async fn full_chain(State(state): State<AppState>) -> Json<ChainView> {
    let guard = state.ledger.read().await;
    Json(ChainView {
        chain: guard.chain().to_vec(),
        length: guard.chain().len(),
    })
}

async fn mine(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    // The proof search is CPU-bound and unbounded; run it off the
    // shared state so readers are not starved while mining.
    loop {
        let last_proof = state.ledger.read().await.prepare_work()?;
        let proof = tokio::task::spawn_blocking(move || find_proof(last_proof))
            .await
            .map_err(|err| ApiError::Internal(format!("proof search task failed: {err}")))?;

        let block = match state.ledger.write().await.seal_block(proof, &state.node_id) {
            Ok(block) => block,
            // Another block was sealed while we were searching; redo
            // the work against the new tip.
            Err(LedgerError::StaleProof) => {
                debug!(proof, "tip moved during proof search, retrying");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        return Ok(Json(json!({
            "message": "New block forged",
            "index": block.index,
            "transactions": block.transactions,
            "proof": block.proof,
            "previous_hash": block.previous_hash,
        })));
    }
}

/// All fields optional so an incomplete payload surfaces as our own
/// 400 rather than a deserialization rejection.
#[derive(Deserialize)]
struct TransactionIn {
    sender: Option<String>,
    recipient: Option<String>,
    amount: Option<u64>,
}

async fn new_transaction(
    State(state): State<AppState>,
    Json(body): Json<TransactionIn>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let (Some(sender), Some(recipient), Some(amount)) = (body.sender, body.recipient, body.amount)
    else {
        return Err(ApiError::MissingValues);
    };

    let index = state
        .ledger
        .write()
        .await
        .add_transaction(sender, recipient, amount);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": format!("Transaction will be added to block {index}") })),
    ))
}

async fn list_nodes(State(state): State<AppState>) -> Json<serde_json::Value> {
    let guard = state.ledger.read().await;
    let mut nodes: Vec<String> = guard.peers().iter().cloned().collect();
    nodes.sort();
    Json(json!({ "nodes": nodes, "length": nodes.len() }))
}

#[derive(Deserialize)]
struct RegisterIn {
    nodes: Option<Vec<String>>,
}

async fn register_nodes(
    State(state): State<AppState>,
    Json(body): Json<RegisterIn>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let nodes = body.nodes.unwrap_or_default();
    if nodes.is_empty() {
        return Err(ApiError::EmptyNodeList);
    }

    let mut guard = state.ledger.write().await;
    for address in &nodes {
        guard.register_peer(address)?;
    }

    let mut registered: Vec<String> = guard.peers().iter().cloned().collect();
    registered.sort();
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "New nodes have been added", "nodes": registered })),
    ))
}

async fn resolve_conflicts(State(state): State<AppState>) -> Json<serde_json::Value> {
    let replaced = consensus::resolve(&state.ledger, &state.peers).await;
    let message = if replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    let guard = state.ledger.read().await;
    Json(json!({ "message": message, "chain": guard.chain() }))
}
