use std::time::Duration;

use forge_core::Block;
use serde::Deserialize;
use thiserror::Error;

/// Upper bound on any single peer request. A slow peer costs at most
/// this much and never stalls the other fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// One peer's view of its chain, as served by its `GET /chain`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// Why a peer's chain could not be fetched. Always recovered locally:
/// the peer is skipped for this resolution round, nothing else.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("request to {peer} failed: {source}")]
    Request {
        peer: String,
        source: reqwest::Error,
    },
    #[error("{peer} answered with status {status}")]
    Status {
        peer: String,
        status: reqwest::StatusCode,
    },
}

/// HTTP client for the chain-retrieval endpoint of peer nodes.
#[derive(Clone)]
pub struct PeerClient {
    http: reqwest::Client,
    protocol: String,
}

impl PeerClient {
    pub fn new(protocol: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("http client");
        Self {
            http,
            protocol: protocol.to_string(),
        }
    }

    /// Fetch the chain snapshot of the peer at `location` (`host:port`).
    pub async fn fetch_chain(&self, location: &str) -> Result<ChainSnapshot, PeerError> {
        let url = format!("{}://{}/chain", self.protocol, location);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| PeerError::Request {
                peer: location.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                peer: location.to_string(),
                status,
            });
        }

        response.json().await.map_err(|source| PeerError::Request {
            peer: location.to_string(),
            source,
        })
    }
}
