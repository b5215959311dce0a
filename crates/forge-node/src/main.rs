use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use forge_core::Ledger;
use forge_node::api::{self, AppState};
use forge_node::config::Config;
use forge_node::peers::PeerClient;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::parse();
    let node_id = config.node_identity();

    let state = AppState {
        ledger: Arc::new(RwLock::new(Ledger::new())),
        node_id: node_id.clone(),
        peers: PeerClient::new(&config.protocol),
    };
    let app = api::router(state);

    let addr: SocketAddr = config.listen_addr().parse()?;
    info!(%addr, node_id, "forge-node listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
