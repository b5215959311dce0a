use std::sync::Arc;

use forge_core::{Ledger, Transaction};
use forge_node::api::{self, AppState};
use forge_node::peers::PeerClient;
use serde_json::Value;
use tokio::sync::RwLock;

async fn spawn_node(node_id: &str) -> (String, AppState) {
    let state = AppState {
        ledger: Arc::new(RwLock::new(Ledger::new())),
        node_id: node_id.to_string(),
        peers: PeerClient::new("http"),
    };
    let app = api::router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

async fn mine_blocks(state: &AppState, count: usize) {
    let mut guard = state.ledger.write().await;
    for i in 0..count {
        guard.add_transaction("alice".to_string(), "bob".to_string(), i as u64);
        guard.mine_block(&format!("miner-{i}")).unwrap();
    }
}

#[tokio::test]
async fn adopts_longer_valid_peer_chain() {
    let (local_base, local) = spawn_node("local").await;
    let (peer_base, peer) = spawn_node("peer").await;

    mine_blocks(&local, 1).await;
    mine_blocks(&peer, 3).await;
    local
        .ledger
        .write()
        .await
        .register_peer(&peer_base)
        .unwrap();

    let body: Value = reqwest::get(format!("{local_base}/nodes/resolve"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "Our chain was replaced");
    assert_eq!(body["chain"].as_array().unwrap().len(), 3);

    let local_chain = local.ledger.read().await.chain().to_vec();
    let peer_chain = peer.ledger.read().await.chain().to_vec();
    assert_eq!(local_chain, peer_chain);
}

#[tokio::test]
async fn keeps_chain_when_peer_is_shorter() {
    let (local_base, local) = spawn_node("local").await;
    let (peer_base, peer) = spawn_node("peer").await;

    mine_blocks(&local, 2).await;
    mine_blocks(&peer, 1).await;
    local
        .ledger
        .write()
        .await
        .register_peer(&peer_base)
        .unwrap();

    let before = local.ledger.read().await.chain().to_vec();
    let body: Value = reqwest::get(format!("{local_base}/nodes/resolve"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "Our chain is authoritative");
    assert_eq!(local.ledger.read().await.chain(), &before[..]);
}

#[tokio::test]
async fn rejects_longer_but_invalid_peer_chain() {
    let (local_base, local) = spawn_node("local").await;
    let (peer_base, peer) = spawn_node("peer").await;

    mine_blocks(&local, 1).await;
    mine_blocks(&peer, 3).await;

    // Corrupt a middle block of the peer's chain after mining. The
    // candidate is longer but must fail validation on the local side.
    {
        let mut guard = peer.ledger.write().await;
        let mut chain = guard.chain().to_vec();
        chain[1].transactions.push(Transaction {
            sender: "mallory".to_string(),
            recipient: "mallory".to_string(),
            amount: 1_000_000,
        });
        guard.replace_chain(chain);
    }

    local
        .ledger
        .write()
        .await
        .register_peer(&peer_base)
        .unwrap();

    let before = local.ledger.read().await.chain().to_vec();
    let body: Value = reqwest::get(format!("{local_base}/nodes/resolve"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "Our chain is authoritative");
    assert_eq!(local.ledger.read().await.chain(), &before[..]);
}

#[tokio::test]
async fn dead_peer_does_not_block_live_ones() {
    let (local_base, local) = spawn_node("local").await;
    let (peer_base, peer) = spawn_node("peer").await;

    mine_blocks(&peer, 2).await;
    {
        let mut guard = local.ledger.write().await;
        // Port 1 is essentially guaranteed to refuse connections.
        guard.register_peer("http://127.0.0.1:1").unwrap();
        guard.register_peer(&peer_base).unwrap();
    }

    let body: Value = reqwest::get(format!("{local_base}/nodes/resolve"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "Our chain was replaced");
    assert_eq!(local.ledger.read().await.chain().len(), 2);
}

#[tokio::test]
async fn equal_length_tie_goes_to_first_location() {
    let (local_base, local) = spawn_node("local").await;
    let (base_a, node_a) = spawn_node("peer-a").await;
    let (base_b, node_b) = spawn_node("peer-b").await;

    // Equally long but distinct chains: the reward recipients differ.
    {
        let mut guard = node_a.ledger.write().await;
        for i in 0..2u64 {
            guard.add_transaction("alice".to_string(), "bob".to_string(), i);
            guard.mine_block("miner-a").unwrap();
        }
    }
    {
        let mut guard = node_b.ledger.write().await;
        for i in 0..2u64 {
            guard.add_transaction("alice".to_string(), "bob".to_string(), i);
            guard.mine_block("miner-b").unwrap();
        }
    }
    assert_ne!(
        node_a.ledger.read().await.chain(),
        node_b.ledger.read().await.chain()
    );

    {
        let mut guard = local.ledger.write().await;
        guard.register_peer(&base_a).unwrap();
        guard.register_peer(&base_b).unwrap();
    }

    let body: Value = reqwest::get(format!("{local_base}/nodes/resolve"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "Our chain was replaced");

    // Peers are visited in lexicographic location order and only a
    // strictly longer candidate displaces the current best, so the
    // first location wins the tie.
    let location_a = base_a.trim_start_matches("http://").to_string();
    let location_b = base_b.trim_start_matches("http://").to_string();
    let winner = if location_a < location_b { &node_a } else { &node_b };
    assert_eq!(
        local.ledger.read().await.chain(),
        winner.ledger.read().await.chain()
    );
}

#[tokio::test]
async fn longest_of_several_peers_wins() {
    let (local_base, local) = spawn_node("local").await;
    let (short_base, short) = spawn_node("short").await;
    let (long_base, long) = spawn_node("long").await;

    mine_blocks(&short, 1).await;
    mine_blocks(&long, 3).await;
    {
        let mut guard = local.ledger.write().await;
        guard.register_peer(&short_base).unwrap();
        guard.register_peer(&long_base).unwrap();
    }

    let body: Value = reqwest::get(format!("{local_base}/nodes/resolve"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "Our chain was replaced");
    assert_eq!(
        local.ledger.read().await.chain(),
        long.ledger.read().await.chain()
    );
}
