use forge_core::validate::is_valid_chain;
use forge_core::Ledger;
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::peers::{ChainSnapshot, PeerClient};

/// Longest-valid-chain resolution against the registered peers.
///
/// All peer chains are fetched concurrently before any lock is taken;
/// the write lock is held only for the final swap, so resolution can
/// never race a concurrent mine. A failing peer only excludes itself.
/// Returns true iff the local chain was replaced.
pub async fn resolve(ledger: &RwLock<Ledger>, client: &PeerClient) -> bool {
    let (peers, local_length) = {
        let guard = ledger.read().await;
        let mut peers: Vec<String> = guard.peers().iter().cloned().collect();
        // Lexicographic order makes tie-breaks between equally long
        // candidates reproducible.
        peers.sort();
        (peers, guard.chain().len())
    };

    let results = join_all(peers.iter().map(|peer| client.fetch_chain(peer))).await;

    let mut best: Option<ChainSnapshot> = None;
    let mut max_length = local_length;
    for (peer, result) in peers.iter().zip(results) {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(peer, %err, "peer excluded from resolution");
                continue;
            }
        };
        if snapshot.length <= max_length {
            debug!(peer, length = snapshot.length, "peer chain is not longer");
            continue;
        }
        if !is_valid_chain(&snapshot.chain) {
            warn!(peer, length = snapshot.length, "peer chain failed validation");
            continue;
        }
        max_length = snapshot.length;
        best = Some(snapshot);
    }

    match best {
        Some(snapshot) => {
            info!(length = snapshot.length, "adopting longer peer chain");
            ledger.write().await.replace_chain(snapshot.chain);
            true
        }
        None => false,
    }
}
