use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::constants::REWARD_SENDER;
use crate::error::LedgerError;
use crate::{block_hash, genesis_block, pow, Block, Transaction};

/// The node's entire mutable state: the chain, the pending-transaction
/// pool and the known peer set.
///
/// The struct itself is synchronous and lock-free; callers that share
/// it across tasks wrap it in their own lock and must treat every
/// `&mut self` method as a single indivisible mutation.
#[derive(Debug, Default)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    peers: HashSet<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn peers(&self) -> &HashSet<String> {
        &self.peers
    }

    /// The stored tip, or the virtual genesis when the chain is empty.
    pub fn last_block(&self) -> Block {
        self.chain.last().cloned().unwrap_or_else(genesis_block)
    }

    /// Queue a transaction for the next mined block and return the
    /// index of the block that will eventually contain it.
    pub fn add_transaction(&mut self, sender: String, recipient: String, amount: u64) -> u64 {
        self.pending.push(Transaction {
            sender,
            recipient,
            amount,
        });
        self.chain.len() as u64 + 1
    }

    /// The tip proof a miner has to beat, or `NoPendingWork` when there
    /// is nothing to mine. Lets callers run the proof search without
    /// holding any lock on this state.
    pub fn prepare_work(&self) -> Result<u64, LedgerError> {
        if self.pending.is_empty() {
            return Err(LedgerError::NoPendingWork);
        }
        Ok(self.last_block().proof)
    }

    /// Seal the pending pool into a new block with the given proof.
    ///
    /// Appends the reward transaction (credited to `miner`, amount equal
    /// to the pre-reward pool size), links the block to the current tip,
    /// pushes it onto the chain and empties the pool, all as one
    /// mutation. No transaction is duplicated or dropped.
    ///
    /// The proof must still be valid against the current tip: when the
    /// chain moved after `prepare_work`, sealing is refused with
    /// `StaleProof` so the chain never loses proof continuity.
    pub fn seal_block(&mut self, proof: u64, miner: &str) -> Result<Block, LedgerError> {
        if self.pending.is_empty() {
            return Err(LedgerError::NoPendingWork);
        }
        if !pow::valid_proof(self.last_block().proof, proof) {
            return Err(LedgerError::StaleProof);
        }
        let reward = Transaction {
            sender: REWARD_SENDER.to_string(),
            recipient: miner.to_string(),
            amount: self.pending.len() as u64,
        };
        self.pending.push(reward);

        let block = Block {
            index: self.chain.len() as u64 + 1,
            timestamp: unix_timestamp(),
            transactions: std::mem::take(&mut self.pending),
            proof,
            previous_hash: block_hash(&self.last_block()),
        };
        info!(index = block.index, proof, "block forged");
        self.chain.push(block.clone());
        Ok(block)
    }

    /// Run the whole mining operation synchronously: take the tip
    /// proof, brute-force the next one and seal the block.
    pub fn mine_block(&mut self, miner: &str) -> Result<Block, LedgerError> {
        let last_proof = self.prepare_work()?;
        let proof = pow::find_proof(last_proof);
        self.seal_block(proof, miner)
    }

    /// Record a peer by its network location. The address must carry a
    /// scheme and a non-empty authority, e.g. `http://10.0.0.5:5001`;
    /// anything else is rejected without touching the peer set.
    pub fn register_peer(&mut self, address: &str) -> Result<String, LedgerError> {
        let location = netloc(address)
            .ok_or_else(|| LedgerError::InvalidAddress(address.to_string()))?;
        self.peers.insert(location.clone());
        Ok(location)
    }

    /// Unconditionally adopt `chain`. Callers are expected to have
    /// validated it first; consensus resolution is the only user.
    pub fn replace_chain(&mut self, chain: Vec<Block>) {
        info!(length = chain.len(), "chain replaced");
        self.chain = chain;
    }
}

/// The `host:port` part of a URI, or `None` when there is no scheme or
/// the authority is empty.
fn netloc(address: &str) -> Option<String> {
    let (_, rest) = address.split_once("://")?;
    let location = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if location.is_empty() {
        None
    } else {
        Some(location.to_string())
    }
}

fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs_f64()
}
