use thiserror::Error;

/// Failures the ledger can report. None of these are fatal; they map
/// onto client-visible rejections at the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Mining was requested while the pending pool is empty.
    #[error("no transactions to mine")]
    NoPendingWork,

    /// A peer address did not contain a usable `host:port`.
    #[error("invalid peer address: {0}")]
    InvalidAddress(String),

    /// The proof was found against a tip that has since moved; sealing
    /// it would break proof continuity at the new tip.
    #[error("proof does not match the current chain tip")]
    StaleProof,
}
