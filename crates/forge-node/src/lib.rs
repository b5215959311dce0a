//! HTTP node around the `forge-core` ledger engine: configuration,
//! REST surface, peer fetch client and longest-chain consensus.

pub mod api;
pub mod config;
pub mod consensus;
pub mod peers;
