//! Blockchain boundary.
//!
//! - `client`: node REST client (view functions, transaction polling)
//! - `wallet`: signing seam implemented outside the crate
//! - `bets`: bet placement/resolution flow and APT unit conversion
//! - `monitor`: periodic overview with 429 backoff

pub mod bets;
pub mod client;
pub mod monitor;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use bets::{apt_to_octas, BetService};
pub use client::ChainClient;
pub use monitor::{ChainMonitor, ChainOverview};
pub use wallet::{EntryFunctionPayload, Wallet};
