//! XENITH: sentiment betting backend and simulated trading bot.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod feeds;
pub mod strategy;
pub mod engine;
pub mod backtest;
pub mod oracle;
pub mod chain;
pub mod storage;
pub mod server;
