//! Historical and synthetic replay of the trading strategy.

pub mod runner;

pub use runner::{BacktestReport, BacktestTrade, Backtester};
