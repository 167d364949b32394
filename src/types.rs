//! Shared types for XENITH.
//!
//! These types form the data model used across all modules: sentiment
//! samples, positions, strategy configuration, and persisted bet records.
//! They are kept free of behaviour beyond small helpers so that feeds,
//! strategy, and engine modules can depend on them without cycles.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

/// Direction of the most recent change in sentiment score.
///
/// Encoded on the wire (chain view functions, persisted JSON) as
/// `0 = Down`, `1 = Stable`, `2 = Up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Trend {
    Down,
    Stable,
    Up,
}

impl Trend {
    /// Trend implied by moving from `prev` to `score`.
    pub fn between(prev: u8, score: u8) -> Self {
        match score.cmp(&prev) {
            std::cmp::Ordering::Equal => Trend::Stable,
            std::cmp::Ordering::Greater => Trend::Up,
            std::cmp::Ordering::Less => Trend::Down,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Trend::Down => 0,
            Trend::Stable => 1,
            Trend::Up => 2,
        }
    }
}

impl TryFrom<u8> for Trend {
    type Error = XenithError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Trend::Down),
            1 => Ok(Trend::Stable),
            2 => Ok(Trend::Up),
            other => Err(XenithError::InvalidInput(format!("unknown trend code {other}"))),
        }
    }
}

impl From<Trend> for u8 {
    fn from(t: Trend) -> u8 {
        t.code()
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Down => write!(f, "Down"),
            Trend::Stable => write!(f, "Stable"),
            Trend::Up => write!(f, "Up"),
        }
    }
}

/// A single timestamped sentiment reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentSample {
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "t")]
    pub timestamp: i64,
    /// Aggregate market mood, 0 (fear) to 100 (greed). Clamped on read.
    #[serde(deserialize_with = "deserialize_score")]
    pub score: u8,
    pub trend: Trend,
}

impl SentimentSample {
    /// Build a sample, clamping `score` into `[0, 100]`.
    pub fn new(timestamp: i64, score: i64, trend: Trend) -> Self {
        Self {
            timestamp,
            score: clamp_score(score),
            trend,
        }
    }
}

impl fmt::Display for SentimentSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "score={} trend={} t={}", self.score, self.trend, self.timestamp)
    }
}

/// Clamp any integer into the valid score range.
pub fn clamp_score(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

/// Accept any JSON number as a score and clamp it, so stored or posted
/// values outside `[0, 100]` never reach the strategy.
fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_score(raw.round() as i64))
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// `+1.0` for long, `-1.0` for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// The single open position tracked by a trading session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    pub entry_price: f64,
    /// Epoch milliseconds at which the position was opened.
    pub entry_time: i64,
}

impl Position {
    /// Signed fractional return at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price * self.direction.sign()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:.2}", self.direction, self.entry_price)
    }
}

// ---------------------------------------------------------------------------
// Strategy configuration
// ---------------------------------------------------------------------------

/// Minimum timer period for a trading session.
pub const MIN_TICK_INTERVAL_MS: u64 = 50;

/// Trade with (`Follow`) or against (`Inverse`) crowd sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyMode {
    #[default]
    Follow,
    Inverse,
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyMode::Follow => write!(f, "follow"),
            StrategyMode::Inverse => write!(f, "inverse"),
        }
    }
}

impl std::str::FromStr for StrategyMode {
    type Err = XenithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "follow" | "follow-crowd" => Ok(StrategyMode::Follow),
            "inverse" | "inverse-crowd" | "contrarian" => Ok(StrategyMode::Inverse),
            other => Err(XenithError::InvalidInput(format!("unknown strategy mode: {other}"))),
        }
    }
}

/// Strategy settings for one trading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub mode: StrategyMode,
    pub tick_interval_ms: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            mode: StrategyMode::Follow,
            tick_interval_ms: 300,
        }
    }
}

impl StrategyConfig {
    /// Timer period actually used, never below [`MIN_TICK_INTERVAL_MS`].
    pub fn effective_tick_ms(&self) -> u64 {
        self.tick_interval_ms.max(MIN_TICK_INTERVAL_MS)
    }
}

// ---------------------------------------------------------------------------
// On-chain views
// ---------------------------------------------------------------------------

/// Trading signal published by the on-chain module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    Sell,
    Hold,
    Buy,
}

impl SignalKind {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(SignalKind::Sell),
            1 => Some(SignalKind::Hold),
            2 => Some(SignalKind::Buy),
            _ => None,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Sell => write!(f, "SELL"),
            SignalKind::Hold => write!(f, "HOLD"),
            SignalKind::Buy => write!(f, "BUY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub kind: SignalKind,
    pub confidence: u64,
    pub generated_at: u64,
}

/// Current sentiment as reported by the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSentiment {
    pub score: u8,
    pub trend: Trend,
    pub last_update: u64,
}

/// A user's on-chain bet position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    pub amount: u64,
    /// `0 = down`, `1 = up`.
    pub direction: u8,
    pub entry_sentiment: u8,
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Bet records
// ---------------------------------------------------------------------------

/// Predicted sentiment move for a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BetDirection {
    Down,
    Up,
}

impl TryFrom<u8> for BetDirection {
    type Error = XenithError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(BetDirection::Down),
            1 => Ok(BetDirection::Up),
            other => Err(XenithError::InvalidInput(format!("unknown bet direction {other}"))),
        }
    }
}

impl From<BetDirection> for u8 {
    fn from(d: BetDirection) -> u8 {
        match d {
            BetDirection::Down => 0,
            BetDirection::Up => 1,
        }
    }
}

impl fmt::Display for BetDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetDirection::Down => write!(f, "DOWN"),
            BetDirection::Up => write!(f, "UP"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Active,
    Resolved,
}

/// A bet placed through the wallet, as persisted in the bet store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRecord {
    pub id: String,
    pub address: String,
    pub direction: BetDirection,
    /// Stake in octas, as a decimal string.
    pub amount_octas: String,
    pub entry_sentiment: u8,
    pub created_at: i64,
    pub tx_hash: String,
    pub status: BetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub won: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_octas: Option<String>,
}

impl fmt::Display for BetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} octas (entry {}) {:?}",
            self.address, self.direction, self.amount_octas, self.entry_sentiment, self.status,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for XENITH.
#[derive(Debug, thiserror::Error)]
pub enum XenithError {
    #[error("Sentiment feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No wallet found")]
    NoWallet,

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Rate limited by node: {0}")]
    RateLimited(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
