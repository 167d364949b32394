//! Trading session state and the per-tick step function.
//!
//! A `Session` owns everything one simulated bot run mutates: equity, the
//! open position, the decision log, the price cursor, and the sentiment
//! window. `step` is synchronous; scheduling lives in the controller.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::journal::LogBook;
use crate::feeds::price::PriceSeries;
use crate::feeds::window::SentimentWindow;
use crate::feeds::ScoreFeed;
use crate::strategy::{Decision, StrategyEngine};
use crate::types::{
    Position, SentimentSample, StrategyConfig, MIN_TICK_INTERVAL_MS,
};

/// Score assumed when no sentiment has ever been observed.
pub const NEUTRAL_SCORE: u8 = 50;

/// Sentiment samples retained by a bot session.
pub const SESSION_WINDOW: usize = 500;

/// Samples included in a snapshot (chart width).
const SNAPSHOT_SENTIMENT: usize = 200;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Result of a single step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: u64,
    /// Sample pulled from the feed this tick; `None` when the last known
    /// score was reused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<SentimentSample>,
    pub score: u8,
    pub price: f64,
    pub decision: Decision,
    pub equity: f64,
}

/// Serializable view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub running: bool,
    pub config: StrategyConfig,
    pub equity: f64,
    pub initial_equity: f64,
    pub peak_equity: f64,
    pub position: Option<Position>,
    pub steps: u64,
    pub trades_closed: u64,
    pub wins: u64,
    pub price_cursor: usize,
    pub log: Vec<String>,
    pub recent_sentiment: Vec<SentimentSample>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session {
    config: StrategyConfig,
    equity: f64,
    initial_equity: f64,
    peak_equity: f64,
    position: Option<Position>,
    log: LogBook,
    prices: PriceSeries,
    feed: Box<dyn ScoreFeed>,
    history: SentimentWindow,
    steps: u64,
    trades_closed: u64,
    wins: u64,
}

impl Session {
    pub fn new(
        config: StrategyConfig,
        initial_equity: f64,
        prices: PriceSeries,
        feed: Box<dyn ScoreFeed>,
    ) -> Self {
        Self {
            config: clamp_config(config),
            equity: initial_equity,
            initial_equity,
            peak_equity: initial_equity,
            position: None,
            log: LogBook::default(),
            prices,
            feed,
            history: SentimentWindow::new(SESSION_WINDOW),
            steps: 0,
            trades_closed: 0,
            wins: 0,
        }
    }

    /// Pre-fill the sentiment window (e.g. from the store or a synthetic seed).
    pub fn with_history<I: IntoIterator<Item = SentimentSample>>(mut self, samples: I) -> Self {
        self.history.extend(samples);
        self
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self, now_ms: i64) -> StepOutcome {
        let sample = self.feed.next_sample(now_ms, self.history.last());
        let score = match sample {
            Some(sample) => {
                self.history.push(sample);
                sample.score
            }
            None => self.history.last().map(|s| s.score).unwrap_or(NEUTRAL_SCORE),
        };
        let price = self.prices.advance();

        let decision = StrategyEngine::decide(
            score,
            price,
            self.position.as_ref(),
            self.config.mode,
            self.equity,
        );
        self.apply(&decision, now_ms);
        self.steps += 1;

        debug!(step = self.steps, score, price = format!("{price:.2}"), decision = %decision, "Step");

        StepOutcome {
            step: self.steps,
            sample,
            score,
            price,
            decision,
            equity: self.equity,
        }
    }

    fn apply(&mut self, decision: &Decision, now_ms: i64) {
        match *decision {
            Decision::Open { direction, price, score } => {
                self.position = Some(Position { direction, entry_price: price, entry_time: now_ms });
                info!(%direction, price = format!("{price:.2}"), score, "Position opened");
            }
            Decision::Close { direction, gain, pnl, reason, .. } => {
                self.equity += gain;
                self.position = None;
                self.trades_closed += 1;
                if gain > 0.0 {
                    self.wins += 1;
                }
                if self.equity > self.peak_equity {
                    self.peak_equity = self.equity;
                }
                info!(
                    %direction,
                    pnl = format!("{:.2}%", pnl * 100.0),
                    gain = format!("{gain:.2}"),
                    ?reason,
                    equity = format!("{:.2}", self.equity),
                    "Position closed"
                );
            }
            Decision::Flat | Decision::Hold { .. } => {}
        }
        if let Some(line) = decision.log_line() {
            self.log.push(line);
        }
    }

    /// Swap the strategy configuration. Position and equity are untouched.
    /// Returns the configuration actually applied.
    pub fn reconfigure(&mut self, config: StrategyConfig) -> StrategyConfig {
        self.config = clamp_config(config);
        info!(mode = %self.config.mode, tick_ms = self.config.tick_interval_ms, "Strategy reconfigured");
        self.config
    }

    pub fn snapshot(&self, running: bool) -> SessionSnapshot {
        SessionSnapshot {
            running,
            config: self.config,
            equity: self.equity,
            initial_equity: self.initial_equity,
            peak_equity: self.peak_equity,
            position: self.position,
            steps: self.steps,
            trades_closed: self.trades_closed,
            wins: self.wins,
            price_cursor: self.prices.cursor(),
            log: self.log.lines(),
            recent_sentiment: self.history.recent(SNAPSHOT_SENTIMENT),
        }
    }

    pub fn config(&self) -> StrategyConfig {
        self.config
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn log(&self) -> &LogBook {
        &self.log
    }

    pub fn history(&self) -> &SentimentWindow {
        &self.history
    }

    pub fn price_cursor(&self) -> usize {
        self.prices.cursor()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn trades_closed(&self) -> u64 {
        self.trades_closed
    }

    pub fn wins(&self) -> u64 {
        self.wins
    }

    /// Fractional drawdown of equity from its peak.
    pub fn drawdown(&self) -> f64 {
        if self.peak_equity <= 0.0 {
            0.0
        } else {
            1.0 - self.equity / self.peak_equity
        }
    }
}

fn clamp_config(config: StrategyConfig) -> StrategyConfig {
    if config.tick_interval_ms < MIN_TICK_INTERVAL_MS {
        warn!(
            requested = config.tick_interval_ms,
            applied = MIN_TICK_INTERVAL_MS,
            "Tick interval below minimum, clamping"
        );
    }
    StrategyConfig {
        mode: config.mode,
        tick_interval_ms: config.effective_tick_ms(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
