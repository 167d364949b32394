//! Offline backtesting of the sentiment strategy.
//!
//! Replays a score sequence and a price sequence through a fresh
//! [`Session`] and evaluates the result: final equity, win rate, max
//! drawdown, and Sharpe ratio of per-trade returns.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use crate::engine::Session;
use crate::feeds::price::{generate_price_path, PriceSeries};
use crate::feeds::synthetic::SyntheticSentiment;
use crate::feeds::{ScoreFeed, ScriptedScores};
use crate::strategy::{Decision, ExitReason};
use crate::types::{Direction, Position, StrategyConfig, XenithError};

// ---------------------------------------------------------------------------
// Backtest results
// ---------------------------------------------------------------------------

/// Complete backtest performance report.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub return_pct: f64,
    pub steps: u64,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
    pub peak_equity: f64,
    /// Position still open when the replay ended (not force-closed).
    pub open_position: Option<Position>,
    /// Equity after each closed trade, starting with the initial equity.
    pub equity_curve: Vec<f64>,
    pub trade_log: Vec<BacktestTrade>,
}

/// Individual closed trade.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestTrade {
    pub step: u64,
    pub direction: Direction,
    pub exit_price: f64,
    pub pnl: f64,
    pub gain: f64,
    pub reason: ExitReason,
    pub equity_after: f64,
}

// ---------------------------------------------------------------------------
// Backtester
// ---------------------------------------------------------------------------

pub struct Backtester {
    config: StrategyConfig,
    initial_equity: f64,
}

impl Backtester {
    pub fn new(config: StrategyConfig, initial_equity: f64) -> Self {
        Self { config, initial_equity }
    }

    /// Replay recorded scores against recorded prices, `min(len)` steps.
    pub fn run(&self, scores: &[u8], prices: &[f64]) -> Result<BacktestReport, XenithError> {
        let steps = scores.len().min(prices.len());
        let series = PriceSeries::new(prices[..steps].to_vec())?;
        let feed = ScriptedScores::new(scores[..steps].to_vec());
        Ok(self.replay(series, Box::new(feed), steps))
    }

    /// Run `steps` ticks of the synthetic feeds, seeded for reproducibility.
    pub fn run_synthetic(
        &self,
        steps: usize,
        start_price: f64,
        volatility: f64,
        seed: u64,
    ) -> Result<BacktestReport, XenithError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let prices = generate_price_path(steps, start_price, volatility, &mut rng);
        let series = PriceSeries::new(prices)?;
        let feed = SyntheticSentiment::live(Some(seed.wrapping_add(1)));
        Ok(self.replay(series, Box::new(feed), steps))
    }

    fn replay(&self, prices: PriceSeries, feed: Box<dyn ScoreFeed>, steps: usize) -> BacktestReport {
        let mut session = Session::new(self.config, self.initial_equity, prices, feed);
        let mut trade_log = Vec::new();
        let mut equity_curve = vec![self.initial_equity];
        let mut returns: Vec<f64> = Vec::new();
        let mut peak = self.initial_equity;
        let mut max_dd = 0.0_f64;

        for i in 0..steps {
            let outcome = session.step(i as i64);
            let Decision::Close { direction, price, pnl, gain, reason } = outcome.decision else {
                continue;
            };

            returns.push(pnl);
            equity_curve.push(outcome.equity);
            if outcome.equity > peak {
                peak = outcome.equity;
            }
            if peak > 0.0 {
                max_dd = max_dd.max(1.0 - outcome.equity / peak);
            }

            trade_log.push(BacktestTrade {
                step: outcome.step,
                direction,
                exit_price: price,
                pnl,
                gain,
                reason,
                equity_after: outcome.equity,
            });
        }

        let total_trades = trade_log.len();
        let wins = trade_log.iter().filter(|t| t.gain > 0.0).count();
        let final_equity = session.equity();
        let return_pct = if self.initial_equity > 0.0 {
            (final_equity - self.initial_equity) / self.initial_equity * 100.0
        } else {
            0.0
        };

        let report = BacktestReport {
            initial_equity: self.initial_equity,
            final_equity,
            return_pct,
            steps: session.steps(),
            total_trades,
            wins,
            losses: total_trades - wins,
            win_rate: if total_trades > 0 { wins as f64 / total_trades as f64 } else { 0.0 },
            sharpe_ratio: compute_sharpe(&returns),
            max_drawdown_pct: max_dd * 100.0,
            peak_equity: peak,
            open_position: session.position().copied(),
            equity_curve,
            trade_log,
        };

        info!(
            mode = %self.config.mode,
            steps = report.steps,
            trades = report.total_trades,
            final_equity = format!("{:.2}", report.final_equity),
            return_pct = format!("{:.2}%", report.return_pct),
            "Backtest complete"
        );

        report
    }
}

/// Sharpe ratio of a series of per-trade returns (not annualized; trades
/// have no fixed holding period).
fn compute_sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    if std_dev < 1e-10 {
        return 0.0;
    }

    mean / std_dev
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
