//! Strategy engine: sentiment-driven single-position decision rule.
//!
//! Given the latest sentiment score and price, decide whether to open,
//! hold, or close the one tracked position. Pure and I/O free; the session
//! controller owns the state and applies the returned [`Decision`].

pub mod signal;

use serde::Serialize;
use std::fmt;

use crate::types::{Direction, Position, StrategyMode};

/// Scores at or above this lean long under `Follow`.
pub const LONG_THRESHOLD: u8 = 55;
/// Scores at or below this lean short under `Follow`.
pub const SHORT_THRESHOLD: u8 = 45;
/// Absolute return that forces an exit (take-profit and stop-loss alike).
pub const EXIT_MAGNITUDE: f64 = 0.02;

// ---------------------------------------------------------------------------
// Bias
// ---------------------------------------------------------------------------

/// Which direction the strategy currently favours for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bias {
    pub want_long: bool,
    pub want_short: bool,
}

impl Bias {
    pub fn from_score(score: u8, mode: StrategyMode) -> Self {
        let greedy = score >= LONG_THRESHOLD;
        let fearful = score <= SHORT_THRESHOLD;
        match mode {
            StrategyMode::Follow => Self { want_long: greedy, want_short: fearful },
            StrategyMode::Inverse => Self { want_long: fearful, want_short: greedy },
        }
    }

    /// The favoured direction, if any. Long wins ties (cannot happen with
    /// the thresholds above, but the open rule is written that way).
    pub fn favoured(&self) -> Option<Direction> {
        if self.want_long {
            Some(Direction::Long)
        } else if self.want_short {
            Some(Direction::Short)
        } else {
            None
        }
    }

    /// True when the favoured direction opposes `held`.
    pub fn reverses(&self, held: Direction) -> bool {
        match held {
            Direction::Long => self.want_short,
            Direction::Short => self.want_long,
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// `|pnl|` reached [`EXIT_MAGNITUDE`].
    Threshold,
    /// Sentiment now favours the opposite direction.
    Reversal,
}

/// Outcome of one strategy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// No position and no signal.
    Flat,
    Open {
        direction: Direction,
        price: f64,
        score: u8,
    },
    Hold {
        pnl: f64,
    },
    Close {
        direction: Direction,
        price: f64,
        /// Signed fractional return of the position.
        pnl: f64,
        /// `equity * pnl`, the amount added to equity.
        gain: f64,
        reason: ExitReason,
    },
}

impl Decision {
    /// Human-readable log line for decisions that change state.
    pub fn log_line(&self) -> Option<String> {
        match self {
            Decision::Open { direction, price, score } => {
                Some(format!("Open {direction} at {price:.2} (score {score})"))
            }
            Decision::Close { direction, price, gain, .. } => {
                Some(format!("Close {direction} at {price:.2} | PnL {gain:.2}"))
            }
            Decision::Flat | Decision::Hold { .. } => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Flat => write!(f, "flat"),
            Decision::Hold { pnl } => write!(f, "hold (pnl {:.2}%)", pnl * 100.0),
            other => write!(f, "{}", other.log_line().unwrap_or_default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless single-position decision rule.
pub struct StrategyEngine;

impl StrategyEngine {
    /// Evaluate one step.
    ///
    /// `price` must be strictly positive and `position.entry_price` likewise;
    /// both are guaranteed by the price feed.
    pub fn decide(
        score: u8,
        price: f64,
        position: Option<&Position>,
        mode: StrategyMode,
        equity: f64,
    ) -> Decision {
        let bias = Bias::from_score(score, mode);

        let Some(pos) = position else {
            return match bias.favoured() {
                Some(direction) => Decision::Open { direction, price, score },
                None => Decision::Flat,
            };
        };

        let pnl = pos.pnl_at(price);
        let reason = if pnl.abs() >= EXIT_MAGNITUDE {
            Some(ExitReason::Threshold)
        } else if bias.reverses(pos.direction) {
            Some(ExitReason::Reversal)
        } else {
            None
        };

        match reason {
            Some(reason) => Decision::Close {
                direction: pos.direction,
                price,
                pnl,
                gain: equity * pnl,
                reason,
            },
            None => Decision::Hold { pnl },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn long_at(entry: f64) -> Position {
        Position { direction: Direction::Long, entry_price: entry, entry_time: 0 }
    }

    fn short_at(entry: f64) -> Position {
        Position { direction: Direction::Short, entry_price: entry, entry_time: 0 }
    }

    #[test]
    fn test_bias_never_both() {
        for mode in [StrategyMode::Follow, StrategyMode::Inverse] {
            for score in 0..=100u8 {
                let b = Bias::from_score(score, mode);
                assert!(!(b.want_long && b.want_short), "score {score} mode {mode}");
            }
        }
    }

    #[test]
    fn test_bias_thresholds_inclusive() {
        let f = |s| Bias::from_score(s, StrategyMode::Follow);
        assert!(f(55).want_long);
        assert!(!f(54).want_long && !f(54).want_short);
        assert!(f(45).want_short);
        assert!(!f(46).want_long && !f(46).want_short);

        let i = |s| Bias::from_score(s, StrategyMode::Inverse);
        assert!(i(45).want_long);
        assert!(i(55).want_short);
        assert_eq!(i(50).favoured(), None);
    }

    #[test]
    fn test_open_long_follow() {
        let d = StrategyEngine::decide(60, 100.0, None, StrategyMode::Follow, 1000.0);
        assert_eq!(d, Decision::Open { direction: Direction::Long, price: 100.0, score: 60 });
        assert_eq!(d.log_line().unwrap(), "Open LONG at 100.00 (score 60)");
    }

    #[test]
    fn test_open_short_inverse() {
        let d = StrategyEngine::decide(80, 99.5, None, StrategyMode::Inverse, 1000.0);
        assert_eq!(d, Decision::Open { direction: Direction::Short, price: 99.5, score: 80 });
        assert_eq!(d.log_line().unwrap(), "Open SHORT at 99.50 (score 80)");
    }

    #[test]
    fn test_flat_in_neutral_band() {
        for score in 46..=54u8 {
            assert_eq!(
                StrategyEngine::decide(score, 100.0, None, StrategyMode::Follow, 1000.0),
                Decision::Flat
            );
        }
        assert!(Decision::Flat.log_line().is_none());
    }

    #[test]
    fn test_take_profit_at_two_percent() {
        let pos = long_at(100.0);
        let d = StrategyEngine::decide(60, 102.0, Some(&pos), StrategyMode::Follow, 1000.0);
        match d {
            Decision::Close { pnl, gain, reason, .. } => {
                assert!((pnl - 0.02).abs() < 1e-12);
                assert!((gain - 20.0).abs() < 1e-9);
                assert_eq!(reason, ExitReason::Threshold);
            }
            other => panic!("expected close, got {other:?}"),
        }
        assert_eq!(d.log_line().unwrap(), "Close LONG at 102.00 | PnL 20.00");
    }

    #[test]
    fn test_short_stop_loss() {
        let pos = short_at(100.0);
        let d = StrategyEngine::decide(40, 103.0, Some(&pos), StrategyMode::Follow, 1000.0);
        match d {
            Decision::Close { pnl, gain, direction, .. } => {
                assert_eq!(direction, Direction::Short);
                assert!((pnl + 0.03).abs() < 1e-12);
                assert!((gain + 30.0).abs() < 1e-9);
            }
            other => panic!("expected close, got {other:?}"),
        }
    }

    #[test]
    fn test_hold_below_threshold() {
        let pos = long_at(100.0);
        let d = StrategyEngine::decide(60, 101.96, Some(&pos), StrategyMode::Follow, 1000.0);
        assert!(matches!(d, Decision::Hold { pnl } if (pnl - 0.0196).abs() < 1e-9));
    }

    #[test]
    fn test_reversal_exit_follow() {
        let pos = long_at(100.0);
        let d = StrategyEngine::decide(40, 101.0, Some(&pos), StrategyMode::Follow, 1000.0);
        assert!(matches!(d, Decision::Close { reason: ExitReason::Reversal, .. }));
    }

    #[test]
    fn test_reversal_exit_inverse() {
        // Inverse: high score favours short, so a held long reverses.
        let pos = long_at(100.0);
        let d = StrategyEngine::decide(70, 100.5, Some(&pos), StrategyMode::Inverse, 1000.0);
        assert!(matches!(d, Decision::Close { reason: ExitReason::Reversal, .. }));

        // Low score favours long under inverse, so a held long is kept.
        let d = StrategyEngine::decide(30, 100.5, Some(&pos), StrategyMode::Inverse, 1000.0);
        assert!(matches!(d, Decision::Hold { .. }));

        let short = short_at(100.0);
        let d = StrategyEngine::decide(30, 100.5, Some(&short), StrategyMode::Inverse, 1000.0);
        assert!(matches!(d, Decision::Close { reason: ExitReason::Reversal, .. }));
    }

    #[test]
    fn test_neutral_score_holds() {
        let pos = short_at(100.0);
        let d = StrategyEngine::decide(50, 100.0, Some(&pos), StrategyMode::Follow, 1000.0);
        assert_eq!(d, Decision::Hold { pnl: 0.0 });
    }

    #[test]
    fn test_decision_serializes_tagged() {
        let d = Decision::Open { direction: Direction::Long, price: 1.0, score: 55 };
        let json = serde_json::to_value(d).unwrap();
        assert_eq!(json["action"], "open");
        assert_eq!(json["direction"], "long");
    }
}
