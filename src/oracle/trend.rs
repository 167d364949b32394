//! Trend detection over recent oracle scores.
//!
//! The score history survives restarts as a plain JSON array of scores
//! (oldest first) in [`TREND_FILE`].

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::Path;

use crate::types::{clamp_score, Trend};

/// Scores retained for trend detection.
pub const TREND_HISTORY: usize = 20;
/// Trend history file inside the data directory.
pub const TREND_FILE: &str = "sentiment_history.json";
const MIN_SAMPLES: usize = 6;
const WINDOW: usize = 3;
/// Mean shift (in score points) that counts as a move.
const THRESHOLD: f64 = 5.0;

/// Compares the mean of the last three scores with the three before them.
#[derive(Debug, Clone, Default)]
pub struct TrendTracker {
    scores: VecDeque<u8>,
}

impl TrendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from earlier scores (oldest first), keeping the newest
    /// [`TREND_HISTORY`].
    pub fn from_scores<I: IntoIterator<Item = u8>>(scores: I) -> Self {
        let mut t = Self::new();
        for s in scores {
            t.push(s);
        }
        t
    }

    fn push(&mut self, score: u8) {
        self.scores.push_back(score);
        while self.scores.len() > TREND_HISTORY {
            self.scores.pop_front();
        }
    }

    /// Record `score` and return the trend including it.
    pub fn record(&mut self, score: u8) -> Trend {
        self.push(score);
        self.current()
    }

    pub fn current(&self) -> Trend {
        let n = self.scores.len();
        if n < MIN_SAMPLES {
            return Trend::Stable;
        }
        let mean = |range: std::ops::Range<usize>| {
            range.map(|i| self.scores[i] as f64).sum::<f64>() / WINDOW as f64
        };
        let recent = mean(n - WINDOW..n);
        let older = mean(n - 2 * WINDOW..n - WINDOW);

        if recent > older + THRESHOLD {
            Trend::Up
        } else if recent < older - THRESHOLD {
            Trend::Down
        } else {
            Trend::Stable
        }
    }

    pub fn scores(&self) -> Vec<u8> {
        self.scores.iter().copied().collect()
    }

    /// Load a history written by [`save`](Self::save). A missing file
    /// yields an empty tracker.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read trend history {}", path.display()))?;
        let scores: Vec<i64> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse trend history {}", path.display()))?;
        Ok(Self::from_scores(scores.into_iter().map(clamp_score)))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(&self.scores()).context("Failed to serialise trend history")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write trend history {}", path.display()))
    }
}
