//! Synthetic sentiment generator.
//!
//! Produces a sine-wave sentiment score with uniform noise, clamped to
//! `[0, 100]`. Used when no live source is configured and to seed empty
//! histories.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use super::ScoreFeed;
use crate::types::{clamp_score, SentimentSample, Trend};

/// Shape of a synthetic sentiment wave.
#[derive(Debug, Clone, Copy)]
pub struct Wave {
    /// Samples per full pattern repeat.
    pub period: u64,
    /// Phase span over one period, in multiples of π.
    pub half_turns: f64,
    pub amplitude: f64,
    /// Total noise width; noise is uniform in `[-noise/2, noise/2)`.
    pub noise: f64,
}

/// Live bot feed.
pub const LIVE_WAVE: Wave = Wave { period: 240, half_turns: 4.0, amplitude: 12.0, noise: 5.0 };
/// Seed history for the bot view.
pub const BOT_SEED_WAVE: Wave = Wave { period: 180, half_turns: 6.0, amplitude: 10.0, noise: 4.0 };
/// Seed history for the dashboard / empty store.
pub const DASHBOARD_SEED_WAVE: Wave = Wave { period: 120, half_turns: 4.0, amplitude: 12.0, noise: 6.0 };

impl Wave {
    pub fn score_at<R: Rng>(&self, i: u64, rng: &mut R) -> u8 {
        let phase = (i % self.period) as f64 / self.period as f64 * PI * self.half_turns;
        let base = 50.0 + phase.sin() * self.amplitude;
        let noise = (rng.gen::<f64>() - 0.5) * self.noise;
        clamp_score((base + noise).round() as i64)
    }
}

/// Generate `wave.period` samples spaced `spacing_ms` apart, the last one
/// `spacing_ms` before `now_ms`.
pub fn synthesize_history<R: Rng>(
    wave: &Wave,
    spacing_ms: i64,
    now_ms: i64,
    rng: &mut R,
) -> Vec<SentimentSample> {
    let total = wave.period;
    let mut out: Vec<SentimentSample> = Vec::with_capacity(total as usize);
    for i in 0..total {
        let score = wave.score_at(i, rng);
        let prev = out.last().map(|s| s.score).unwrap_or(score);
        let t = now_ms - (total - i) as i64 * spacing_ms;
        out.push(SentimentSample::new(t, score as i64, Trend::between(prev, score)));
    }
    out
}

/// Endless synthetic score feed.
pub struct SyntheticSentiment {
    wave: Wave,
    idx: u64,
    rng: StdRng,
}

impl SyntheticSentiment {
    pub fn new(wave: Wave, rng: StdRng) -> Self {
        Self { wave, idx: 0, rng }
    }

    /// Seeded feed using [`LIVE_WAVE`]; `None` seeds from entropy.
    pub fn live(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self::new(LIVE_WAVE, rng)
    }

    /// Next raw score, advancing the wave position.
    pub fn next_score(&mut self) -> u8 {
        let i = self.idx;
        self.idx += 1;
        self.wave.score_at(i, &mut self.rng)
    }
}

impl ScoreFeed for SyntheticSentiment {
    fn next_sample(&mut self, now_ms: i64, last: Option<&SentimentSample>) -> Option<SentimentSample> {
        let score = self.next_score();
        let prev = last.map(|s| s.score).unwrap_or(score);
        Some(SentimentSample::new(now_ms, score as i64, Trend::between(prev, score)))
    }
}
