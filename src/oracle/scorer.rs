//! Lexicon-based text polarity and score aggregation.
//!
//! Polarity is the mean of the matched word weights in a text, with a
//! preceding negator flipping and halving a word and a preceding
//! intensifier strengthening it. Result is in `[-1, 1]`.

use serde::{Deserialize, Serialize};

use crate::types::clamp_score;

/// Text shorter than this (in chars) carries no signal.
pub const MIN_TEXT_LEN: usize = 5;

/// Score returned when there is nothing to analyze.
pub const NEUTRAL: u8 = 50;

const SOCIAL_WEIGHT: f64 = 0.7;
const FEAR_GREED_WEIGHT: f64 = 0.3;

const LEXICON: &[(&str, f64)] = &[
    // positive
    ("bullish", 0.8),
    ("moon", 0.6),
    ("mooning", 0.7),
    ("pump", 0.4),
    ("pumping", 0.4),
    ("rally", 0.6),
    ("surge", 0.6),
    ("surges", 0.6),
    ("soar", 0.7),
    ("soars", 0.7),
    ("gain", 0.5),
    ("gains", 0.5),
    ("profit", 0.6),
    ("profits", 0.6),
    ("breakout", 0.5),
    ("ath", 0.6),
    ("adoption", 0.4),
    ("approval", 0.5),
    ("approved", 0.5),
    ("great", 0.8),
    ("good", 0.7),
    ("best", 1.0),
    ("love", 0.5),
    ("win", 0.8),
    ("winning", 0.5),
    ("strong", 0.43),
    ("happy", 0.8),
    ("excited", 0.4),
    ("optimistic", 0.6),
    ("positive", 0.23),
    ("up", 0.1),
    ("recovery", 0.4),
    ("hodl", 0.3),
    // negative
    ("bearish", -0.8),
    ("crash", -0.7),
    ("crashing", -0.7),
    ("dump", -0.5),
    ("dumping", -0.5),
    ("scam", -0.8),
    ("fraud", -0.8),
    ("rug", -0.7),
    ("rugpull", -0.9),
    ("hack", -0.6),
    ("hacked", -0.7),
    ("exploit", -0.6),
    ("fear", -0.6),
    ("panic", -0.7),
    ("selloff", -0.6),
    ("plunge", -0.7),
    ("plunges", -0.7),
    ("collapse", -0.7),
    ("drop", -0.3),
    ("drops", -0.3),
    ("down", -0.16),
    ("loss", -0.5),
    ("losses", -0.5),
    ("lose", -0.5),
    ("lost", -0.4),
    ("liquidated", -0.6),
    ("rekt", -0.7),
    ("bubble", -0.4),
    ("ban", -0.5),
    ("banned", -0.5),
    ("lawsuit", -0.4),
    ("bad", -0.7),
    ("worst", -1.0),
    ("terrible", -1.0),
    ("weak", -0.4),
    ("worried", -0.5),
    ("negative", -0.3),
];

const NEGATORS: &[&str] = &["not", "no", "never", "isn't", "wasn't", "don't", "doesn't", "can't", "won't", "aren't"];

const INTENSIFIERS: &[(&str, f64)] = &[("very", 1.3), ("extremely", 1.5), ("super", 1.3), ("really", 1.2), ("so", 1.1)];

/// A piece of text with an engagement weight (upvotes, market score, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredText {
    pub text: String,
    pub weight: i64,
}

impl ScoredText {
    pub fn new(text: impl Into<String>, weight: i64) -> Self {
        Self { text: text.into(), weight }
    }
}

fn word_polarity(word: &str) -> Option<f64> {
    LEXICON.iter().find(|(w, _)| *w == word).map(|(_, p)| *p)
}

/// Polarity of `text` in `[-1, 1]`; `0.0` when no lexicon word matches.
pub fn polarity(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .collect();

    let mut total = 0.0;
    let mut matched = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        let Some(mut p) = word_polarity(token) else {
            continue;
        };
        if i > 0 {
            let prev = tokens[i - 1];
            if let Some((_, factor)) = INTENSIFIERS.iter().find(|(w, _)| *w == prev) {
                p *= factor;
            }
            let negated = NEGATORS.contains(&prev) || (i > 1 && NEGATORS.contains(&tokens[i - 2]));
            if negated {
                p *= -0.5;
            }
        }
        total += p.clamp(-1.0, 1.0);
        matched += 1;
    }

    if matched == 0 {
        0.0
    } else {
        (total / matched as f64).clamp(-1.0, 1.0)
    }
}

/// Engagement-weighted polarity mapped onto `0..=100`.
///
/// Each text weighs `max(1, weight)`. Texts under [`MIN_TEXT_LEN`] chars
/// are skipped. No usable text gives [`NEUTRAL`].
pub fn weighted_score(items: &[ScoredText]) -> u8 {
    let mut total = 0.0;
    let mut total_weight = 0.0;
    for item in items {
        if item.text.chars().count() < MIN_TEXT_LEN {
            continue;
        }
        let w = item.weight.max(1) as f64;
        total += polarity(&item.text) * w;
        total_weight += w;
    }
    if total_weight == 0.0 {
        return NEUTRAL;
    }
    let avg = total / total_weight;
    clamp_score(((avg + 1.0) * 50.0) as i64)
}

/// Score of a market item from its 24h price change in percent.
pub fn market_item_score(change_24h_pct: f64) -> u8 {
    if !change_24h_pct.is_finite() {
        return NEUTRAL;
    }
    clamp_score((50.0 + change_24h_pct) as i64)
}

/// Blend social sentiment with the fear & greed index.
pub fn blend(social: u8, fear_greed: u8) -> u8 {
    clamp_score((social as f64 * SOCIAL_WEIGHT + fear_greed as f64 * FEAR_GREED_WEIGHT) as i64)
}
