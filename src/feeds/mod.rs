//! Sentiment and price feeds.
//!
//! Defines the `SentimentSource` trait (async, possibly remote) and the
//! `ScoreFeed` trait the session controller pulls from once per tick.
//! A `ScoreFeed` never blocks: remote sources are polled in the background
//! by [`LatestSentiment`] and the tick only reads the cached value.

pub mod price;
pub mod synthetic;
pub mod window;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::types::{SentimentSample, Trend};

/// A sentiment reading without a timestamp, as returned by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub score: u8,
    pub trend: Trend,
}

/// Abstraction over external sentiment providers (chain view function,
/// oracle pipeline, ...).
#[async_trait]
pub trait SentimentSource: Send + Sync {
    /// Fetch the latest sentiment reading.
    async fn latest(&self) -> Result<SentimentReading>;

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Destination for fresh samples pulled during a session, typically the
/// persisted sentiment history.
#[async_trait]
pub trait SampleSink: Send + Sync {
    async fn record(&self, sample: &SentimentSample) -> Result<()>;
}

/// Per-tick sentiment supplier used by the session controller.
pub trait ScoreFeed: Send {
    /// Produce the sample for this tick. `last` is the most recent sample
    /// the session has recorded. `None` means no fresh reading is available
    /// and the caller should reuse the last known score.
    fn next_sample(&mut self, now_ms: i64, last: Option<&SentimentSample>) -> Option<SentimentSample>;
}

// ---------------------------------------------------------------------------
// Cached remote source
// ---------------------------------------------------------------------------

/// Non-blocking view over a [`SentimentSource`].
///
/// A background task polls the source at its own cadence and publishes each
/// successful reading. Failures leave the previous reading in place.
pub struct LatestSentiment {
    rx: watch::Receiver<Option<SentimentReading>>,
    poller: JoinHandle<()>,
}

impl LatestSentiment {
    /// Spawn the poll task. Must be called inside a tokio runtime.
    pub fn spawn(source: Arc<dyn SentimentSource>, every: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        let poller = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match source.latest().await {
                    Ok(reading) => {
                        debug!(source = source.name(), score = reading.score, "Sentiment polled");
                        if tx.send(Some(reading)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(source = source.name(), error = %e, "Sentiment poll failed, keeping last value");
                    }
                }
            }
        });
        Self { rx, poller }
    }

    /// The most recent reading, if any poll has succeeded yet.
    pub fn current(&self) -> Option<SentimentReading> {
        *self.rx.borrow()
    }
}

impl Drop for LatestSentiment {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

impl ScoreFeed for LatestSentiment {
    fn next_sample(&mut self, now_ms: i64, _last: Option<&SentimentSample>) -> Option<SentimentSample> {
        self.current()
            .map(|r| SentimentSample::new(now_ms, r.score as i64, r.trend))
    }
}

/// A fixed, pre-recorded sequence of scores. Once exhausted it reports no
/// fresh reading, so the session keeps using the last score.
pub struct ScriptedScores {
    scores: Vec<u8>,
    idx: usize,
}

impl ScriptedScores {
    pub fn new(scores: Vec<u8>) -> Self {
        Self { scores, idx: 0 }
    }
}

impl ScoreFeed for ScriptedScores {
    fn next_sample(&mut self, now_ms: i64, last: Option<&SentimentSample>) -> Option<SentimentSample> {
        let score = *self.scores.get(self.idx)?;
        self.idx += 1;
        let prev = last.map(|s| s.score).unwrap_or(score);
        Some(SentimentSample::new(now_ms, score as i64, Trend::between(prev, score)))
    }
}
