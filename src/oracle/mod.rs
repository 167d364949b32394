//! Sentiment oracle.
//!
//! One analysis cycle pulls social posts and market moves, scores them,
//! tracks the trend, and blends in the Fear & Greed index. Publishing the
//! result on-chain needs a signing wallet and is left to the caller.

pub mod scorer;
pub mod sources;
pub mod trend;

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::feeds::{SentimentReading, SentimentSource};
use crate::types::{now_ms, SentimentSample, Trend, XenithError};
use scorer::{blend, weighted_score};
use sources::OracleInputs;
use trend::TrendTracker;

/// Upper bound on the reported item volume.
pub const MAX_VOLUME: u64 = 500;

/// Result of one analysis cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OracleReport {
    pub social: u8,
    pub fear_greed: u8,
    pub blended: u8,
    pub trend: Trend,
    pub volume: u64,
    pub generated_at: i64,
}

impl OracleReport {
    pub fn sample(&self) -> SentimentSample {
        SentimentSample::new(self.generated_at, self.blended as i64, self.trend)
    }
}

pub struct SentimentOracle {
    inputs: Box<dyn OracleInputs>,
    trend: TrendTracker,
    history_path: Option<PathBuf>,
}

impl SentimentOracle {
    pub fn new(inputs: Box<dyn OracleInputs>) -> Self {
        Self {
            inputs,
            trend: TrendTracker::new(),
            history_path: None,
        }
    }

    /// Resume the trend history from `path` and rewrite it after every
    /// cycle. An unreadable file is logged and the history starts empty.
    pub fn with_history_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match TrendTracker::load(&path) {
            Ok(trend) => {
                info!(path = %path.display(), scores = trend.scores().len(), "Trend history loaded");
                self.trend = trend;
            }
            Err(e) => warn!(error = format!("{e:#}"), "Starting with empty trend history"),
        }
        self.history_path = Some(path);
        self
    }

    pub fn with_trend(mut self, trend: TrendTracker) -> Self {
        self.trend = trend;
        self
    }

    /// Run one cycle. `None` when no source returned any item.
    pub async fn run_cycle(&mut self) -> Option<OracleReport> {
        let (mut items, market) = futures::join!(self.inputs.social_posts(), self.inputs.market_items());
        items.extend(market);
        if items.is_empty() {
            warn!("No oracle data fetched, skipping cycle");
            return None;
        }

        let social = weighted_score(&items);
        let volume = (items.len() as u64).min(MAX_VOLUME);
        let trend = self.trend.record(social);
        if let Some(path) = &self.history_path {
            if let Err(e) = self.trend.save(path).await {
                warn!(error = format!("{e:#}"), "Failed to save trend history");
            }
        }
        let fear_greed = self.inputs.fear_greed().await;
        let blended = blend(social, fear_greed);

        info!(social, fear_greed, blended, volume, %trend, "Oracle cycle complete");

        Some(OracleReport {
            social,
            fear_greed,
            blended,
            trend,
            volume,
            generated_at: now_ms(),
        })
    }

    pub fn trend(&self) -> &TrendTracker {
        &self.trend
    }
}

/// [`SentimentSource`] that runs a full oracle cycle per poll.
pub struct OracleSentimentSource {
    oracle: Mutex<SentimentOracle>,
}

impl OracleSentimentSource {
    pub fn new(oracle: SentimentOracle) -> Self {
        Self { oracle: Mutex::new(oracle) }
    }
}

#[async_trait]
impl SentimentSource for OracleSentimentSource {
    async fn latest(&self) -> anyhow::Result<SentimentReading> {
        let report = self
            .oracle
            .lock()
            .await
            .run_cycle()
            .await
            .ok_or_else(|| XenithError::FeedUnavailable("oracle fetched no data".into()))?;
        Ok(SentimentReading { score: report.blended, trend: report.trend })
    }

    fn name(&self) -> &str {
        "oracle"
    }
}
