//! Persistence layer.
//!
//! Bet records and sentiment samples live in two JSON files
//! (`bets.json` → `{"bets": [...]}`, `sentiment.json` → `{"history": [...]}`)
//! that are read and rewritten wholesale on every operation. Records are
//! kept as raw JSON objects so that upserts can merge arbitrary fields.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::feeds::SampleSink;
use crate::types::{BetRecord, SentimentSample, XenithError};

pub const BETS_FILE: &str = "bets.json";
pub const SENTIMENT_FILE: &str = "sentiment.json";

/// Samples returned (and retained) on read.
pub const SENTIMENT_READ_CAP: usize = 500;
/// Samples retained on write.
pub const SENTIMENT_WRITE_CAP: usize = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BetsDocument {
    #[serde(default)]
    pub bets: Vec<Value>,
}

impl BetsDocument {
    /// Records that parse as [`BetRecord`]; malformed entries are skipped.
    pub fn records(&self) -> Vec<BetRecord> {
        self.bets
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentDocument {
    #[serde(default)]
    pub history: Vec<Value>,
}

impl SentimentDocument {
    /// Samples that parse as [`SentimentSample`]; malformed entries are skipped.
    pub fn samples(&self) -> Vec<SentimentSample> {
        self.history
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect()
    }
}

/// Per-address bet totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub address: String,
    pub total_bets: u64,
    pub total_volume_octas: u64,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// File-backed bet and sentiment store.
#[derive(Debug, Clone)]
pub struct JsonStore {
    bets_path: PathBuf,
    sentiment_path: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            bets_path: dir.join(BETS_FILE),
            sentiment_path: dir.join(SENTIMENT_FILE),
        }
    }

    /// Create either file with an empty document if it doesn't exist.
    pub fn ensure_files(&self) -> Result<()> {
        if !self.bets_path.exists() {
            write_json(&self.bets_path, &BetsDocument::default())?;
            info!(path = %self.bets_path.display(), "Created bet store");
        }
        if !self.sentiment_path.exists() {
            write_json(&self.sentiment_path, &SentimentDocument::default())?;
            info!(path = %self.sentiment_path.display(), "Created sentiment store");
        }
        Ok(())
    }

    // -- Bets ------------------------------------------------------------

    pub fn read_bets(&self) -> Result<BetsDocument> {
        self.ensure_files()?;
        Ok(read_or_default(&self.bets_path))
    }

    /// Insert a bet, or shallow-merge its fields into the record with the
    /// same `id`. The body must be an object with a non-empty string `id`.
    pub fn upsert_bet(&self, bet: Value) -> Result<()> {
        let Value::Object(fields) = bet else {
            return Err(XenithError::InvalidInput("missing id".into()).into());
        };
        let id = match fields.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => return Err(XenithError::InvalidInput("missing id".into()).into()),
        };

        let mut doc = self.read_bets()?;
        let existing = doc
            .bets
            .iter_mut()
            .find(|b| b.get("id").and_then(Value::as_str) == Some(id.as_str()));

        match existing {
            Some(Value::Object(current)) => {
                merge_fields(current, fields);
                debug!(id, "Bet updated");
            }
            Some(other) => {
                *other = Value::Object(fields);
                debug!(id, "Bet replaced");
            }
            None => {
                doc.bets.push(Value::Object(fields));
                debug!(id, "Bet inserted");
            }
        }

        write_json(&self.bets_path, &doc)
    }

    /// Typed convenience over [`upsert_bet`](Self::upsert_bet).
    pub fn save_bet(&self, bet: &BetRecord) -> Result<()> {
        let value = serde_json::to_value(bet).context("Failed to serialise bet record")?;
        self.upsert_bet(value)
    }

    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        Ok(leaderboard(&self.read_bets()?.bets))
    }

    // -- Sentiment -------------------------------------------------------

    /// Read the sentiment history, truncating it on disk to the most
    /// recent [`SENTIMENT_READ_CAP`] samples.
    pub fn read_sentiment(&self) -> Result<SentimentDocument> {
        self.ensure_files()?;
        let mut doc: SentimentDocument = read_or_default(&self.sentiment_path);
        if doc.history.len() > SENTIMENT_READ_CAP {
            let excess = doc.history.len() - SENTIMENT_READ_CAP;
            doc.history.drain(..excess);
            write_json(&self.sentiment_path, &doc)?;
            debug!(dropped = excess, "Sentiment history truncated on read");
        }
        Ok(doc)
    }

    /// Append `{t, score, trend}` from `sample`; `t` must be a number.
    pub fn append_sentiment(&self, sample: Value) -> Result<()> {
        let t = sample.get("t").filter(|t| t.is_number()).cloned();
        let Some(t) = t else {
            return Err(XenithError::InvalidInput("invalid sample".into()).into());
        };

        let mut entry = Map::new();
        entry.insert("t".into(), t);
        entry.insert("score".into(), sample.get("score").cloned().unwrap_or(Value::Null));
        entry.insert("trend".into(), sample.get("trend").cloned().unwrap_or(Value::Null));

        self.ensure_files()?;
        let mut doc: SentimentDocument = read_or_default(&self.sentiment_path);
        doc.history.push(Value::Object(entry));
        if doc.history.len() > SENTIMENT_WRITE_CAP {
            let excess = doc.history.len() - SENTIMENT_WRITE_CAP;
            doc.history.drain(..excess);
        }
        write_json(&self.sentiment_path, &doc)
    }

    /// Typed convenience over [`append_sentiment`](Self::append_sentiment).
    pub fn save_sample(&self, sample: &SentimentSample) -> Result<()> {
        let value = serde_json::to_value(sample).context("Failed to serialise sentiment sample")?;
        self.append_sentiment(value)
    }

    pub fn bets_path(&self) -> &Path {
        &self.bets_path
    }

    pub fn sentiment_path(&self) -> &Path {
        &self.sentiment_path
    }
}

// ---------------------------------------------------------------------------
// Shared async access
// ---------------------------------------------------------------------------

/// [`JsonStore`] for async callers.
///
/// Every operation reads and rewrites whole files, so calls are serialized
/// through one async lock, and the file I/O runs on the blocking pool.
/// Clones share the lock.
#[derive(Debug, Clone)]
pub struct SharedStore {
    store: JsonStore,
    lock: Arc<Mutex<()>>,
}

impl SharedStore {
    pub fn new(store: JsonStore) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run `op` against the store under the lock, off the async runtime.
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&JsonStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .context("Store task failed")?
    }

    pub async fn record_sample(&self, sample: &SentimentSample) -> Result<()> {
        let sample = *sample;
        self.run(move |s| s.save_sample(&sample)).await
    }

    pub async fn sentiment_history(&self) -> Result<Vec<SentimentSample>> {
        self.run(|s| Ok(s.read_sentiment()?.samples())).await
    }
}

#[async_trait]
impl SampleSink for SharedStore {
    async fn record(&self, sample: &SentimentSample) -> Result<()> {
        self.record_sample(sample).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn merge_fields(current: &mut Map<String, Value>, update: Map<String, Value>) {
    for (k, v) in update {
        current.insert(k, v);
    }
}

/// Parse a JSON file, treating a missing or corrupt file as empty.
fn read_or_default<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> T {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Store file unreadable, treating as empty");
            return T::default();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Store file corrupt, treating as empty");
        T::default()
    })
}

fn write_json<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(doc).context("Failed to serialise store document")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Aggregate bets per address, highest volume first.
pub fn leaderboard(bets: &[Value]) -> Vec<LeaderboardEntry> {
    let mut by_address: HashMap<String, LeaderboardEntry> = HashMap::new();
    for bet in bets {
        let Some(address) = bet.get("address").and_then(Value::as_str) else {
            continue;
        };
        let amount = match bet.get("amountOctas") {
            Some(Value::String(s)) => s.parse::<u64>().unwrap_or(0),
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            _ => 0,
        };
        let entry = by_address
            .entry(address.to_string())
            .or_insert_with(|| LeaderboardEntry {
                address: address.to_string(),
                total_bets: 0,
                total_volume_octas: 0,
            });
        entry.total_bets += 1;
        entry.total_volume_octas = entry.total_volume_octas.saturating_add(amount);
    }

    let mut rows: Vec<LeaderboardEntry> = by_address.into_values().collect();
    rows.sort_by(|a, b| {
        b.total_volume_octas
            .cmp(&a.total_volume_octas)
            .then_with(|| a.address.cmp(&b.address))
    });
    rows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
