//! Node REST client for the `emotion_signals` module.
//!
//! Read-only: view functions, account resources, and transaction status.
//! Writes go through a [`Wallet`](super::wallet::Wallet), which signs and
//! submits; this client only waits for the result.
//!
//! View functions return a JSON array. u64 values arrive as strings and
//! u8 values as numbers, so every numeric field accepts either.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::feeds::{SentimentReading, SentimentSource};
use crate::types::{
    ChainSentiment, SignalKind, TradingSignal, Trend, UserPosition, XenithError,
};

const APT_COIN_STORE: &str = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>";

pub struct ChainClient {
    http: Client,
    base_url: String,
    module_address: String,
    module_name: String,
    api_key: Option<Secret<String>>,
    poll_interval: Duration,
    max_polls: u32,
}

impl ChainClient {
    pub fn new(config: &ChainConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent("XENITH/0.1.0")
            .build()
            .context("Failed to build HTTP client for chain node")?;

        Ok(Self {
            http,
            base_url: config.node_url.trim_end_matches('/').to_string(),
            module_address: config.module_address.clone(),
            module_name: config.module_name.clone(),
            api_key: config.api_key(),
            poll_interval: Duration::from_millis(config.tx_poll_interval_ms),
            max_polls: config.tx_max_polls.max(1),
        })
    }

    /// Fully qualified `{address}::{module}::{name}`.
    pub fn function_id(&self, name: &str) -> String {
        format!("{}::{}::{}", self.module_address, self.module_name, name)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key.expose_secret()),
            None => req,
        }
    }

    // -- View functions --------------------------------------------------

    /// Call a module view function and return its raw result array.
    pub async fn view(&self, name: &str, arguments: Vec<Value>) -> Result<Vec<Value>, XenithError> {
        let function = self.function_id(name);
        debug!(function = %function, "Calling view function");

        let body = json!({
            "function": function,
            "arguments": arguments,
            "type_arguments": [],
        });
        let resp = self
            .authed(self.http.post(format!("{}/view", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| XenithError::Chain(format!("view {name} request failed: {e}")))?;

        let resp = check_status(resp, &format!("view {name}")).await?;
        resp.json::<Vec<Value>>()
            .await
            .map_err(|e| XenithError::Chain(format!("view {name} returned malformed JSON: {e}")))
    }

    pub async fn get_current_sentiment(&self) -> Result<ChainSentiment, XenithError> {
        let values = self.view("get_current_sentiment", vec![]).await?;
        let score = field_u64(&values, 0, "score")?;
        let trend = field_u64(&values, 1, "trend")?;
        Ok(ChainSentiment {
            score: score.min(100) as u8,
            trend: Trend::try_from(trend.min(u8::MAX as u64) as u8)?,
            last_update: field_u64(&values, 2, "last_update")?,
        })
    }

    pub async fn get_trading_signal(&self) -> Result<TradingSignal, XenithError> {
        let values = self.view("get_trading_signal", vec![]).await?;
        let code = field_u64(&values, 0, "signal")?;
        let kind = SignalKind::from_code(code)
            .ok_or_else(|| XenithError::Chain(format!("unknown signal code {code}")))?;
        Ok(TradingSignal {
            kind,
            confidence: field_u64(&values, 1, "confidence")?,
            generated_at: field_u64(&values, 2, "generated_at")?,
        })
    }

    /// `None` when the node reports no position for `address`.
    pub async fn get_user_position(&self, address: &str) -> Result<Option<UserPosition>, XenithError> {
        let values = self.view("get_user_position", vec![json!(address)]).await?;
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(UserPosition {
            amount: field_u64(&values, 0, "amount")?,
            direction: field_u64(&values, 1, "direction")?.min(1) as u8,
            entry_sentiment: field_u64(&values, 2, "entry_sentiment")?.min(100) as u8,
            active: field_bool(&values, 3, "active")?,
        }))
    }

    pub async fn get_treasury_balance(&self) -> Result<u64, XenithError> {
        let values = self.view("get_treasury_balance", vec![]).await?;
        field_u64(&values, 0, "balance")
    }

    /// Human-readable label for `score`, decoded from the module's byte vector.
    pub async fn interpret_sentiment(&self, score: u8) -> Result<String, XenithError> {
        let values = self.view("interpret_sentiment", vec![json!(score)]).await?;
        let raw = values
            .first()
            .ok_or_else(|| XenithError::Chain("interpret_sentiment returned nothing".into()))?;
        decode_bytes(raw)
    }

    // -- Accounts ----------------------------------------------------------

    /// Resource `data` for `address`, or `None` if the account lacks it.
    pub async fn get_account_resource(
        &self,
        address: &str,
        resource: &str,
    ) -> Result<Option<Value>, XenithError> {
        let url = format!(
            "{}/accounts/{}/resource/{}",
            self.base_url,
            address,
            urlencoding::encode(resource)
        );
        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| XenithError::Chain(format!("resource request failed: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp, "account resource").await?;
        let body: Value = resp
            .json()
            .await
            .map_err(|e| XenithError::Chain(format!("malformed resource JSON: {e}")))?;
        Ok(body.get("data").cloned())
    }

    /// APT balance of `address` in octas; zero if it has no coin store.
    pub async fn balance_octas(&self, address: &str) -> Result<u64, XenithError> {
        let Some(data) = self.get_account_resource(address, APT_COIN_STORE).await? else {
            return Ok(0);
        };
        let value = data.pointer("/coin/value").cloned().unwrap_or(Value::Null);
        parse_u64(&value).ok_or_else(|| XenithError::Chain("coin store has no value".into()))
    }

    /// Whether the module is published at the configured address.
    pub async fn module_exists(&self) -> Result<bool, XenithError> {
        let url = format!(
            "{}/accounts/{}/module/{}",
            self.base_url,
            self.module_address,
            urlencoding::encode(&self.module_name)
        );
        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| XenithError::Chain(format!("module request failed: {e}")))?;
        Ok(resp.status().is_success())
    }

    // -- Transactions ------------------------------------------------------

    /// Poll until the transaction is committed.
    ///
    /// A 404 means the node hasn't seen it yet. A committed transaction with
    /// `success: false` fails with its `vm_status`. Gives up with
    /// [`XenithError::Timeout`] after the configured number of polls.
    pub async fn wait_for_transaction(&self, hash: &str) -> Result<(), XenithError> {
        let url = format!("{}/transactions/by_hash/{}", self.base_url, hash);

        for attempt in 1..=self.max_polls {
            let resp = self
                .authed(self.http.get(&url))
                .send()
                .await
                .map_err(|e| XenithError::Chain(format!("transaction lookup failed: {e}")))?;

            if resp.status() == StatusCode::NOT_FOUND {
                debug!(hash, attempt, "Transaction not yet visible");
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            let resp = check_status(resp, "transaction lookup").await?;
            let tx: Value = resp
                .json()
                .await
                .map_err(|e| XenithError::Chain(format!("malformed transaction JSON: {e}")))?;

            match tx.get("success").and_then(Value::as_bool) {
                Some(true) => {
                    info!(hash, attempt, "Transaction committed");
                    return Ok(());
                }
                Some(false) => {
                    let status = tx
                        .get("vm_status")
                        .and_then(Value::as_str)
                        .unwrap_or("Transaction failed")
                        .to_string();
                    warn!(hash, vm_status = %status, "Transaction failed");
                    return Err(XenithError::Chain(status));
                }
                // Pending transactions carry no `success` field yet.
                None => tokio::time::sleep(self.poll_interval).await,
            }
        }

        Err(XenithError::Timeout(format!(
            "transaction {hash} not committed after {} polls",
            self.max_polls
        )))
    }
}

#[async_trait]
impl SentimentSource for ChainClient {
    async fn latest(&self) -> anyhow::Result<SentimentReading> {
        let s = self.get_current_sentiment().await?;
        Ok(SentimentReading { score: s.score, trend: s.trend })
    }

    fn name(&self) -> &str {
        "chain"
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map non-2xx responses to errors; 429 becomes [`XenithError::RateLimited`].
async fn check_status(resp: Response, what: &str) -> Result<Response, XenithError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!(what, "Node rate limit hit");
        return Err(XenithError::RateLimited(format!("{what}: {status} {body}")));
    }
    Err(XenithError::Chain(format!("{what} failed: {status} {body}")))
}

fn parse_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn field_u64(values: &[Value], idx: usize, name: &str) -> Result<u64, XenithError> {
    values
        .get(idx)
        .and_then(parse_u64)
        .ok_or_else(|| XenithError::Chain(format!("view result missing numeric {name}")))
}

fn field_bool(values: &[Value], idx: usize, name: &str) -> Result<bool, XenithError> {
    match values.get(idx) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => Ok(s == "true"),
        Some(Value::Number(n)) => Ok(n.as_u64().unwrap_or(0) != 0),
        _ => Err(XenithError::Chain(format!("view result missing boolean {name}"))),
    }
}

/// `vector<u8>` arrives either as a `0x`-prefixed hex string or as an array
/// of numbers.
fn decode_bytes(raw: &Value) -> Result<String, XenithError> {
    let bytes: Vec<u8> = match raw {
        Value::Array(items) => items
            .iter()
            .map(|b| parse_u64(b).and_then(|b| u8::try_from(b).ok()))
            .collect::<Option<_>>()
            .ok_or_else(|| XenithError::Chain("byte array contains non-byte values".into()))?,
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => decode_hex(hex)?,
            None => return Ok(s.clone()),
        },
        other => return Err(XenithError::Chain(format!("unexpected byte encoding: {other}"))),
    };
    String::from_utf8(bytes).map_err(|e| XenithError::Chain(format!("label is not UTF-8: {e}")))
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, XenithError> {
    if hex.len() % 2 != 0 {
        return Err(XenithError::Chain("odd-length hex string".into()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| XenithError::Chain(format!("bad hex byte: {e}")))
        })
        .collect()
}
