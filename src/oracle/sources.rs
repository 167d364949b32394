//! Oracle inputs: Reddit hot posts, CoinGecko 24h moves, and the
//! alternative.me Fear & Greed index.
//!
//! Every fetch degrades instead of failing: an unreachable source yields an
//! empty list or the neutral index.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use super::scorer::{market_item_score, ScoredText, NEUTRAL};
use crate::config::OracleConfig;

const REDDIT_BASE: &str = "https://www.reddit.com";
const COINGECKO_MARKETS: &str = "https://api.coingecko.com/api/v3/coins/markets";
const FEAR_GREED_URL: &str = "https://api.alternative.me/fng/";

#[async_trait]
pub trait OracleInputs: Send + Sync {
    /// Social posts weighted by upvotes.
    async fn social_posts(&self) -> Vec<ScoredText>;

    /// Market items weighted by their price-change score.
    async fn market_items(&self) -> Vec<ScoredText>;

    /// Fear & Greed index, [`NEUTRAL`] when unavailable.
    async fn fear_greed(&self) -> u8;
}

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RedditListing {
    data: RedditListingData,
}

#[derive(Debug, Deserialize)]
struct RedditListingData {
    #[serde(default)]
    children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
struct RedditChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CoinMarket {
    name: String,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FearGreedResponse {
    #[serde(default)]
    data: Vec<FearGreedEntry>,
}

#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    value: String,
}

pub(crate) fn posts_from_listing(listing: RedditListing) -> Vec<ScoredText> {
    listing
        .data
        .children
        .into_iter()
        .map(|c| ScoredText::new(format!("{} {}", c.data.title, c.data.selftext), c.data.score))
        .collect()
}

pub(crate) fn items_from_markets(markets: Vec<CoinMarket>) -> Vec<ScoredText> {
    markets
        .into_iter()
        .map(|m| {
            let change = m.price_change_percentage_24h.unwrap_or(0.0);
            let score = market_item_score(change);
            ScoredText::new(format!("{} price change: {change:.2}%", m.name), score as i64)
        })
        .collect()
}

pub(crate) fn index_from_response(resp: FearGreedResponse) -> Option<u8> {
    let raw = resp.data.first()?.value.trim().parse::<i64>().ok()?;
    Some(crate::types::clamp_score(raw))
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

pub struct HttpInputs {
    http: Client,
    subreddit: String,
    post_limit: u32,
    coins: Vec<String>,
}

impl HttpInputs {
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("SentimentBot/1.0")
            .build()
            .context("Failed to build HTTP client for oracle")?;

        Ok(Self {
            http,
            subreddit: config.subreddit.clone(),
            post_limit: config.post_limit,
            coins: config.coins.clone(),
        })
    }

    async fn fetch_reddit(&self) -> Result<Vec<ScoredText>> {
        let url = format!(
            "{REDDIT_BASE}/r/{}/hot.json?limit={}",
            urlencoding::encode(&self.subreddit),
            self.post_limit
        );
        let listing: RedditListing = self
            .http
            .get(&url)
            .send()
            .await
            .context("Reddit request failed")?
            .error_for_status()
            .context("Reddit returned an error status")?
            .json()
            .await
            .context("Failed to parse Reddit listing")?;
        Ok(posts_from_listing(listing))
    }

    async fn fetch_markets(&self) -> Result<Vec<ScoredText>> {
        let ids = self.coins.join(",");
        let per_page = self.coins.len().to_string();
        let markets: Vec<CoinMarket> = self
            .http
            .get(COINGECKO_MARKETS)
            .query(&[
                ("vs_currency", "usd"),
                ("ids", ids.as_str()),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", "1"),
                ("price_change_percentage", "24h"),
            ])
            .send()
            .await
            .context("CoinGecko request failed")?
            .error_for_status()
            .context("CoinGecko returned an error status")?
            .json()
            .await
            .context("Failed to parse CoinGecko markets")?;
        Ok(items_from_markets(markets))
    }

    async fn fetch_fear_greed(&self) -> Result<Option<u8>> {
        let resp: FearGreedResponse = self
            .http
            .get(FEAR_GREED_URL)
            .send()
            .await
            .context("Fear & Greed request failed")?
            .json()
            .await
            .context("Failed to parse Fear & Greed response")?;
        Ok(index_from_response(resp))
    }
}

#[async_trait]
impl OracleInputs for HttpInputs {
    async fn social_posts(&self) -> Vec<ScoredText> {
        match self.fetch_reddit().await {
            Ok(posts) => {
                info!(count = posts.len(), subreddit = %self.subreddit, "Fetched Reddit posts");
                posts
            }
            Err(e) => {
                warn!(error = %e, "Reddit fetch failed");
                Vec::new()
            }
        }
    }

    async fn market_items(&self) -> Vec<ScoredText> {
        match self.fetch_markets().await {
            Ok(items) => {
                info!(count = items.len(), "Fetched CoinGecko market items");
                items
            }
            Err(e) => {
                warn!(error = %e, "CoinGecko fetch failed");
                Vec::new()
            }
        }
    }

    async fn fear_greed(&self) -> u8 {
        match self.fetch_fear_greed().await {
            Ok(Some(v)) => v,
            Ok(None) => NEUTRAL,
            Err(e) => {
                warn!(error = %e, "Fear & Greed fetch failed, using neutral");
                NEUTRAL
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reddit_listing_parsing() {
        let raw = r#"{"kind":"Listing","data":{"children":[
            {"kind":"t3","data":{"title":"BTC breakout","selftext":"looks strong","score":420,"num_comments":12,"created_utc":1.0}},
            {"kind":"t3","data":{"title":"Daily thread","score":-3}}
        ]}}"#;
        let listing: RedditListing = serde_json::from_str(raw).unwrap();
        let posts = posts_from_listing(listing);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0], ScoredText::new("BTC breakout looks strong", 420));
        assert_eq!(posts[1].weight, -3);
    }

    #[test]
    fn test_market_items_scored_by_change() {
        let raw = r#"[
            {"id":"bitcoin","name":"Bitcoin","price_change_percentage_24h":4.256},
            {"id":"ethereum","name":"Ethereum","price_change_percentage_24h":null}
        ]"#;
        let markets: Vec<CoinMarket> = serde_json::from_str(raw).unwrap();
        let items = items_from_markets(markets);
        assert_eq!(items[0], ScoredText::new("Bitcoin price change: 4.26%", 54));
        assert_eq!(items[1], ScoredText::new("Ethereum price change: 0.00%", 50));
    }

    #[test]
    fn test_fear_greed_parsing() {
        let resp: FearGreedResponse =
            serde_json::from_str(r#"{"name":"Fear and Greed Index","data":[{"value":"27","value_classification":"Fear"}]}"#)
                .unwrap();
        assert_eq!(index_from_response(resp), Some(27));

        let empty: FearGreedResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert_eq!(index_from_response(empty), None);
    }
}
