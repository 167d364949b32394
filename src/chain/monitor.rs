//! Periodic chain overview with rate-limit backoff.
//!
//! After the node answers 429, refreshes are skipped until the cooldown
//! expires.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::client::ChainClient;
use crate::strategy::signal::ContrarianSignal;
use crate::types::{ChainSentiment, TradingSignal, UserPosition, XenithError};

pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(30);

/// Everything the dashboard shows from the chain in one refresh.
#[derive(Debug, Clone, Serialize)]
pub struct ChainOverview {
    pub sentiment: ChainSentiment,
    pub signal: TradingSignal,
    pub treasury_octas: u64,
    pub label: String,
    pub contrarian: ContrarianSignal,
    pub position: Option<UserPosition>,
}

pub struct ChainMonitor {
    client: Arc<ChainClient>,
    cooldown: Duration,
    cooldown_until: Option<Instant>,
}

impl ChainMonitor {
    pub fn new(client: Arc<ChainClient>) -> Self {
        Self {
            client,
            cooldown: RATE_LIMIT_COOLDOWN,
            cooldown_until: None,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn cooling_down(&self) -> bool {
        self.cooldown_until.is_some_and(|until| Instant::now() < until)
    }

    /// Fetch a fresh overview. `Ok(None)` while cooling down.
    pub async fn refresh(&mut self, address: Option<&str>) -> Result<Option<ChainOverview>, XenithError> {
        if self.cooling_down() {
            debug!("Chain refresh skipped, rate-limit cooldown active");
            return Ok(None);
        }
        self.cooldown_until = None;

        match self.fetch(address).await {
            Ok(overview) => Ok(Some(overview)),
            Err(e @ XenithError::RateLimited(_)) => {
                self.cooldown_until = Some(Instant::now() + self.cooldown);
                warn!(cooldown_secs = self.cooldown.as_secs(), "Backing off after node rate limit");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch(&self, address: Option<&str>) -> Result<ChainOverview, XenithError> {
        let c = &self.client;
        let (sentiment, signal, treasury_octas) = futures::try_join!(
            c.get_current_sentiment(),
            c.get_trading_signal(),
            c.get_treasury_balance(),
        )?;
        let label = c.interpret_sentiment(sentiment.score).await?;
        let position = match address {
            Some(addr) => c.get_user_position(addr).await?,
            None => None,
        };

        Ok(ChainOverview {
            contrarian: ContrarianSignal::from_score(sentiment.score),
            sentiment,
            signal,
            treasury_octas,
            label,
            position,
        })
    }
}
