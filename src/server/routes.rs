//! HTTP route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ServerState>`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::backtest::{BacktestReport, Backtester};
use crate::engine::{SessionController, SessionSnapshot, StepOutcome};
use crate::storage::{BetsDocument, JsonStore, LeaderboardEntry, SentimentDocument, SharedStore};
use crate::types::{
    SentimentSample, StrategyConfig, StrategyMode, XenithError, MIN_TICK_INTERVAL_MS,
};

/// Upper bound on synthetic backtest length.
pub const MAX_BACKTEST_STEPS: usize = 100_000;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct ServerState {
    pub store: SharedStore,
    pub bot: Arc<SessionController>,
}

impl ServerState {
    pub fn new(store: JsonStore, bot: Arc<SessionController>) -> Self {
        Self::with_shared(SharedStore::new(store), bot)
    }

    /// Share a store (and its lock) already handed to other writers.
    pub fn with_shared(store: SharedStore, bot: Arc<SessionController>) -> Self {
        Self { store, bot }
    }

    /// Append a sample, for in-process producers.
    pub async fn record_sample(&self, sample: &SentimentSample) -> anyhow::Result<()> {
        self.store.record_sample(sample).await
    }

    pub async fn sentiment_history(&self) -> anyhow::Result<Vec<SentimentSample>> {
        self.store.sentiment_history().await
    }
}

pub type AppState = Arc<ServerState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Store failure mapped to an HTTP response: invalid input becomes 400
/// with the message as `{"error": ..}`, everything else 500.
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0.downcast_ref::<XenithError>() {
            Some(XenithError::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            _ => {
                error!(error = %self.0, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Clone, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

const OK: OkResponse = OkResponse { ok: true };

#[derive(Debug, Clone, Serialize)]
pub struct ControlResponse {
    /// Whether the call changed the running state.
    pub changed: bool,
    pub running: bool,
}

// ---------------------------------------------------------------------------
// Store routes
// ---------------------------------------------------------------------------

/// GET /api/bets
pub async fn get_bets(State(state): State<AppState>) -> ApiResult<BetsDocument> {
    Ok(Json(state.store.run(|s| s.read_bets()).await?))
}

/// POST /api/bets
pub async fn post_bet(State(state): State<AppState>, Json(bet): Json<Value>) -> ApiResult<OkResponse> {
    state.store.run(move |s| s.upsert_bet(bet)).await?;
    Ok(Json(OK))
}

/// GET /api/sentiment
pub async fn get_sentiment(State(state): State<AppState>) -> ApiResult<SentimentDocument> {
    Ok(Json(state.store.run(|s| s.read_sentiment()).await?))
}

/// POST /api/sentiment
pub async fn post_sentiment(
    State(state): State<AppState>,
    Json(sample): Json<Value>,
) -> ApiResult<OkResponse> {
    state.store.run(move |s| s.append_sentiment(sample)).await?;
    Ok(Json(OK))
}

/// GET /api/leaderboard
pub async fn get_leaderboard(State(state): State<AppState>) -> ApiResult<Vec<LeaderboardEntry>> {
    Ok(Json(state.store.run(|s| s.leaderboard()).await?))
}

// ---------------------------------------------------------------------------
// Bot routes
// ---------------------------------------------------------------------------

/// GET /api/bot
pub async fn get_bot(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.bot.snapshot().await)
}

/// POST /api/bot/start
pub async fn start_bot(State(state): State<AppState>) -> Json<ControlResponse> {
    let changed = state.bot.start().await;
    Json(ControlResponse { changed, running: true })
}

/// POST /api/bot/stop
pub async fn stop_bot(State(state): State<AppState>) -> Json<ControlResponse> {
    let changed = state.bot.stop().await;
    Json(ControlResponse { changed, running: false })
}

/// POST /api/bot/step
pub async fn step_bot(State(state): State<AppState>) -> Json<StepOutcome> {
    Json(state.bot.step_now().await)
}

/// PUT /api/bot/config
pub async fn put_bot_config(
    State(state): State<AppState>,
    Json(config): Json<StrategyConfig>,
) -> Json<StrategyConfig> {
    let applied = state.bot.reconfigure(config).await;
    info!(mode = %applied.mode, tick_ms = applied.tick_interval_ms, "Bot config updated via API");
    Json(applied)
}

// ---------------------------------------------------------------------------
// Backtest
// ---------------------------------------------------------------------------

/// Synthetic backtest parameters; every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BacktestRequest {
    pub mode: StrategyMode,
    pub steps: usize,
    pub initial_equity: f64,
    pub start_price: f64,
    pub volatility: f64,
    /// Random when absent; echoed back so the run can be reproduced.
    pub seed: Option<u64>,
}

impl Default for BacktestRequest {
    fn default() -> Self {
        Self {
            mode: StrategyMode::Follow,
            steps: 1000,
            initial_equity: 1000.0,
            start_price: 100.0,
            volatility: 0.6,
            seed: None,
        }
    }
}

impl BacktestRequest {
    fn validate(&self) -> Result<(), XenithError> {
        if self.steps == 0 || self.steps > MAX_BACKTEST_STEPS {
            return Err(XenithError::InvalidInput(format!(
                "steps must be between 1 and {MAX_BACKTEST_STEPS}"
            )));
        }
        if !(self.initial_equity.is_finite() && self.initial_equity > 0.0) {
            return Err(XenithError::InvalidInput("initial_equity must be positive".into()));
        }
        if !(self.start_price.is_finite() && self.start_price > 0.0) {
            return Err(XenithError::InvalidInput("start_price must be positive".into()));
        }
        if !(self.volatility.is_finite() && self.volatility >= 0.0) {
            return Err(XenithError::InvalidInput("volatility must be non-negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestResponse {
    pub seed: u64,
    #[serde(flatten)]
    pub report: BacktestReport,
}

/// POST /api/backtest
pub async fn post_backtest(Json(req): Json<BacktestRequest>) -> ApiResult<BacktestResponse> {
    req.validate().map_err(anyhow::Error::from)?;
    let seed = req.seed.unwrap_or_else(rand::random);
    let config = StrategyConfig { mode: req.mode, tick_interval_ms: MIN_TICK_INTERVAL_MS };
    let backtester = Backtester::new(config, req.initial_equity);

    let report = tokio::task::spawn_blocking(move || {
        backtester.run_synthetic(req.steps, req.start_price, req.volatility, seed)
    })
    .await
    .context("Backtest task failed")?
    .map_err(anyhow::Error::from)?;

    info!(
        seed,
        steps = report.steps,
        trades = report.total_trades,
        return_pct = format!("{:.2}", report.return_pct),
        "Backtest served"
    );
    Ok(Json(BacktestResponse { seed, report }))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}
