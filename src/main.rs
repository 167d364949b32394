//! XENITH entry point.
//!
//! Loads configuration, initialises structured logging, prepares the JSON
//! store, builds the trading session, and serves the HTTP API until Ctrl+C.
//! Optional background loops: the sentiment oracle and the chain monitor.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use xenith::chain::{ChainClient, ChainMonitor};
use xenith::config;
use xenith::engine::{Session, SessionController};
use xenith::feeds::price::{generate_price_path, PriceSeries};
use xenith::feeds::synthetic::{synthesize_history, SyntheticSentiment, BOT_SEED_WAVE, DASHBOARD_SEED_WAVE};
use xenith::feeds::{LatestSentiment, ScoreFeed};
use xenith::oracle::sources::HttpInputs;
use xenith::oracle::trend::TREND_FILE;
use xenith::oracle::SentimentOracle;
use xenith::server::{self, ServerState};
use xenith::storage::{JsonStore, SharedStore};
use xenith::types::{now_ms, SentimentSample};

const BANNER: &str = r#"
__  _______ _   _ ___ _____ _   _
\ \/ / ____| \ | |_ _|_   _| | | |
 \  /|  _| |  \| || |  | | | |_| |
 /  \| |___| |\  || |  | | |  _  |
/_/\_\_____|_| \_|___| |_| |_| |_|

  Sentiment betting backend + trading bot
  v0.1.0
"#;

/// Spacing of the synthetic bot seed history.
const BOT_SEED_SPACING_MS: i64 = 15_000;
/// Spacing of the synthetic store bootstrap history.
const STORE_SEED_SPACING_MS: i64 = 30_000;
/// Chain dashboard refresh period.
const MONITOR_INTERVAL: Duration = Duration::from_secs(12);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let cfg = config::AppConfig::load_or_default("config.toml")?;

    println!("{BANNER}");
    info!(
        port = cfg.server.port,
        data_dir = %cfg.server.data_dir,
        mode = %cfg.bot.mode,
        tick_ms = cfg.bot.tick_interval_ms,
        use_mock = cfg.bot.use_mock,
        "XENITH starting up"
    );

    // -- Store -------------------------------------------------------------

    let store = JsonStore::new(&cfg.server.data_dir);
    store.ensure_files()?;

    let mut rng = match cfg.bot.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut stored = store.read_sentiment()?.samples();
    if stored.is_empty() && cfg.bot.use_mock {
        stored = synthesize_history(&DASHBOARD_SEED_WAVE, STORE_SEED_SPACING_MS, now_ms(), &mut rng);
        for sample in &stored {
            store.save_sample(sample)?;
        }
        info!(samples = stored.len(), "Bootstrapped sentiment store with synthetic history");
    }

    // -- Session -----------------------------------------------------------

    let prices = generate_price_path(
        cfg.bot.price_points,
        cfg.bot.price_start,
        cfg.bot.price_volatility,
        &mut rng,
    );
    let prices = PriceSeries::new(prices)?;

    let chain = Arc::new(ChainClient::new(&cfg.chain)?);

    let (feed, history): (Box<dyn ScoreFeed>, Vec<SentimentSample>) = if cfg.bot.use_mock {
        let seed = synthesize_history(&BOT_SEED_WAVE, BOT_SEED_SPACING_MS, now_ms(), &mut rng);
        (Box::new(SyntheticSentiment::live(cfg.bot.seed)), seed)
    } else {
        let poll = Duration::from_millis(cfg.bot.sentiment_poll_ms);
        info!(poll_ms = cfg.bot.sentiment_poll_ms, node = %cfg.chain.node_url, "Using on-chain sentiment feed");
        (Box::new(LatestSentiment::spawn(chain.clone(), poll)), stored)
    };

    let session = Session::new(cfg.bot.strategy(), cfg.bot.initial_equity, prices, feed)
        .with_history(history);
    let shared = SharedStore::new(store);
    let mut controller = SessionController::new(session);
    if !cfg.bot.use_mock {
        // Live readings become part of the persisted history.
        controller = controller.with_sink(Arc::new(shared.clone()));
    }
    let bot = Arc::new(controller);

    // -- Server ------------------------------------------------------------

    let state = Arc::new(ServerState::with_shared(shared, bot.clone()));
    if cfg.server.enabled {
        server::spawn_server(state.clone(), cfg.server.port).await?;
    } else {
        info!("HTTP server disabled");
    }

    if cfg.bot.autostart {
        bot.start().await;
    }

    // -- Background loops --------------------------------------------------

    let mut oracle = if cfg.oracle.enabled {
        info!(
            interval_secs = cfg.oracle.cycle_interval_secs,
            subreddit = %cfg.oracle.subreddit,
            "Sentiment oracle enabled"
        );
        let history = Path::new(&cfg.server.data_dir).join(TREND_FILE);
        Some(SentimentOracle::new(Box::new(HttpInputs::new(&cfg.oracle)?)).with_history_file(history))
    } else {
        None
    };
    let mut oracle_tick = tokio::time::interval(Duration::from_secs(cfg.oracle.cycle_interval_secs.max(1)));

    let mut monitor = (!cfg.bot.use_mock).then(|| ChainMonitor::new(chain.clone()));
    let mut monitor_tick = tokio::time::interval(MONITOR_INTERVAL);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Running. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = oracle_tick.tick(), if oracle.is_some() => {
                let Some(o) = oracle.as_mut() else { continue };
                if let Some(report) = o.run_cycle().await {
                    if let Err(e) = state.record_sample(&report.sample()).await {
                        error!(error = %e, "Failed to store oracle sample");
                    }
                }
            }
            _ = monitor_tick.tick(), if monitor.is_some() => {
                let Some(m) = monitor.as_mut() else { continue };
                match m.refresh(None).await {
                    Ok(Some(o)) => info!(
                        score = o.sentiment.score,
                        trend = %o.sentiment.trend,
                        signal = %o.signal.kind,
                        label = %o.label,
                        contrarian = %o.contrarian,
                        treasury_octas = o.treasury_octas,
                        "Chain overview"
                    ),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Chain refresh failed"),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    bot.stop().await;
    let snap = bot.snapshot().await;
    info!(
        equity = format!("{:.2}", snap.equity),
        initial = format!("{:.2}", snap.initial_equity),
        steps = snap.steps,
        trades = snap.trades_closed,
        wins = snap.wins,
        open_position = ?snap.position,
        "XENITH shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("xenith=info"));

    if std::env::var("XENITH_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
