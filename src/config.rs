//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has defaults, so a partial (or missing) file still yields
//! a runnable configuration. Secrets are referenced by env-var name and
//! resolved at runtime.

use anyhow::{Context, Result};
use secrecy::Secret;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::types::{StrategyConfig, StrategyMode};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub bot: BotConfig,
    pub chain: ChainConfig,
    pub oracle: OracleConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub port: u16,
    /// Directory holding `bets.json` and `sentiment.json`.
    pub data_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8787,
            data_dir: ".".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BotConfig {
    pub autostart: bool,
    pub mode: StrategyMode,
    pub tick_interval_ms: u64,
    pub initial_equity: f64,
    /// Use the synthetic sentiment generator instead of a live source.
    pub use_mock: bool,
    pub price_points: usize,
    pub price_start: f64,
    pub price_volatility: f64,
    /// Fixed RNG seed; random when absent.
    pub seed: Option<u64>,
    /// How often a live sentiment source is polled, independent of the tick.
    pub sentiment_poll_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            autostart: false,
            mode: StrategyMode::Follow,
            tick_interval_ms: 300,
            initial_equity: 1000.0,
            use_mock: true,
            price_points: 1000,
            price_start: 100.0,
            price_volatility: 0.6,
            seed: None,
            sentiment_poll_ms: 12_000,
        }
    }
}

impl BotConfig {
    pub fn strategy(&self) -> StrategyConfig {
        StrategyConfig {
            mode: self.mode,
            tick_interval_ms: self.tick_interval_ms,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChainConfig {
    /// Node REST base URL, e.g. `https://fullnode.testnet.aptoslabs.com/v1`.
    pub node_url: String,
    pub module_address: String,
    pub module_name: String,
    /// Env var holding an optional node API key.
    pub api_key_env: Option<String>,
    pub tx_poll_interval_ms: u64,
    pub tx_max_polls: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            node_url: "https://fullnode.mainnet.aptoslabs.com/v1".to_string(),
            module_address: "0x473558faf73c5911531b6514abd4aeb12f6ebc3846a845a9d752fd6884ed65ec"
                .to_string(),
            module_name: "emotion_signals".to_string(),
            api_key_env: None,
            tx_poll_interval_ms: 1000,
            tx_max_polls: 120,
        }
    }
}

impl ChainConfig {
    /// Node API key, if one is configured and present in the environment.
    pub fn api_key(&self) -> Option<Secret<String>> {
        self.api_key_env
            .as_deref()
            .and_then(|env| std::env::var(env).ok())
            .filter(|k| !k.is_empty())
            .map(Secret::new)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OracleConfig {
    pub enabled: bool,
    pub cycle_interval_secs: u64,
    pub subreddit: String,
    pub post_limit: u32,
    pub coins: Vec<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cycle_interval_secs: 300,
            subreddit: "cryptocurrency".to_string(),
            post_limit: 25,
            coins: vec!["bitcoin".to_string(), "ethereum".to_string()],
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }
}
