use anyhow::{Context, Result};
use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::strategy::ChannelReversionConfig;

/// Config file read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "config_binance_canal.json";

/// Prefix for environment overrides, e.g. `CHANNELBOT_REGRESSION_LENGTH=80`
pub const ENV_PREFIX: &str = "CHANNELBOT";

/// Runtime configuration, loaded once at startup
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    /// Instruments to scan, normalised to exchange symbols (e.g. "BTCUSDT")
    pub symbols: Vec<String>,
    /// Candle interval, e.g. "15m", "1h"
    pub timeframe: String,
    pub regression_length: usize,
    /// Touch tolerance in percent
    pub touch_threshold: f64,
    /// Minimum channel angle in degrees
    pub min_trend_angle: f64,
    /// Stop distance beyond the band in percent
    pub sl_percentage: f64,
    pub min_volume: f64,
    pub scan_interval_minutes: u64,
    pub max_symbols_to_scan: usize,
    /// Extra candles fetched beyond the regression window
    pub history_padding: usize,
    /// Pause after a failed cycle before the next one
    pub error_cooldown_seconds: u64,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    /// Label shown in cycle logs
    pub mode: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            timeframe: "15m".to_string(),
            regression_length: 50,
            touch_threshold: 0.5,
            min_trend_angle: 0.5,
            sl_percentage: 1.0,
            min_volume: 0.0,
            scan_interval_minutes: 15,
            max_symbols_to_scan: 20,
            history_padding: 50,
            error_cooldown_seconds: 60,
            telegram_token: None,
            telegram_chat_id: None,
            mode: "futures".to_string(),
        }
    }
}

impl BotConfig {
    /// Load from a JSON/TOML file layered under `CHANNELBOT_*` environment
    /// variables. Without a path the default file is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = Config::builder().add_source(file).add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("symbols"),
        );

        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let mut cfg: BotConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        cfg.symbols = normalize_symbols(&cfg.symbols);
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            anyhow::bail!(crate::Error::Config("no symbols configured".to_string()));
        }
        if self.regression_length < 2 {
            anyhow::bail!(crate::Error::Config(format!(
                "regression_length must be at least 2, got {}",
                self.regression_length
            )));
        }
        Ok(())
    }

    /// Candles requested per instrument each cycle
    pub fn candles_to_fetch(&self) -> usize {
        self.regression_length + self.history_padding
    }

    /// Telegram credentials when both token and chat are set
    pub fn telegram(&self) -> Option<(String, String)> {
        match (&self.telegram_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => {
                Some((token.clone(), chat.clone()))
            }
            _ => None,
        }
    }

    pub fn strategy_config(&self) -> ChannelReversionConfig {
        ChannelReversionConfig {
            regression_length: self.regression_length,
            touch_threshold: self.touch_threshold,
            min_trend_angle: self.min_trend_angle,
            sl_percentage: self.sl_percentage,
            min_volume: self.min_volume,
        }
    }
}

/// Normalise a user-supplied symbol to a USDT-M futures pair
///
/// "btc" -> "BTCUSDT", "ADA/USDT:USDT" -> "ADAUSDT", "eth usdt" -> "ETHUSDT"
pub fn normalize_symbol(symbol: &str) -> String {
    let mut clean: String = symbol
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '/')
        .collect();

    if let Some(stripped) = clean.strip_suffix(":USDT") {
        clean = stripped.to_string();
    }

    if !clean.ends_with("USDT") {
        clean.push_str("USDT");
    }

    clean
}

/// Normalise every symbol, dropping empties and duplicates, keeping order
pub fn normalize_symbols(symbols: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(symbols.len());
    for symbol in symbols.iter().filter(|s| !s.trim().is_empty()) {
        let normalized = normalize_symbol(symbol);
        if !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}
