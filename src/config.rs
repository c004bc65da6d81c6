//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files. The `strategy`
//! section is kept as raw JSON and deserialized by the selected strategy.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::multi_timeframe::BarTimestamp;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_strategy_name")]
    pub strategy_name: String,
    #[serde(default = "default_strategy")]
    pub strategy: serde_json::Value,
    #[serde(default)]
    pub backtest: BacktestConfig,
}

fn default_strategy_name() -> String {
    "trend_reversal".to_string()
}

fn default_strategy() -> serde_json::Value {
    serde_json::json!({})
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy_name: default_strategy_name(),
            strategy: default_strategy(),
            backtest: BacktestConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }

    /// Fast and slow timeframe from the strategy section, "15m"/"1h" if unset
    pub fn timeframes(&self) -> (String, String) {
        let get = |key: &str, default: &str| {
            self.strategy
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or(default)
                .to_string()
        };
        (get("fast_timeframe", "15m"), get("slow_timeframe", "1h"))
    }

    /// Set a single parameter in the strategy section
    pub fn set_strategy_param(&mut self, key: &str, value: serde_json::Value) {
        if !self.strategy.is_object() {
            self.strategy = default_strategy();
        }
        if let Some(obj) = self.strategy.as_object_mut() {
            obj.insert(key.to_string(), value);
        }
    }

    /// `{data_dir}/{symbol}_{timeframe}.csv`
    pub fn data_file(&self, timeframe: &str) -> PathBuf {
        Path::new(&self.backtest.data_dir).join(format!("{}_{}.csv", self.backtest.symbol, timeframe))
    }
}

/// Backtest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    /// Whether bar timestamps mark the open or the close of their interval
    #[serde(default)]
    pub bar_timestamps: BarTimestamp,
    /// Close positions at the trade's stop/target inside the replay
    #[serde(default = "default_bracket_exits")]
    pub bracket_exits: bool,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_results_dir() -> String {
    "results".to_string()
}

fn default_symbol() -> String {
    "EURUSD".to_string()
}

fn default_bracket_exits() -> bool {
    true
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            results_dir: default_results_dir(),
            symbol: default_symbol(),
            start_date: None,
            end_date: None,
            bar_timestamps: BarTimestamp::default(),
            bracket_exits: default_bracket_exits(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "strategy_name": "trend_reversal",
                "strategy": {{ "fast_timeframe": "5m", "rr_min": 1.5 }},
                "backtest": {{ "data_dir": "fx", "symbol": "GBPUSD", "bar_timestamps": "open" }}
            }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.timeframes(), ("5m".to_string(), "1h".to_string()));
        assert_eq!(config.backtest.symbol, "GBPUSD");
        assert_eq!(config.backtest.results_dir, "results");
        assert_eq!(config.backtest.bar_timestamps, BarTimestamp::Open);
        assert!(config.backtest.bracket_exits);
        assert_eq!(config.data_file("5m"), Path::new("fx").join("GBPUSD_5m.csv"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = Config::from_file("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_set_strategy_param() {
        let mut config = Config::default();
        config.set_strategy_param("rr_min", serde_json::json!(2.0));
        assert_eq!(config.strategy["rr_min"], serde_json::json!(2.0));
    }
}
