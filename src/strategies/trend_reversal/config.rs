//! Trend Reversal Configuration

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::indicators::ZigZagParams;
use crate::series::DEFAULT_LOOKBACK;

/// Configuration for the multi-timeframe trend reversal short
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReversalConfig {
    /// Entry/confirmation timeframe (default: "15m")
    #[serde(default = "default_fast_timeframe")]
    pub fast_timeframe: String,

    /// Trend timeframe (default: "1h")
    #[serde(default = "default_slow_timeframe")]
    pub slow_timeframe: String,

    /// Fast SMA on the slow stream (default: 24)
    #[serde(default = "default_fast_period")]
    pub trend_fast_period: usize,

    /// Slow SMA on the slow stream (default: 96)
    #[serde(default = "default_slow_period")]
    pub trend_slow_period: usize,

    /// Fast SMA on the fast stream (default: 24)
    #[serde(default = "default_fast_period")]
    pub confirm_fast_period: usize,

    /// Slow SMA on the fast stream (default: 96)
    #[serde(default = "default_slow_period")]
    pub confirm_slow_period: usize,

    /// Very slow SMA on the fast stream (default: 480)
    #[serde(default = "default_very_slow_period")]
    pub confirm_very_slow_period: usize,

    /// ZigZag warm-up depth on the slow stream (default: 24)
    #[serde(default = "default_zigzag_depth")]
    pub zigzag_depth: usize,

    /// ZigZag deviation in basis points (default: 8)
    #[serde(default = "default_zigzag_deviation")]
    pub zigzag_deviation: f64,

    /// ZigZag backstep, accepted but unused (default: 6)
    #[serde(default = "default_zigzag_backstep")]
    pub zigzag_backstep: usize,

    /// Distance below the signal bar low for entry and above the prior high for the stop (default: 0.0005)
    #[serde(default = "default_entry_offset")]
    pub entry_offset: f64,

    /// Take-profit distance below entry (default: 0.0010)
    #[serde(default = "default_take_profit_offset")]
    pub take_profit_offset: f64,

    /// Minimum reward/risk to take a setup (default: 1.0)
    #[serde(default = "default_rr_min")]
    pub rr_min: f64,

    /// Fixed order size (default: 1.0)
    #[serde(default = "default_order_size")]
    pub order_size: f64,

    /// Bars of history retained per series (default: 512)
    #[serde(default = "default_lookback")]
    pub lookback: usize,
}

fn default_fast_timeframe() -> String { "15m".to_string() }
fn default_slow_timeframe() -> String { "1h".to_string() }
fn default_fast_period() -> usize { 24 }
fn default_slow_period() -> usize { 96 }
fn default_very_slow_period() -> usize { 480 }
fn default_zigzag_depth() -> usize { 24 }
fn default_zigzag_deviation() -> f64 { 8.0 }
fn default_zigzag_backstep() -> usize { 6 }
fn default_entry_offset() -> f64 { 0.0005 }
fn default_take_profit_offset() -> f64 { 0.0010 }
fn default_rr_min() -> f64 { 1.0 }
fn default_order_size() -> f64 { 1.0 }
fn default_lookback() -> usize { DEFAULT_LOOKBACK }

impl Default for TrendReversalConfig {
    fn default() -> Self {
        Self {
            fast_timeframe: default_fast_timeframe(),
            slow_timeframe: default_slow_timeframe(),
            trend_fast_period: default_fast_period(),
            trend_slow_period: default_slow_period(),
            confirm_fast_period: default_fast_period(),
            confirm_slow_period: default_slow_period(),
            confirm_very_slow_period: default_very_slow_period(),
            zigzag_depth: default_zigzag_depth(),
            zigzag_deviation: default_zigzag_deviation(),
            zigzag_backstep: default_zigzag_backstep(),
            entry_offset: default_entry_offset(),
            take_profit_offset: default_take_profit_offset(),
            rr_min: default_rr_min(),
            order_size: default_order_size(),
            lookback: default_lookback(),
        }
    }
}

impl TrendReversalConfig {
    pub fn zigzag(&self) -> ZigZagParams {
        ZigZagParams {
            depth: self.zigzag_depth,
            deviation: self.zigzag_deviation,
            backstep: self.zigzag_backstep,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, period) in [
            ("trend_fast_period", self.trend_fast_period),
            ("trend_slow_period", self.trend_slow_period),
            ("confirm_fast_period", self.confirm_fast_period),
            ("confirm_slow_period", self.confirm_slow_period),
            ("confirm_very_slow_period", self.confirm_very_slow_period),
        ] {
            ensure!(period > 0, "{} must be > 0", name);
        }
        ensure!(self.lookback >= 2, "lookback must be >= 2 (got {})", self.lookback);
        ensure!(self.order_size > 0.0, "order_size must be > 0");
        ensure!(self.zigzag_deviation >= 0.0, "zigzag_deviation must be >= 0");
        ensure!(
            self.entry_offset >= 0.0 && self.take_profit_offset >= 0.0,
            "price offsets must be >= 0"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: TrendReversalConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config, TrendReversalConfig::default());
        assert_eq!(config.confirm_very_slow_period, 480);
        assert_eq!(config.zigzag().backstep, 6);
        assert_eq!(config.lookback, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_period() {
        let config = TrendReversalConfig {
            trend_slow_period: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
