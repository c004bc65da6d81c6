//! Multi-timeframe Trend Reversal Short
//!
//! Shorts the end of a slow-timeframe uptrend once the fast timeframe
//! confirms the turn, priced off the last two fast bars and gated on a
//! minimum reward/risk.

mod config;
mod strategy;

pub use config::TrendReversalConfig;
pub use strategy::{EntryConditions, EntrySetup, SignalEngine};

use anyhow::{Context, Result};

use crate::Config;

/// Registry name of the strategy
pub const NAME: &str = "trend_reversal";

/// Create strategy instance from config
pub fn create_strategy_from_config(config: &Config) -> Result<SignalEngine> {
    let strategy_config: TrendReversalConfig = serde_json::from_value(config.strategy.clone())
        .context("Failed to parse trend_reversal strategy config")?;
    strategy_config.validate()?;
    SignalEngine::new(strategy_config)
}
