//! Trading Strategies Module
//!
//! Event-driven strategy interface. The driving engine calls, per fast bar:
//! 1. [`Strategy::advance`] with the new bars so indicators update,
//! 2. [`Strategy::notify_order`] for any order state change,
//! 3. [`Strategy::next`] to evaluate entries.

pub mod trend_reversal;

use anyhow::Result;

use crate::broker::Broker;
use crate::indicators::Pivot;
use crate::ledger::TradeLedger;
use crate::multi_timeframe::BarUpdate;
use crate::{Config, Order};

/// Trading strategy trait
pub trait Strategy: Send {
    /// Strategy identifier (must match config's strategy_name)
    fn name(&self) -> &'static str;

    /// Fast and slow timeframe the strategy consumes
    fn timeframes(&self) -> (&str, &str);

    /// Ingest the bars of one fast-timeframe step
    fn advance(&mut self, update: &BarUpdate<'_>);

    /// Per-bar evaluation hook
    fn next(&mut self, broker: &mut dyn Broker);

    /// Fill/status notification hook
    fn notify_order(&mut self, order: &Order);

    /// Trades signaled so far
    fn ledger(&self) -> &TradeLedger;

    /// Swing pivots confirmed so far, if the strategy tracks them
    fn pivots(&self) -> &[Pivot] {
        &[]
    }

    /// Advance and evaluate in one call, for drivers without a fill phase
    fn on_bar(&mut self, update: &BarUpdate<'_>, broker: &mut dyn Broker) {
        self.advance(update);
        self.next(broker);
    }

    /// Initialize strategy (called once before trading starts)
    fn init(&mut self) {}
}

/// Names accepted by [`create_strategy`]
pub fn available_strategies() -> Vec<&'static str> {
    vec![trend_reversal::NAME]
}

/// Create a strategy from configuration
pub fn create_strategy(config: &Config) -> Result<Box<dyn Strategy>> {
    match config.strategy_name.as_str() {
        trend_reversal::NAME => Ok(Box::new(trend_reversal::create_strategy_from_config(
            config,
        )?)),
        other => anyhow::bail!(
            "Unknown strategy: '{}'. Available: {}",
            other,
            available_strategies().join(", ")
        ),
    }
}
