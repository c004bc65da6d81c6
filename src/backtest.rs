//! Backtesting engine
//!
//! Replays a fast/slow bar pair through a strategy and a [`SimBroker`].
//! Per fast bar the order of events is:
//! 1. the strategy ingests the fast bar and any slow bars that closed with it
//! 2. a pending sell fills at this bar's open and is notified
//! 3. an open short is closed if the bar touches its stop or target
//! 4. the strategy evaluates entries
//! 5. a newly signaled trade has its stop/target armed on the broker
//!
//! No commission, slippage or spread is modeled.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::broker::SimBroker;
use crate::indicators::Pivot;
use crate::ledger::{write_trades_csv, LedgerSummary, Trade};
use crate::multi_timeframe::TimeframePair;
use crate::strategies::Strategy;
use crate::Config;

/// Backtest engine
pub struct Backtester {
    config: Config,
    strategy: Box<dyn Strategy>,
}

impl Backtester {
    pub fn new(config: Config, strategy: Box<dyn Strategy>) -> Self {
        Backtester { config, strategy }
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    /// Run the replay over `data`
    pub fn run(&mut self, data: &TimeframePair) -> BacktestResult {
        let mut broker = SimBroker::new();
        let stamps = self.config.backtest.bar_timestamps;
        let bracket_exits = self.config.backtest.bracket_exits;

        if data.is_empty() {
            tracing::error!("No bars available for backtesting");
            return BacktestResult::default();
        }

        self.strategy.init();
        info!(
            strategy = self.strategy.name(),
            fast = %data.fast_timeframe,
            slow = %data.slow_timeframe,
            bars = data.len(),
            "Replay started"
        );

        let mut bars_processed = 0usize;
        for update in data.updates(stamps) {
            broker.set_time(update.datetime());
            self.strategy.advance(&update);

            if let Some(fill) = broker.fill_pending(update.fast) {
                self.strategy.notify_order(&fill);
            }
            if bracket_exits {
                if let Some(exit) = broker.check_exits(update.fast) {
                    self.strategy.notify_order(&exit);
                }
            }

            let before = self.strategy.ledger().len();
            self.strategy.next(&mut broker);

            if self.strategy.ledger().len() > before {
                if let Some(trade) = self.strategy.ledger().last() {
                    if bracket_exits {
                        broker.set_bracket(trade.sl, trade.tp);
                    }
                    debug!(entry = trade.entry_price, sl = trade.sl, tp = trade.tp, "Trade signaled");
                }
            }
            bars_processed += 1;
        }

        let ledger = self.strategy.ledger();
        let summary = ledger.summary();
        info!(
            bars = bars_processed,
            trades = summary.total_trades,
            filled = summary.filled_trades,
            total_pips = format!("{:.1}", summary.total_pips),
            "Replay finished"
        );

        BacktestResult {
            trades: ledger.trades().to_vec(),
            summary,
            pivots: self.strategy.pivots().to_vec(),
            bars_processed,
        }
    }
}

/// Backtest output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub summary: LedgerSummary,
    pub pivots: Vec<Pivot>,
    pub bars_processed: usize,
}

impl BacktestResult {
    /// Write `trades.csv` and `trades.json` under `results_dir`
    pub fn write_artifacts(&self, results_dir: impl AsRef<Path>) -> Result<()> {
        let dir = results_dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create results dir {}", dir.display()))?;

        write_trades_csv(&self.trades, dir.join("trades.csv"))?;

        let json = serde_json::to_string_pretty(&self.trades).context("Failed to serialize trades")?;
        let json_path = dir.join("trades.json");
        fs::write(&json_path, json)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;

        info!("Results written to {}", dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::create_strategy;
    use crate::Bar;
    use chrono::{DateTime, Duration, Utc};

    fn flat_pair(count: usize) -> TimeframePair {
        let t0 = DateTime::<Utc>::from_timestamp(1_704_067_200, 0).unwrap();
        let fast = (1..=count)
            .map(|i| Bar::new_unchecked(t0 + Duration::minutes(15 * i as i64), 1.1, 1.1005, 1.0995, 1.1))
            .collect();
        let slow = (1..=count / 4)
            .map(|i| Bar::new_unchecked(t0 + Duration::hours(i as i64), 1.1, 1.1005, 1.0995, 1.1))
            .collect();
        TimeframePair::new("15m", "1h", fast, slow)
    }

    #[test]
    fn test_flat_market_has_no_trades() {
        let config = Config::default();
        let strategy = create_strategy(&config).unwrap();
        let mut backtester = Backtester::new(config, strategy);

        let result = backtester.run(&flat_pair(400));
        assert_eq!(result.bars_processed, 400);
        assert!(result.trades.is_empty());
        assert_eq!(result.summary.total_trades, 0);
    }

    #[test]
    fn test_empty_data() {
        let config = Config::default();
        let strategy = create_strategy(&config).unwrap();
        let mut backtester = Backtester::new(config, strategy);

        let result = backtester.run(&TimeframePair::new("15m", "1h", Vec::new(), Vec::new()));
        assert_eq!(result.bars_processed, 0);
    }

    #[test]
    fn test_write_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let result = BacktestResult::default();
        result.write_artifacts(dir.path().join("out")).unwrap();

        assert!(dir.path().join("out/trades.csv").exists());
        let json = std::fs::read_to_string(dir.path().join("out/trades.json")).unwrap();
        assert_eq!(json.trim(), "[]");
    }
}
