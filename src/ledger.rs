//! Append-only trade ledger
//!
//! A trade is appended at signal time with its entry fields and completed in
//! place by the next completed sell notification. Fills are matched to the
//! most recent trade only, which is sound while at most one trade can be open.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::SignalError;
use crate::{Direction, Order, OrderId};

/// Price units per pip
pub const PIP_FACTOR: f64 = 10_000.0;

/// One signaled trade. Exit fields stay `None` until the fill arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_dt: DateTime<Utc>,
    pub direction: Direction,
    pub entry_price: f64,
    pub sl: f64,
    pub tp: f64,
    pub exit_dt: Option<DateTime<Utc>>,
    pub exit_price: Option<f64>,
    pub pips: Option<f64>,
    pub order_id: Option<OrderId>,
}

impl Trade {
    pub fn short(entry_dt: DateTime<Utc>, entry_price: f64, sl: f64, tp: f64) -> Self {
        Self {
            entry_dt,
            direction: Direction::Short,
            entry_price,
            sl,
            tp,
            exit_dt: None,
            exit_price: None,
            pips: None,
            order_id: None,
        }
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn is_open(&self) -> bool {
        self.exit_price.is_none()
    }
}

/// Aggregate view over the ledger.
///
/// A trade's exit is the fill of its own entry sell, so its pips measure how
/// far that fill landed from the signaled entry price (positive when it
/// filled lower). They are not the profit of a closed position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_trades: usize,
    pub filled_trades: usize,
    pub open_trades: usize,
    /// Fills with positive pips
    pub favourable_fills: usize,
    /// Fills with negative pips
    pub adverse_fills: usize,
    pub total_pips: f64,
    pub avg_pips: f64,
    /// Percentage of filled trades with positive pips
    pub favourable_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    /// Apply an order notification.
    ///
    /// Only completed sells touch the ledger; anything else is `Ok(None)`.
    pub fn on_order(
        &mut self,
        order: &Order,
        now: DateTime<Utc>,
    ) -> Result<Option<&Trade>, SignalError> {
        if !order.is_completed() || !order.is_sell() {
            return Ok(None);
        }
        let exit_price = match order.executed.as_ref() {
            Some(exec) => exec.price,
            None => return Ok(None),
        };
        self.complete_last(order.id, now, exit_price).map(Some)
    }

    /// Fill the exit fields of the most recent trade
    pub fn complete_last(
        &mut self,
        order_id: OrderId,
        exit_dt: DateTime<Utc>,
        exit_price: f64,
    ) -> Result<&Trade, SignalError> {
        let trade = match self.trades.last_mut() {
            Some(trade) if trade.is_open() => trade,
            _ => return Err(SignalError::OrphanFillNotification { order_id }),
        };

        if trade.order_id.is_some_and(|id| id != order_id) {
            warn!(
                expected = ?trade.order_id,
                received = order_id,
                "Fill order id differs from the open trade; completing it anyway"
            );
        }

        let pips = (trade.entry_price - exit_price) * PIP_FACTOR;
        trade.exit_dt = Some(exit_dt);
        trade.exit_price = Some(exit_price);
        trade.pips = Some(pips);

        info!(
            entry = trade.entry_price,
            exit = exit_price,
            pips = format!("{:.1}", pips),
            "Trade filled"
        );
        Ok(trade)
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn last(&self) -> Option<&Trade> {
        self.trades.last()
    }

    pub fn open_trade(&self) -> Option<&Trade> {
        self.trades.last().filter(|t| t.is_open())
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn summary(&self) -> LedgerSummary {
        let pips: Vec<f64> = self.trades.iter().filter_map(|t| t.pips).collect();
        let filled = pips.len();
        let favourable = pips.iter().filter(|&&p| p > 0.0).count();
        let adverse = pips.iter().filter(|&&p| p < 0.0).count();
        let total_pips = pips.iter().fold(0.0, |acc, p| acc + p);

        LedgerSummary {
            total_trades: self.trades.len(),
            filled_trades: filled,
            open_trades: self.trades.len() - filled,
            favourable_fills: favourable,
            adverse_fills: adverse,
            total_pips,
            avg_pips: if filled > 0 { total_pips / filled as f64 } else { 0.0 },
            favourable_rate: if filled > 0 {
                favourable as f64 / filled as f64 * 100.0
            } else {
                0.0
            },
        }
    }

    /// Write every trade as one CSV row
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        write_trades_csv(&self.trades, path)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.trades).context("Failed to serialize trades")
    }
}

/// Write trades as CSV, one row per trade
pub fn write_trades_csv(trades: &[Trade], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for trade in trades {
        writer.serialize(trade).context("Failed to write trade row")?;
    }
    writer.flush().context("Failed to flush trades CSV")?;
    Ok(())
}
