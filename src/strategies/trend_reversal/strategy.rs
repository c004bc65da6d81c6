//! Trend Reversal Short Implementation
//!
//! Entry requires all of, on the same fast bar:
//! 1. The slow-stream uptrend held on the previous slow bar and not now
//! 2. The slow close crossed from above to below its slow SMA
//! 3. On the fast stream, the fast SMA crossed under the slow SMA while the
//!    close sits below the very slow SMA
//! 4. No open position
//!
//! The setup is then priced off the fast bars and gated on reward/risk.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::broker::Broker;
use crate::error::SignalError;
use crate::indicators::{MovingAverage, Pivot, SwingPivotDetector};
use crate::ledger::{Trade, TradeLedger};
use crate::multi_timeframe::BarUpdate;
use crate::series::BarSeries;
use crate::strategies::Strategy;
use crate::trend::TrendClassifier;
use crate::{Bar, Order, OrderId, OrderType, PriceField};

use super::config::TrendReversalConfig;
use super::NAME;

/// Per-bar entry conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryConditions {
    pub trend_ended: bool,
    pub cross_down: bool,
    pub confirmed: bool,
}

impl EntryConditions {
    pub fn all(&self) -> bool {
        self.trend_ended && self.cross_down && self.confirmed
    }
}

/// Prices of a short setup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySetup {
    pub entry_price: f64,
    pub sl_price: f64,
    pub tp_price: f64,
}

impl EntrySetup {
    /// Price a short off the current fast bar's low and the previous bar's high
    pub fn from_bars(
        fast: &BarSeries,
        entry_offset: f64,
        take_profit_offset: f64,
    ) -> Result<Self, SignalError> {
        let low = fast.low(0).ok_or(SignalError::InsufficientHistory {
            series: "fast low",
            shift: 0,
        })?;
        let prev_high = fast.high(-1).ok_or(SignalError::InsufficientHistory {
            series: "fast high",
            shift: -1,
        })?;

        let entry_price = low - entry_offset;
        Ok(Self {
            entry_price,
            sl_price: prev_high + entry_offset,
            tp_price: entry_price - take_profit_offset,
        })
    }

    /// `(entry - tp) / (sl - entry)`; a stop at or below entry is rejected
    pub fn risk_reward(&self) -> Result<f64, SignalError> {
        let risk = self.sl_price - self.entry_price;
        if risk <= 0.0 {
            return Err(SignalError::DegenerateRiskDenominator {
                entry: self.entry_price,
                stop: self.sl_price,
            });
        }
        Ok((self.entry_price - self.tp_price) / risk)
    }

    /// Reward/risk if it meets `rr_min`
    pub fn check(&self, rr_min: f64) -> Result<f64, SignalError> {
        let rr = self.risk_reward()?;
        if rr < rr_min {
            return Err(SignalError::SubThresholdRiskReward { rr, min: rr_min });
        }
        Ok(rr)
    }
}

/// Multi-timeframe trend reversal short signal engine
pub struct SignalEngine {
    config: TrendReversalConfig,
    fast: BarSeries,
    slow: BarSeries,
    trend: TrendClassifier,
    confirm_fast: MovingAverage,
    confirm_slow: MovingAverage,
    confirm_very_slow: MovingAverage,
    zigzag: SwingPivotDetector,
    ledger: TradeLedger,
}

impl SignalEngine {
    pub fn new(config: TrendReversalConfig) -> anyhow::Result<Self> {
        let lookback = config.lookback.max(2);
        let close_ma = |period| MovingAverage::new(PriceField::Close, period, lookback);
        Ok(Self {
            fast: BarSeries::new(lookback),
            slow: BarSeries::new(lookback),
            trend: TrendClassifier::new(config.trend_fast_period, config.trend_slow_period, lookback)?,
            confirm_fast: close_ma(config.confirm_fast_period)?,
            confirm_slow: close_ma(config.confirm_slow_period)?,
            confirm_very_slow: close_ma(config.confirm_very_slow_period)?,
            zigzag: SwingPivotDetector::with_lookback(config.zigzag(), lookback),
            ledger: TradeLedger::new(),
            config,
        })
    }

    pub fn config(&self) -> &TrendReversalConfig {
        &self.config
    }

    pub fn fast_bars(&self) -> &BarSeries {
        &self.fast
    }

    pub fn slow_bars(&self) -> &BarSeries {
        &self.slow
    }

    pub fn trend(&self) -> &TrendClassifier {
        &self.trend
    }

    pub fn zigzag(&self) -> &SwingPivotDetector {
        &self.zigzag
    }

    /// Append a closed slow bar
    pub fn push_slow(&mut self, bar: &Bar) {
        self.trend.update(bar);
        self.zigzag.update(bar);
        self.slow.push(bar.clone());
    }

    /// Append a fast bar
    pub fn push_fast(&mut self, bar: &Bar) {
        self.confirm_fast.update(bar);
        self.confirm_slow.update(bar);
        self.confirm_very_slow.update(bar);
        self.fast.push(bar.clone());
    }

    /// Current-bar conditions, or `InsufficientHistory` while anything is warming up
    pub fn conditions(&self) -> Result<EntryConditions, SignalError> {
        let trend_now = self.trend.uptrend(&self.slow, 0)?;
        let trend_prev = self.trend.uptrend(&self.slow, -1)?;

        let slow_ma = self.trend.slow_ma();
        let cross_down = value(self.slow.close(-1), "slow close", -1)?
            > value(slow_ma.get(-1), "trend slow MA", -1)?
            && value(self.slow.close(0), "slow close", 0)?
                < value(slow_ma.get(0), "trend slow MA", 0)?;

        let confirmed = value(self.fast.close(0), "fast close", 0)?
            < value(self.confirm_very_slow.get(0), "confirm very slow MA", 0)?
            && value(self.confirm_fast.get(-1), "confirm fast MA", -1)?
                > value(self.confirm_slow.get(-1), "confirm slow MA", -1)?
            && value(self.confirm_fast.get(0), "confirm fast MA", 0)?
                < value(self.confirm_slow.get(0), "confirm slow MA", 0)?;

        Ok(EntryConditions {
            trend_ended: trend_prev && !trend_now,
            cross_down,
            confirmed,
        })
    }

    /// Gate a setup on reward/risk, then submit the sell and record the trade
    pub fn place_entry(
        &mut self,
        setup: EntrySetup,
        entry_dt: DateTime<Utc>,
        broker: &mut dyn Broker,
    ) -> Result<OrderId, SignalError> {
        let rr = setup.check(self.config.rr_min)?;

        let order_id = broker.submit_sell(self.config.order_size, OrderType::Market, setup.entry_price);
        self.ledger.record(
            Trade::short(entry_dt, setup.entry_price, setup.sl_price, setup.tp_price)
                .with_order_id(order_id),
        );

        info!(
            time = %entry_dt,
            entry = setup.entry_price,
            sl = setup.sl_price,
            tp = setup.tp_price,
            rr = format!("{:.2}", rr),
            order_id,
            "SHORT SIGNAL"
        );
        Ok(order_id)
    }

    fn evaluate(&mut self, broker: &mut dyn Broker) -> Result<Option<OrderId>, SignalError> {
        let conditions = self.conditions()?;
        if !conditions.all() {
            return Ok(None);
        }
        if broker.has_open_position() {
            debug!("Entry conditions met but a position is already open");
            return Ok(None);
        }

        let setup = EntrySetup::from_bars(
            &self.fast,
            self.config.entry_offset,
            self.config.take_profit_offset,
        )?;
        let entry_dt = self.fast.datetime(0).ok_or(SignalError::InsufficientHistory {
            series: "fast datetime",
            shift: 0,
        })?;
        self.place_entry(setup, entry_dt, broker).map(Some)
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }
}

fn value(v: Option<f64>, series: &'static str, shift: isize) -> Result<f64, SignalError> {
    v.ok_or(SignalError::InsufficientHistory { series, shift })
}

impl Strategy for SignalEngine {
    fn name(&self) -> &'static str {
        NAME
    }

    fn timeframes(&self) -> (&str, &str) {
        (&self.config.fast_timeframe, &self.config.slow_timeframe)
    }

    fn advance(&mut self, update: &BarUpdate<'_>) {
        for bar in update.slow {
            self.push_slow(bar);
        }
        self.push_fast(update.fast);
    }

    fn next(&mut self, broker: &mut dyn Broker) {
        match self.evaluate(broker) {
            Ok(_) => {}
            Err(e) if e.is_risk_rejection() => debug!(reason = %e, "Setup rejected"),
            Err(e) => debug!(reason = %e, "Skipping bar"),
        }
    }

    fn notify_order(&mut self, order: &Order) {
        let now = self
            .fast
            .datetime(0)
            .or_else(|| order.executed.as_ref().map(|e| e.datetime))
            .unwrap_or(order.created_time);

        if let Err(e) = self.ledger.on_order(order, now) {
            debug!(reason = %e, "Ignoring fill");
        }
    }

    fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    fn pivots(&self) -> &[Pivot] {
        self.zigzag.pivots()
    }

    fn init(&mut self) {
        info!(
            fast = %self.config.fast_timeframe,
            slow = %self.config.slow_timeframe,
            rr_min = self.config.rr_min,
            "Trend reversal strategy initialized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    #[derive(Default)]
    struct MockBroker {
        open: bool,
        submitted: Vec<(f64, OrderType, f64)>,
    }

    impl Broker for MockBroker {
        fn submit_sell(&mut self, size: f64, order_type: OrderType, price: f64) -> OrderId {
            self.submitted.push((size, order_type, price));
            self.submitted.len() as OrderId
        }

        fn has_open_position(&self) -> bool {
            self.open
        }
    }

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn setup(entry: f64, sl: f64, tp: f64) -> EntrySetup {
        EntrySetup {
            entry_price: entry,
            sl_price: sl,
            tp_price: tp,
        }
    }

    #[test]
    fn test_rr_below_minimum_places_nothing() {
        let mut engine = SignalEngine::new(TrendReversalConfig::default()).unwrap();
        let mut broker = MockBroker::default();

        let err = engine
            .place_entry(setup(1.2000, 1.2020, 1.1990), ts(), &mut broker)
            .unwrap_err();

        match err {
            SignalError::SubThresholdRiskReward { rr, min } => {
                assert_relative_eq!(rr, 0.5, epsilon = 1e-9);
                assert_eq!(min, 1.0);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(broker.submitted.is_empty());
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_rr_above_minimum_places_one_order() {
        let mut engine = SignalEngine::new(TrendReversalConfig::default()).unwrap();
        let mut broker = MockBroker::default();

        let id = engine
            .place_entry(setup(1.2000, 1.2005, 1.1990), ts(), &mut broker)
            .unwrap();

        assert_eq!(broker.submitted, vec![(1.0, OrderType::Market, 1.2000)]);
        assert_eq!(engine.ledger().len(), 1);
        let trade = engine.ledger().last().unwrap();
        assert_eq!(trade.entry_price, 1.2000);
        assert_eq!(trade.sl, 1.2005);
        assert_eq!(trade.tp, 1.1990);
        assert_eq!(trade.order_id, Some(id));
        assert!(trade.is_open());
    }

    #[test]
    fn test_degenerate_stop_is_rejected() {
        assert_eq!(
            setup(1.2000, 1.2000, 1.1990).check(1.0),
            Err(SignalError::DegenerateRiskDenominator {
                entry: 1.2000,
                stop: 1.2000
            })
        );
        assert!(setup(1.2000, 1.1995, 1.1990).risk_reward().is_err());
        assert!(setup(1.2000, 1.2000, 1.1990).check(-10.0).is_err());
    }

    #[test]
    fn test_setup_pricing_from_bars() {
        let mut fast = BarSeries::new(4);
        fast.push(Bar::new_unchecked(ts(), 1.2030, 1.2035, 1.2025, 1.2030));
        fast.push(Bar::new_unchecked(ts() + Duration::minutes(15), 1.2000, 1.2005, 1.1995, 1.2000));

        let priced = EntrySetup::from_bars(&fast, 0.0005, 0.0010).unwrap();
        assert_relative_eq!(priced.entry_price, 1.1990, epsilon = 1e-12);
        assert_relative_eq!(priced.sl_price, 1.2040, epsilon = 1e-12);
        assert_relative_eq!(priced.tp_price, 1.1980, epsilon = 1e-12);
    }

    #[test]
    fn test_setup_needs_previous_bar() {
        let mut fast = BarSeries::new(4);
        fast.push(Bar::new_unchecked(ts(), 1.2, 1.2, 1.2, 1.2));
        assert!(matches!(
            EntrySetup::from_bars(&fast, 0.0005, 0.0010),
            Err(SignalError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn test_no_evaluation_before_warmup() {
        let mut engine = SignalEngine::new(TrendReversalConfig::default()).unwrap();
        let mut broker = MockBroker::default();
        let bar = Bar::new_unchecked(ts(), 1.2, 1.2005, 1.1995, 1.2);
        let update = BarUpdate::new(&bar, std::slice::from_ref(&bar));

        engine.on_bar(&update, &mut broker);
        assert!(matches!(
            engine.conditions(),
            Err(SignalError::InsufficientHistory { .. })
        ));
        assert!(broker.submitted.is_empty());
    }
}
