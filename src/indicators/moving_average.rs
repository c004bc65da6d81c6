use anyhow::{anyhow, Result};
use ta::indicators::SimpleMovingAverage;
use ta::Next;

use crate::series::{IndicatorSeries, DEFAULT_LOOKBACK};
use crate::{Bar, PriceField};

/// Rolling arithmetic mean of one bar field, backed by `ta`.
///
/// Undefined until `period` bars have been fed.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    field: PriceField,
    period: usize,
    sma: SimpleMovingAverage,
    seen: usize,
    values: IndicatorSeries,
}

impl MovingAverage {
    pub fn new(field: PriceField, period: usize, lookback: usize) -> Result<Self> {
        let sma = SimpleMovingAverage::new(period)
            .map_err(|e| anyhow!("Invalid SMA period {}: {:?}", period, e))?;
        Ok(Self {
            field,
            period,
            sma,
            seen: 0,
            values: IndicatorSeries::new(lookback),
        })
    }

    /// Close-price average with the default history length
    pub fn close(period: usize) -> Result<Self> {
        Self::new(PriceField::Close, period, DEFAULT_LOOKBACK)
    }

    /// Feed the next bar and return the value at shift 0
    pub fn update(&mut self, bar: &Bar) -> Option<f64> {
        // ta averages over a partial window during warm-up; hide those
        let mean = self.sma.next(bar.price(self.field));
        self.seen += 1;

        let value = (self.seen >= self.period).then_some(mean);
        self.values.push(value);
        value
    }

    pub fn get(&self, shift: isize) -> Option<f64> {
        self.values.get(shift)
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn field(&self) -> PriceField {
        self.field
    }

    pub fn is_ready(&self) -> bool {
        self.seen >= self.period
    }
}
