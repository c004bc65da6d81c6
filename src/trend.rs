//! Moving-average trend classification
//!
//! A stream is in an uptrend at `shift` when its fast average is above its
//! slow average and the close is above the slow average. The answer is
//! recomputed from the stored indicator history on every query.

use anyhow::Result;

use crate::error::SignalError;
use crate::indicators::MovingAverage;
use crate::series::BarSeries;
use crate::{Bar, PriceField};

#[derive(Debug, Clone)]
pub struct TrendClassifier {
    fast_ma: MovingAverage,
    slow_ma: MovingAverage,
}

impl TrendClassifier {
    pub fn new(fast_period: usize, slow_period: usize, lookback: usize) -> Result<Self> {
        Ok(Self {
            fast_ma: MovingAverage::new(PriceField::Close, fast_period, lookback)?,
            slow_ma: MovingAverage::new(PriceField::Close, slow_period, lookback)?,
        })
    }

    /// Advance both averages by one bar of the classified stream
    pub fn update(&mut self, bar: &Bar) {
        self.fast_ma.update(bar);
        self.slow_ma.update(bar);
    }

    /// Trend at `shift`, or `InsufficientHistory` while any input is undefined
    pub fn uptrend(&self, bars: &BarSeries, shift: isize) -> Result<bool, SignalError> {
        let missing = |series| SignalError::InsufficientHistory { series, shift };

        let fast = self.fast_ma.get(shift).ok_or_else(|| missing("trend fast MA"))?;
        let slow = self.slow_ma.get(shift).ok_or_else(|| missing("trend slow MA"))?;
        let close = bars.close(shift).ok_or_else(|| missing("trend close"))?;

        Ok(fast > slow && close > slow)
    }

    /// Same as [`uptrend`](Self::uptrend) with undefined history read as `false`
    pub fn is_uptrend(&self, bars: &BarSeries, shift: isize) -> bool {
        self.uptrend(bars, shift).unwrap_or(false)
    }

    pub fn fast_ma(&self) -> &MovingAverage {
        &self.fast_ma
    }

    pub fn slow_ma(&self) -> &MovingAverage {
        &self.slow_ma
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn feed(classifier: &mut TrendClassifier, bars: &mut BarSeries, closes: &[f64]) {
        let start: DateTime<Utc> = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        for &c in closes {
            let dt = start + Duration::hours(bars.len() as i64);
            let bar = Bar::new_unchecked(dt, c, c + 0.0005, c - 0.0005, c);
            classifier.update(&bar);
            bars.push(bar);
        }
    }

    #[test]
    fn test_false_before_warmup() {
        let mut classifier = TrendClassifier::new(24, 96, 256).unwrap();
        let mut bars = BarSeries::default();

        for i in 0..95 {
            feed(&mut classifier, &mut bars, &[1.0 + i as f64 * 0.001]);
            assert!(!classifier.is_uptrend(&bars, 0));
            assert!(!classifier.is_uptrend(&bars, -1));
            assert!(matches!(
                classifier.uptrend(&bars, 0),
                Err(SignalError::InsufficientHistory { .. })
            ));
        }

        feed(&mut classifier, &mut bars, &[1.2]);
        assert!(classifier.is_uptrend(&bars, 0));
        assert!(classifier.uptrend(&bars, -1).is_err());
    }

    #[test]
    fn test_rising_then_falling() {
        let mut classifier = TrendClassifier::new(2, 3, 16).unwrap();
        let mut bars = BarSeries::new(16);
        feed(&mut classifier, &mut bars, &[1.2000, 1.2010, 1.2020, 1.2030]);

        assert_eq!(classifier.uptrend(&bars, 0), Ok(true));
        assert_eq!(classifier.uptrend(&bars, -1), Ok(true));

        feed(&mut classifier, &mut bars, &[1.2000]);
        assert_eq!(classifier.uptrend(&bars, 0), Ok(false));
        assert_eq!(classifier.uptrend(&bars, -1), Ok(true));
    }

    #[test]
    fn test_close_below_slow_is_not_uptrend() {
        let mut classifier = TrendClassifier::new(2, 4, 16).unwrap();
        let mut bars = BarSeries::new(16);
        // fast MA stays above slow MA but the last close dips under it
        feed(&mut classifier, &mut bars, &[1.0, 1.0, 1.3, 1.04]);

        let fast = classifier.fast_ma().get(0).unwrap();
        let slow = classifier.slow_ma().get(0).unwrap();
        assert!(fast > slow);
        assert!(bars.close(0).unwrap() < slow);
        assert!(!classifier.is_uptrend(&bars, 0));
    }
}
