//! Swing pivot ("ZigZag") detector
//!
//! Tracks the last confirmed swing extreme of one bar stream. A new pivot is
//! confirmed once price moves at least `deviation` basis points away from the
//! previous one:
//!
//! ```text
//! up_dev   = (high - pivot) / pivot * 10000
//! down_dev = (pivot - low)  / pivot * 10000
//! ```
//!
//! The up and down checks are two independent guards evaluated in that order
//! against the trend at the start of the bar. While the trend is still
//! undefined both may fire on the same bar, in which case the down pivot wins.

use serde::{Deserialize, Serialize};

use crate::series::{IndicatorSeries, DEFAULT_LOOKBACK};
use crate::Bar;

/// Detector parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZigZagParams {
    /// Warm-up: evaluation starts once `depth + 2` bars have been seen
    pub depth: usize,
    /// Minimum move from the last pivot, in basis points
    pub deviation: f64,
    /// Accepted for configuration compatibility; has no effect on detection
    pub backstep: usize,
}

impl Default for ZigZagParams {
    fn default() -> Self {
        Self {
            depth: 24,
            deviation: 8.0,
            backstep: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SwingTrend {
    #[default]
    Undefined,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotDirection {
    Up,
    Down,
}

/// Reference point the next move is measured from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingAnchor {
    pub index: usize,
    pub price: f64,
}

/// A confirmed swing extreme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub index: usize,
    pub price: f64,
    pub direction: PivotDirection,
}

#[derive(Debug, Clone)]
pub struct SwingPivotDetector {
    params: ZigZagParams,
    bars_seen: usize,
    last_pivot: Option<SwingAnchor>,
    trend: SwingTrend,
    output: IndicatorSeries,
    pivots: Vec<Pivot>,
}

impl SwingPivotDetector {
    pub fn new(params: ZigZagParams) -> Self {
        Self::with_lookback(params, DEFAULT_LOOKBACK)
    }

    pub fn with_lookback(params: ZigZagParams, lookback: usize) -> Self {
        Self {
            params,
            bars_seen: 0,
            last_pivot: None,
            trend: SwingTrend::Undefined,
            output: IndicatorSeries::new(lookback),
            pivots: Vec::new(),
        }
    }

    /// Bars required before the first evaluation
    pub fn warmup(&self) -> usize {
        self.params.depth + 2
    }

    /// Feed the next bar. Returns the pivot confirmed on it, if any.
    pub fn update(&mut self, bar: &Bar) -> Option<Pivot> {
        let index = self.bars_seen;
        self.bars_seen += 1;
        self.output.push(None);

        if self.bars_seen < self.warmup() {
            return None;
        }

        let anchor = match self.last_pivot {
            Some(anchor) => anchor,
            None => {
                self.last_pivot = Some(SwingAnchor {
                    index,
                    price: bar.close,
                });
                return None;
            }
        };

        let up_dev = (bar.high - anchor.price) / anchor.price * 10_000.0;
        let down_dev = (anchor.price - bar.low) / anchor.price * 10_000.0;
        let trend = self.trend;
        let mut confirmed = None;

        if matches!(trend, SwingTrend::Up | SwingTrend::Undefined) && up_dev >= self.params.deviation {
            self.trend = SwingTrend::Up;
            self.last_pivot = Some(SwingAnchor {
                index,
                price: bar.high,
            });
            confirmed = Some(Pivot {
                index,
                price: bar.high,
                direction: PivotDirection::Up,
            });
        }

        if matches!(trend, SwingTrend::Down | SwingTrend::Undefined)
            && down_dev >= self.params.deviation
        {
            self.trend = SwingTrend::Down;
            self.last_pivot = Some(SwingAnchor {
                index,
                price: bar.low,
            });
            confirmed = Some(Pivot {
                index,
                price: bar.low,
                direction: PivotDirection::Down,
            });
        }

        if let Some(pivot) = confirmed {
            self.output.set_current(Some(pivot.price));
            self.pivots.push(pivot);
            tracing::debug!(
                index = pivot.index,
                price = pivot.price,
                direction = ?pivot.direction,
                "Swing pivot confirmed"
            );
        }

        confirmed
    }

    /// Pivot value emitted on the bar at `shift`, if one was
    pub fn value(&self, shift: isize) -> Option<f64> {
        self.output.get(shift)
    }

    pub fn last_pivot(&self) -> Option<SwingAnchor> {
        self.last_pivot
    }

    pub fn trend(&self) -> SwingTrend {
        self.trend
    }

    /// Every pivot confirmed so far, in bar order
    pub fn pivots(&self) -> &[Pivot] {
        &self.pivots
    }

    pub fn params(&self) -> &ZigZagParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn bar(i: i64, high: f64, low: f64, close: f64) -> Bar {
        let dt = DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::hours(i);
        Bar::new_unchecked(dt, close, high, low, close)
    }

    /// Detector with no warm-up beyond the seed bar, anchored at 1.0000
    fn seeded(deviation: f64) -> SwingPivotDetector {
        let mut zz = SwingPivotDetector::new(ZigZagParams {
            depth: 0,
            deviation,
            backstep: 6,
        });
        zz.update(&bar(0, 1.0, 1.0, 1.0));
        zz.update(&bar(1, 1.0, 1.0, 1.0));
        assert_eq!(
            zz.last_pivot(),
            Some(SwingAnchor {
                index: 1,
                price: 1.0
            })
        );
        zz
    }

    #[test]
    fn test_no_evaluation_during_warmup() {
        let mut zz = SwingPivotDetector::new(ZigZagParams::default());
        for i in 0..25 {
            assert!(zz.update(&bar(i, 2.0, 0.5, 1.0)).is_none());
        }
        assert!(zz.last_pivot().is_none());
        zz.update(&bar(25, 1.0, 1.0, 1.0));
        assert_eq!(zz.last_pivot().map(|a| a.index), Some(25));
    }

    #[test]
    fn test_up_pivot_at_threshold() {
        let mut zz = seeded(8.0);
        let pivot = zz.update(&bar(2, 1.00081, 1.0, 1.0005)).unwrap();

        assert_eq!(pivot.direction, PivotDirection::Up);
        assert_eq!(pivot.price, 1.00081);
        assert_eq!(zz.trend(), SwingTrend::Up);
        assert_eq!(zz.value(0), Some(1.00081));
    }

    #[test]
    fn test_below_threshold_emits_nothing() {
        let mut zz = seeded(8.0);
        assert!(zz.update(&bar(2, 1.00079, 1.0, 1.0005)).is_none());
        assert_eq!(zz.trend(), SwingTrend::Undefined);
        assert_eq!(zz.value(0), None);
        assert_eq!(zz.last_pivot().map(|a| a.price), Some(1.0));
    }

    #[test]
    fn test_simultaneous_up_and_down_while_undefined() {
        let mut zz = seeded(8.0);
        let pivot = zz.update(&bar(2, 1.0010, 0.9990, 1.0)).unwrap();

        assert_eq!(pivot.direction, PivotDirection::Down);
        assert_eq!(pivot.price, 0.9990);
        assert_eq!(zz.trend(), SwingTrend::Down);
        assert_eq!(zz.value(0), Some(0.9990));
        assert_eq!(zz.pivots().len(), 1);
    }

    #[test]
    fn test_up_trend_ignores_down_move_until_threshold() {
        let mut zz = seeded(8.0);
        zz.update(&bar(2, 1.0010, 1.0, 1.0005));
        assert_eq!(zz.trend(), SwingTrend::Up);

        // trend Up: only the up guard is live
        assert!(zz.update(&bar(3, 1.0005, 0.9950, 0.9960)).is_none());
        assert_eq!(zz.trend(), SwingTrend::Up);

        let pivot = zz.update(&bar(4, 1.0030, 1.0010, 1.0020)).unwrap();
        assert_eq!(pivot.direction, PivotDirection::Up);
        assert_eq!(zz.last_pivot().map(|a| a.index), Some(4));
    }

    #[test]
    fn test_down_trend_only_extends_lower() {
        let mut zz = seeded(8.0);
        zz.update(&bar(2, 1.0, 0.9990, 0.9995));
        assert_eq!(zz.trend(), SwingTrend::Down);

        assert!(zz.update(&bar(3, 1.0100, 0.9990, 1.0050)).is_none());
        let pivot = zz.update(&bar(4, 0.9985, 0.9970, 0.9975)).unwrap();
        assert_eq!(pivot.price, 0.9970);
        assert_eq!(pivot.direction, PivotDirection::Down);
    }

    #[test]
    fn test_pivot_indices_strictly_increase() {
        let mut zz = SwingPivotDetector::new(ZigZagParams {
            depth: 2,
            deviation: 5.0,
            backstep: 6,
        });
        for i in 0..200 {
            let base = 1.10 + ((i * 37) % 23) as f64 * 0.0004 - ((i * 13) % 7) as f64 * 0.0006;
            zz.update(&bar(i, base + 0.0006, base - 0.0006, base));
        }

        let pivots = zz.pivots();
        assert!(!pivots.is_empty());
        for pair in pivots.windows(2) {
            assert!(pair[1].index > pair[0].index);
        }
    }

    #[test]
    fn test_backstep_is_inert() {
        let mut a = seeded(8.0);
        let mut b = SwingPivotDetector::new(ZigZagParams {
            depth: 0,
            deviation: 8.0,
            backstep: 50,
        });
        b.update(&bar(0, 1.0, 1.0, 1.0));
        b.update(&bar(1, 1.0, 1.0, 1.0));

        for i in 2..20 {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            let px = 1.0 + sign * 0.0002 * i as f64;
            let next = bar(i, px + 0.001, px - 0.001, px);
            assert_eq!(a.update(&next), b.update(&next));
        }
    }
}
