//! Technical indicators
//!
//! Streaming indicators fed one bar at a time, plus a batch SMA over a
//! slice. Averages come from the `ta` crate.

mod moving_average;
mod zigzag;

pub use moving_average::MovingAverage;
pub use zigzag::{Pivot, PivotDirection, SwingAnchor, SwingPivotDetector, SwingTrend, ZigZagParams};

use ta::indicators::SimpleMovingAverage;
use ta::Next;

/// Calculate Simple Moving Average over a whole slice
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut indicator = match SimpleMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let mean = indicator.next(value);
            (i + 1 >= period).then_some(mean)
        })
        .collect()
}
