//! Bounded, shift-indexed history
//!
//! Every per-bar series here is addressed the same way: shift `0` is the
//! current bar, `-1` the bar before it and so on. Only the most recent
//! `capacity` entries are retained. Anything outside that window, or any
//! positive shift, reads as `None` instead of panicking.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::{Bar, PriceField};

/// Default number of bars retained per series
pub const DEFAULT_LOOKBACK: usize = 512;

/// Map a shift onto a position inside a deque of `len` retained items
fn slot(shift: isize, len: usize) -> Option<usize> {
    if shift > 0 {
        return None;
    }
    let back = shift.unsigned_abs();
    if back >= len {
        return None;
    }
    Some(len - 1 - back)
}

/// Append-only OHLC history for one timeframe
#[derive(Debug, Clone)]
pub struct BarSeries {
    bars: VecDeque<Bar>,
    capacity: usize,
    count: usize,
}

impl BarSeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
            count: 0,
        }
    }

    /// Append a bar and return its absolute index (0-based since series start)
    pub fn push(&mut self, bar: Bar) -> usize {
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
        self.count += 1;
        self.count - 1
    }

    /// Total bars seen, including those no longer retained
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Absolute index of the current bar
    pub fn current_index(&self) -> Option<usize> {
        self.count.checked_sub(1)
    }

    pub fn get(&self, shift: isize) -> Option<&Bar> {
        slot(shift, self.bars.len()).and_then(|i| self.bars.get(i))
    }

    pub fn price(&self, field: PriceField, shift: isize) -> Option<f64> {
        self.get(shift).map(|b| b.price(field))
    }

    pub fn high(&self, shift: isize) -> Option<f64> {
        self.price(PriceField::High, shift)
    }

    pub fn low(&self, shift: isize) -> Option<f64> {
        self.price(PriceField::Low, shift)
    }

    pub fn close(&self, shift: isize) -> Option<f64> {
        self.price(PriceField::Close, shift)
    }

    pub fn datetime(&self, shift: isize) -> Option<DateTime<Utc>> {
        self.get(shift).map(|b| b.datetime)
    }
}

impl Default for BarSeries {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK)
    }
}

/// Computed values aligned 1:1 with bar index.
///
/// A bar with no defined value (warm-up, or no pivot on that bar) stores
/// `None`; it is never coerced to zero.
#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    values: VecDeque<Option<f64>>,
    capacity: usize,
    count: usize,
}

impl IndicatorSeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            count: 0,
        }
    }

    pub fn push(&mut self, value: Option<f64>) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.count += 1;
    }

    /// Overwrite the value stored for the current bar
    pub fn set_current(&mut self, value: Option<f64>) {
        if let Some(last) = self.values.back_mut() {
            *last = value;
        }
    }

    pub fn get(&self, shift: isize) -> Option<f64> {
        slot(shift, self.values.len()).and_then(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for IndicatorSeries {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK)
    }
}
