//! Fast/slow timeframe pairing
//!
//! Holds the two bar streams of one symbol and replays them in timestamp
//! order. Each fast bar is delivered together with the slow bars that closed
//! since the previous fast bar (usually none or one), so slow-stream values
//! stay constant between slow closes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::Bar;

/// Which end of its interval a bar's timestamp marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarTimestamp {
    /// Stamped at the interval start (exchange kline convention)
    Open,
    /// Stamped at the interval end
    #[default]
    Close,
}

/// Bars handed to a strategy for one fast-timeframe step
#[derive(Debug, Clone, Copy)]
pub struct BarUpdate<'a> {
    pub fast: &'a Bar,
    /// Slow bars that closed at or before this fast bar's close
    pub slow: &'a [Bar],
}

impl<'a> BarUpdate<'a> {
    pub fn new(fast: &'a Bar, slow: &'a [Bar]) -> Self {
        Self { fast, slow }
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.fast.datetime
    }
}

/// Fast and slow bar streams for one symbol
#[derive(Debug, Clone)]
pub struct TimeframePair {
    pub fast_timeframe: String,
    pub slow_timeframe: String,
    pub fast: Vec<Bar>,
    pub slow: Vec<Bar>,
}

impl TimeframePair {
    pub fn new(
        fast_timeframe: impl Into<String>,
        slow_timeframe: impl Into<String>,
        fast: Vec<Bar>,
        slow: Vec<Bar>,
    ) -> Self {
        Self {
            fast_timeframe: fast_timeframe.into(),
            slow_timeframe: slow_timeframe.into(),
            fast,
            slow,
        }
    }

    /// Clip both streams to their common date range
    pub fn align(mut self) -> Self {
        let (Some(fast_first), Some(fast_last), Some(slow_first), Some(slow_last)) = (
            self.fast.first().map(|b| b.datetime),
            self.fast.last().map(|b| b.datetime),
            self.slow.first().map(|b| b.datetime),
            self.slow.last().map(|b| b.datetime),
        ) else {
            self.fast.clear();
            self.slow.clear();
            return self;
        };

        let start = fast_first.max(slow_first);
        let end = fast_last.min(slow_last);
        self.fast.retain(|b| b.datetime >= start && b.datetime <= end);
        self.slow.retain(|b| b.datetime >= start && b.datetime <= end);
        self
    }

    pub fn len(&self) -> usize {
        self.fast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fast.is_empty()
    }

    /// Replay the pair in fast-bar order
    pub fn updates(&self, stamps: BarTimestamp) -> BarUpdates<'_> {
        let slow_lag = match stamps {
            BarTimestamp::Close => Duration::zero(),
            BarTimestamp::Open => {
                let fast = timeframe_duration(&self.fast_timeframe).unwrap_or_else(Duration::zero);
                let slow = timeframe_duration(&self.slow_timeframe).unwrap_or_else(Duration::zero);
                slow - fast
            }
        };
        BarUpdates {
            pair: self,
            slow_lag,
            fast_idx: 0,
            slow_idx: 0,
        }
    }
}

/// Iterator over [`BarUpdate`]s of a [`TimeframePair`]
#[derive(Debug)]
pub struct BarUpdates<'a> {
    pair: &'a TimeframePair,
    slow_lag: Duration,
    fast_idx: usize,
    slow_idx: usize,
}

impl<'a> Iterator for BarUpdates<'a> {
    type Item = BarUpdate<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let fast = self.pair.fast.get(self.fast_idx)?;
        self.fast_idx += 1;

        let start = self.slow_idx;
        while let Some(slow) = self.pair.slow.get(self.slow_idx) {
            if slow.datetime + self.slow_lag > fast.datetime {
                break;
            }
            self.slow_idx += 1;
        }

        Some(BarUpdate::new(fast, &self.pair.slow[start..self.slow_idx]))
    }
}

/// Parse an interval string ("15m", "1h", "1d", ...) into a duration
pub fn timeframe_duration(timeframe: &str) -> Option<Duration> {
    let split = timeframe.find(|c: char| !c.is_ascii_digit())?;
    let (count, unit) = timeframe.split_at(split);
    let count: i64 = count.parse().ok()?;

    match unit {
        "m" => Some(Duration::minutes(count)),
        "h" => Some(Duration::hours(count)),
        "d" => Some(Duration::days(count)),
        "w" => Some(Duration::weeks(count)),
        _ => None,
    }
}
