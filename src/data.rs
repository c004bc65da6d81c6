//! Bar data loading
//!
//! Reads OHLC bars from `{data_dir}/{symbol}_{timeframe}.csv` and builds the
//! fast/slow pair the replay consumes.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

use crate::multi_timeframe::{timeframe_duration, TimeframePair};
use crate::Bar;

/// Intervals accepted for data files
pub const INTERVALS: &[&str] = &[
    "1m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "1w",
];

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>().ok().or_else(|| {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|ndt| ndt.and_utc())
    })
}

fn field(record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64> {
    record
        .get(idx)
        .with_context(|| format!("Missing {} column", name))?
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse {}", name))
}

/// Load OHLC bars from a CSV file (`datetime,open,high,low,close[,volume]`).
///
/// Rows that parse but fail bar validation are skipped with a warning. Bars
/// are returned in timestamp order.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut bars = Vec::new();
    let mut invalid_count = 0usize;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let dt_str = record.get(0).context("Missing datetime column")?.trim();
        let datetime = parse_datetime(dt_str)
            .with_context(|| format!("Failed to parse datetime: {}", dt_str))?;

        let open = field(&record, 1, "open")?;
        let high = field(&record, 2, "high")?;
        let low = field(&record, 3, "low")?;
        let close = field(&record, 4, "close")?;

        match Bar::new(datetime, open, high, low, close) {
            Ok(bar) => bars.push(bar),
            Err(e) => {
                invalid_count += 1;
                warn!(
                    "Skipping invalid bar at row {} in {:?}: {}",
                    row_idx + 2,
                    path.file_name().unwrap_or_default(),
                    e
                );
            }
        }
    }

    if invalid_count > 0 {
        warn!(
            "Skipped {} invalid bars out of {} in {:?}",
            invalid_count,
            invalid_count + bars.len(),
            path.file_name().unwrap_or_default()
        );
    }

    bars.sort_by_key(|b| b.datetime);
    Ok(bars)
}

/// Keep bars within `[start, end]`
pub fn filter_bars_by_date(
    bars: Vec<Bar>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| start.is_none_or(|s| b.datetime >= s) && end.is_none_or(|e| b.datetime <= e))
        .collect()
}

/// Parse a date string (RFC 3339, YYYY-MM-DD HH:MM:SS or YYYY-MM-DD) to DateTime<Utc>
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    if let Some(dt) = parse_datetime(date_str) {
        return Ok(dt);
    }

    if let Some(ndt) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .ok()
        .and_then(|nd| nd.and_hms_opt(0, 0, 0))
    {
        return Ok(ndt.and_utc());
    }

    anyhow::bail!(
        "Failed to parse date: {}. Use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS format",
        date_str
    )
}

/// Load both timeframes of a symbol, date-filtered and clipped to their common range
pub fn load_timeframe_pair(
    data_dir: impl AsRef<Path>,
    symbol: &str,
    fast_timeframe: &str,
    slow_timeframe: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<TimeframePair> {
    let fast_len = timeframe_duration(fast_timeframe)
        .with_context(|| format!("Unsupported fast timeframe: {}", fast_timeframe))?;
    let slow_len = timeframe_duration(slow_timeframe)
        .with_context(|| format!("Unsupported slow timeframe: {}", slow_timeframe))?;
    anyhow::ensure!(
        fast_len < slow_len,
        "Fast timeframe {} must be shorter than slow timeframe {}",
        fast_timeframe,
        slow_timeframe
    );
    for tf in [fast_timeframe, slow_timeframe] {
        if !INTERVALS.contains(&tf) {
            warn!("Non-standard interval: {}", tf);
        }
    }

    let load = |timeframe: &str| -> Result<Vec<Bar>> {
        let path = data_dir
            .as_ref()
            .join(format!("{}_{}.csv", symbol, timeframe));
        let bars = load_csv(&path)
            .with_context(|| format!("Failed to load {} data for {}", timeframe, symbol))?;
        info!("Loaded {} {} bars for {}", bars.len(), timeframe, symbol);
        Ok(filter_bars_by_date(bars, start, end))
    };

    let pair = TimeframePair::new(
        fast_timeframe,
        slow_timeframe,
        load(fast_timeframe)?,
        load(slow_timeframe)?,
    )
    .align();

    if pair.is_empty() {
        anyhow::bail!(
            "No overlapping {}/{} data for {}",
            fast_timeframe,
            slow_timeframe,
            symbol
        );
    }
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const FAST_CSV: &str = "datetime,open,high,low,close,volume
2024-01-01 00:15:00,1.1000,1.1010,1.0990,1.1005,100
2024-01-01 00:30:00,1.1005,1.1015,1.0995,1.1010,100
2024-01-01 00:45:00,1.1010,1.1000,1.1020,1.1015,100
2024-01-01 01:00:00,1.1015,1.1025,1.1005,1.1020,100
2024-01-01 01:15:00,1.1020,1.1030,1.1010,1.1025,100
";

    const SLOW_CSV: &str = "datetime,open,high,low,close
2024-01-01T01:00:00Z,1.1000,1.1025,1.0990,1.1020
2024-01-01T02:00:00Z,1.1020,1.1040,1.1010,1.1030
";

    #[test]
    fn test_load_csv_skips_invalid_bars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EURUSD_15m.csv");
        fs::write(&path, FAST_CSV).unwrap();

        let bars = load_csv(&path).unwrap();
        // row 3 has high < low
        assert_eq!(bars.len(), 4);
        assert_eq!(bars[0].close, 1.1005);
        assert_eq!(bars[2].datetime, parse_date("2024-01-01 01:00:00").unwrap());
    }

    #[test]
    fn test_load_csv_rejects_unparsable_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "datetime,open,high,low,close\nyesterday,1,1,1,1\n").unwrap();

        let err = load_csv(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse datetime"));
    }

    #[test]
    fn test_parse_date_formats() {
        let day = parse_date("2024-01-01").unwrap();
        assert_eq!(parse_date("2024-01-01 00:00:00").unwrap(), day);
        assert_eq!(parse_date("2024-01-01T00:00:00Z").unwrap(), day);
        assert!(parse_date("01/01/2024").is_err());
    }

    #[test]
    fn test_filter_bars_by_date() {
        let start = parse_date("2024-01-01").unwrap();
        let bars: Vec<Bar> = (0..5)
            .map(|i| Bar::new_unchecked(start + chrono::Duration::days(i), 1.0, 1.0, 1.0, 1.0))
            .collect();

        let filtered = filter_bars_by_date(
            bars,
            Some(parse_date("2024-01-02").unwrap()),
            Some(parse_date("2024-01-04").unwrap()),
        );
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_load_timeframe_pair() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("EURUSD_15m.csv"), FAST_CSV).unwrap();
        fs::write(dir.path().join("EURUSD_1h.csv"), SLOW_CSV).unwrap();

        let pair = load_timeframe_pair(dir.path(), "EURUSD", "15m", "1h", None, None).unwrap();
        // fast clipped to [01:00, 01:15]
        assert_eq!(pair.fast.len(), 2);
        assert_eq!(pair.slow.len(), 1);
        assert_eq!(pair.fast_timeframe, "15m");
    }

    #[test]
    fn test_load_timeframe_pair_rejects_inverted_timeframes() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_timeframe_pair(dir.path(), "EURUSD", "1h", "15m", None, None).is_err());
    }
}
