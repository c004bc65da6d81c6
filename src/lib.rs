//! Multi-timeframe Trend Reversal
//!
//! Signal engine for a short-only FX strategy: a slow-timeframe uptrend that
//! ends, confirmed by a fast-timeframe moving-average cross, entered when the
//! setup's reward/risk clears a minimum. Includes the streaming indicators it
//! is built on, a trade ledger, and a bar replay harness for backtests.

pub mod backtest;
pub mod broker;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod ledger;
pub mod multi_timeframe;
pub mod series;
pub mod strategies;
pub mod trend;
pub mod types;

pub use config::Config;
pub use error::SignalError;
pub use strategies::Strategy;
pub use types::*;
