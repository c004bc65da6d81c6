//! Recoverable evaluation outcomes
//!
//! None of these abort a run. The bar and fill hooks match on them, log at
//! debug level and move on to the next bar.

use thiserror::Error;

use crate::OrderId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("insufficient history for {series} at shift {shift}")]
    InsufficientHistory { series: &'static str, shift: isize },

    #[error("risk/reward {rr:.3} below minimum {min:.3}")]
    SubThresholdRiskReward { rr: f64, min: f64 },

    #[error("stop loss {stop} does not sit above entry {entry}")]
    DegenerateRiskDenominator { entry: f64, stop: f64 },

    #[error("fill for order {order_id} has no open trade")]
    OrphanFillNotification { order_id: OrderId },
}

impl SignalError {
    /// Rejections that mean "setup did not qualify" rather than "not enough data"
    pub fn is_risk_rejection(&self) -> bool {
        matches!(
            self,
            SignalError::SubThresholdRiskReward { .. } | SignalError::DegenerateRiskDenominator { .. }
        )
    }
}
