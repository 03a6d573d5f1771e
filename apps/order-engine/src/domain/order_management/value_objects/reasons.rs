//! Reasons recorded on status transitions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::Timestamp;

/// Why an order moved to `triggered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerReason {
    /// Market order, fires unconditionally.
    Market,
    /// Limit price reached.
    LimitReached {
        /// Observed price.
        price: Decimal,
    },
    /// Stop price crossed (stop-loss order or OCO stop leg).
    StopHit {
        /// Observed price.
        price: Decimal,
    },
    /// OCO take-profit leg crossed.
    TakeProfitHit {
        /// Observed price.
        price: Decimal,
    },
    /// Price fell the trailing gap below the watermark.
    TrailingStopHit {
        /// Observed price.
        price: Decimal,
        /// Watermark at the time of firing.
        highest_price: Decimal,
    },
    /// Recurrence schedule reached.
    ScheduleDue {
        /// Occurrence time that became due.
        scheduled_for: Timestamp,
    },
}

impl TriggerReason {
    /// Price observation that caused the trigger, if price-based.
    #[must_use]
    pub const fn price(&self) -> Option<Decimal> {
        match self {
            Self::LimitReached { price }
            | Self::StopHit { price }
            | Self::TakeProfitHit { price }
            | Self::TrailingStopHit { price, .. } => Some(*price),
            Self::Market | Self::ScheduleDue { .. } => None,
        }
    }

    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::LimitReached { .. } => "limit",
            Self::StopHit { .. } => "stop",
            Self::TakeProfitHit { .. } => "take_profit",
            Self::TrailingStopHit { .. } => "trailing_stop",
            Self::ScheduleDue { .. } => "schedule",
        }
    }
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.price() {
            Some(price) => write!(f, "{} at {price}", self.label()),
            None => f.write_str(self.label()),
        }
    }
}

/// Why an order ended in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// A hard quota limit denied the reservation. No venue call was made.
    QuotaExceeded {
        /// Human-readable detail.
        message: String,
    },
    /// The venue rejected the order as invalid.
    VenueRejected {
        /// Venue error text.
        message: String,
    },
    /// Every permitted attempt failed transiently.
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Error text of the final attempt.
        last_error: String,
    },
}

impl FailureReason {
    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::VenueRejected { .. } => "venue_rejected",
            Self::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExceeded { message } => write!(f, "QuotaExceeded: {message}"),
            Self::VenueRejected { message } => write!(f, "VenueRejected: {message}"),
            Self::RetriesExhausted {
                attempts,
                last_error,
            } => write!(
                f,
                "RetriesExhausted after {attempts} attempts: {last_error}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn trigger_reason_price() {
        assert_eq!(
            TriggerReason::TakeProfitHit { price: dec!(0.86) }.price(),
            Some(dec!(0.86))
        );
        assert_eq!(TriggerReason::Market.price(), None);
    }

    #[test]
    fn failure_reason_display() {
        let reason = FailureReason::RetriesExhausted {
            attempts: 5,
            last_error: "timeout".to_string(),
        };
        assert_eq!(reason.to_string(), "RetriesExhausted after 5 attempts: timeout");
        assert_eq!(reason.label(), "retries_exhausted");
    }
}
