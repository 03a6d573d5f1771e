//! Order status in the trigger/dispatch lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an order.
///
/// `pending_trigger -> triggered -> submitting -> completed` is the happy
/// path. `failed` and `cancelled` are the other terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Waiting for its price or schedule condition.
    PendingTrigger,
    /// Condition satisfied, waiting for a dispatcher.
    Triggered,
    /// A dispatcher owns the order and is talking to the venue.
    Submitting,
    /// Executed at the venue.
    Completed,
    /// Gave up (quota, venue rejection, or retries exhausted).
    Failed,
    /// Cancelled by the owner before dispatch.
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::PendingTrigger,
        Self::Triggered,
        Self::Submitting,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    /// Returns true if the order can never change status again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if a cancel request may be honored.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        matches!(self, Self::PendingTrigger | Self::Triggered)
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingTrigger => "pending_trigger",
            Self::Triggered => "triggered",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}
