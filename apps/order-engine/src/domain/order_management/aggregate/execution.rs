//! OrderExecution - one attempt to realize an order at the venue.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::order_management::errors::OrderError;
use crate::domain::shared::{OrderId, ProviderOrderId, Timestamp};

/// Status of a single execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Venue call outstanding.
    InFlight,
    /// Venue confirmed execution.
    Completed,
    /// Venue call failed.
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InFlight => write!(f, "in_flight"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Economics the venue reported for a successful execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFill {
    /// Venue-assigned order id.
    pub provider_order_id: ProviderOrderId,
    /// Amount actually executed.
    pub executed_amount: Decimal,
    /// Average execution price.
    pub executed_price: Decimal,
    /// Fees charged.
    pub fees: Decimal,
    /// Currency of the fees, if reported.
    pub fee_currency: Option<String>,
}

/// One attempt to execute an order. Attempt numbers start at 1 and are
/// contiguous per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExecution {
    order_id: OrderId,
    attempt_number: u32,
    status: ExecutionStatus,
    fill: Option<ExecutionFill>,
    error: Option<String>,
    started_at: Timestamp,
    completed_at: Option<Timestamp>,
}

impl OrderExecution {
    /// Start a new in-flight attempt.
    #[must_use]
    pub const fn start(order_id: OrderId, attempt_number: u32, started_at: Timestamp) -> Self {
        Self {
            order_id,
            attempt_number,
            status: ExecutionStatus::InFlight,
            fill: None,
            error: None,
            started_at,
            completed_at: None,
        }
    }

    /// Mark the attempt completed with the venue's fill.
    ///
    /// # Errors
    ///
    /// Returns error if the attempt is no longer in flight.
    pub fn complete(&mut self, fill: ExecutionFill, now: Timestamp) -> Result<(), OrderError> {
        self.ensure_in_flight()?;
        self.status = ExecutionStatus::Completed;
        self.fill = Some(fill);
        self.completed_at = Some(now);
        Ok(())
    }

    /// Mark the attempt failed with the venue's error text.
    ///
    /// # Errors
    ///
    /// Returns error if the attempt is no longer in flight.
    pub fn fail(&mut self, error: impl Into<String>, now: Timestamp) -> Result<(), OrderError> {
        self.ensure_in_flight()?;
        self.status = ExecutionStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(now);
        Ok(())
    }

    fn ensure_in_flight(&self) -> Result<(), OrderError> {
        if self.status == ExecutionStatus::InFlight {
            Ok(())
        } else {
            Err(OrderError::AttemptNotInFlight {
                order_id: self.order_id.to_string(),
                attempt: self.attempt_number,
                status: self.status,
            })
        }
    }

    /// Owning order.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Attempt number (1-based).
    #[must_use]
    pub const fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    /// Attempt status.
    #[must_use]
    pub const fn status(&self) -> ExecutionStatus {
        self.status
    }

    /// Fill, present only on success.
    #[must_use]
    pub const fn fill(&self) -> Option<&ExecutionFill> {
        self.fill.as_ref()
    }

    /// Venue error text, present only on failure.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// When the attempt started.
    #[must_use]
    pub const fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// When the attempt reached an outcome.
    #[must_use]
    pub const fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    /// Time between start and outcome.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at
            .map(|done| done.duration_since(self.started_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fill() -> ExecutionFill {
        ExecutionFill {
            provider_order_id: ProviderOrderId::new("prov-1"),
            executed_amount: dec!(100),
            executed_price: dec!(42000),
            fees: dec!(0.5),
            fee_currency: Some("USD".to_string()),
        }
    }

    #[test]
    fn complete_sets_fill_and_duration() {
        let started = Timestamp::parse("2026-01-19T12:00:00Z").unwrap();
        let done = Timestamp::parse("2026-01-19T12:00:02Z").unwrap();
        let mut execution = OrderExecution::start(OrderId::new("o-1"), 1, started);

        execution.complete(fill(), done).unwrap();

        assert_eq!(execution.status(), ExecutionStatus::Completed);
        assert_eq!(execution.fill().unwrap().executed_price, dec!(42000));
        assert_eq!(execution.duration().unwrap().num_seconds(), 2);
    }

    #[test]
    fn outcome_is_recorded_once() {
        let now = Timestamp::now();
        let mut execution = OrderExecution::start(OrderId::new("o-1"), 1, now);
        execution.fail("timeout", now).unwrap();

        assert_eq!(execution.error(), Some("timeout"));
        assert!(execution.complete(fill(), now).is_err());
        assert!(execution.fail("again", now).is_err());
    }
}
