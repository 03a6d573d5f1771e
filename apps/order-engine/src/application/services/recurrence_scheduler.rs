//! Recurrence Scheduler
//!
//! Re-arms recurring (DCA) orders after a successful completion. The next
//! occurrence is submitted through the normal idempotent `submit` path under
//! a key derived from the series root and the occurrence index, so a repeated
//! re-arm for the same completion is absorbed as a duplicate.

use std::sync::Arc;

use crate::domain::order_management::{Order, OrderError, OrderLedger, SubmitOutcome};
use crate::domain::shared::Timestamp;
use crate::observability::record_recurrence_armed;

/// Creates the next order of a recurring series.
pub struct RecurrenceScheduler<L>
where
    L: OrderLedger,
{
    ledger: Arc<L>,
}

impl<L> RecurrenceScheduler<L>
where
    L: OrderLedger,
{
    /// Create a new scheduler.
    pub const fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Handle a completed order.
    ///
    /// Returns `None` for non-recurring orders and for series that reached
    /// `max_executions`.
    ///
    /// # Errors
    ///
    /// Returns error if the next occurrence cannot be built or stored.
    pub async fn on_completed(
        &self,
        order: &Order,
        now: Timestamp,
    ) -> Result<Option<SubmitOutcome>, OrderError> {
        let Some(command) = order.next_occurrence(now) else {
            if order.recurrence().is_some() {
                tracing::info!(
                    order_id = %order.id(),
                    series = %order.series_key(),
                    execution_count = order.execution_count(),
                    "Recurring series finished"
                );
            }
            return Ok(None);
        };

        let next = Order::new(command, now)?;
        let expected_count = next.execution_count();
        let outcome = self.ledger.submit(next).await?;

        let same_occurrence = outcome.order.series_key() == order.series_key()
            && outcome.order.execution_count() == expected_count
            && outcome.order.recurrence().is_some();
        if !outcome.created && !same_occurrence {
            tracing::error!(
                order_id = %order.id(),
                conflicting_order_id = %outcome.order.id(),
                key = %outcome.order.idempotency_key(),
                "Occurrence key taken by an order outside the series"
            );
            return Err(OrderError::OccurrenceConflict {
                key: outcome.order.idempotency_key().to_string(),
                series: order.series_key().to_string(),
            });
        }

        if outcome.created {
            record_recurrence_armed();
            tracing::info!(
                order_id = %order.id(),
                next_order_id = %outcome.order.id(),
                execution_count = outcome.order.execution_count(),
                scheduled_for = ?outcome.order.scheduled_for(),
                "Recurring order re-armed"
            );
        } else {
            tracing::debug!(
                order_id = %order.id(),
                next_order_id = %outcome.order.id(),
                "Recurring occurrence already armed"
            );
        }

        Ok(Some(outcome))
    }
}
