//! Order State Machine Service
//!
//! The single allow-list of status transitions. Anything not listed here is
//! rejected, including every exit from a terminal status.

use crate::domain::order_management::errors::OrderError;
use crate::domain::order_management::value_objects::OrderStatus;

/// Order State Machine for validating transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub const fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            // Evaluator fires, or owner cancels before trigger
            (OrderStatus::PendingTrigger, OrderStatus::Triggered)
                | (OrderStatus::PendingTrigger, OrderStatus::Cancelled)
                // Dispatcher claims, or owner cancels before dispatch
                | (OrderStatus::Triggered, OrderStatus::Submitting)
                | (OrderStatus::Triggered, OrderStatus::Cancelled)
                // Attempt outcome; back to Triggered when a retry is scheduled
                | (OrderStatus::Submitting, OrderStatus::Completed)
                | (OrderStatus::Submitting, OrderStatus::Failed)
                | (OrderStatus::Submitting, OrderStatus::Triggered)
        )
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is invalid.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from,
                to,
                reason: Self::transition_error_reason(from, to),
            })
        }
    }

    /// Get a human-readable reason for an invalid transition.
    #[must_use]
    pub fn transition_error_reason(from: OrderStatus, to: OrderStatus) -> String {
        match from {
            OrderStatus::Completed => format!("Order is already completed, cannot transition to {to}"),
            OrderStatus::Failed => format!("Order has failed, cannot transition to {to}"),
            OrderStatus::Cancelled => format!("Order is cancelled, cannot transition to {to}"),
            OrderStatus::Submitting if to == OrderStatus::Cancelled => {
                "Order is being dispatched and must reach an outcome first".to_string()
            }
            _ => format!("Invalid transition from {from} to {to}"),
        }
    }

    /// Get all valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .into_iter()
            .filter(|to| Self::is_valid_transition(from, *to))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(OrderStatus::PendingTrigger, OrderStatus::Triggered, true)]
    #[test_case(OrderStatus::PendingTrigger, OrderStatus::Cancelled, true)]
    #[test_case(OrderStatus::PendingTrigger, OrderStatus::Submitting, false)]
    #[test_case(OrderStatus::PendingTrigger, OrderStatus::Completed, false)]
    #[test_case(OrderStatus::Triggered, OrderStatus::Submitting, true)]
    #[test_case(OrderStatus::Triggered, OrderStatus::Cancelled, true)]
    #[test_case(OrderStatus::Triggered, OrderStatus::Completed, false)]
    #[test_case(OrderStatus::Submitting, OrderStatus::Completed, true)]
    #[test_case(OrderStatus::Submitting, OrderStatus::Failed, true)]
    #[test_case(OrderStatus::Submitting, OrderStatus::Triggered, true)]
    #[test_case(OrderStatus::Submitting, OrderStatus::Cancelled, false)]
    #[test_case(OrderStatus::Completed, OrderStatus::PendingTrigger, false)]
    #[test_case(OrderStatus::Failed, OrderStatus::Triggered, false)]
    #[test_case(OrderStatus::Cancelled, OrderStatus::Triggered, false)]
    fn transition_allow_list(from: OrderStatus, to: OrderStatus, allowed: bool) {
        assert_eq!(OrderStateMachine::is_valid_transition(from, to), allowed);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for status in OrderStatus::ALL.into_iter().filter(OrderStatus::is_terminal) {
            assert!(OrderStateMachine::valid_next_states(status).is_empty());
        }
    }

    #[test]
    fn validate_transition_reports_reason() {
        let err = OrderStateMachine::validate_transition(
            OrderStatus::Completed,
            OrderStatus::PendingTrigger,
        )
        .unwrap_err();
        assert!(err.to_string().contains("already completed"));
    }
}
