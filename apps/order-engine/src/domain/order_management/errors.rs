//! Order management errors.

use thiserror::Error;

use super::aggregate::ExecutionStatus;
use super::value_objects::OrderStatus;
use crate::domain::shared::DomainError;

/// Errors raised by the Order aggregate and the order ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Submission failed validation; no order was created.
    #[error("Invalid order parameter '{field}': {message}")]
    InvalidOrder {
        /// Offending field.
        field: String,
        /// Error message.
        message: String,
    },

    /// Order not found.
    #[error("Order not found: {order_id}")]
    NotFound {
        /// Order ID.
        order_id: String,
    },

    /// The caller does not own the order.
    #[error("Order {order_id} does not belong to the caller")]
    NotOwner {
        /// Order ID.
        order_id: String,
    },

    /// Compare-and-swap lost: the order is not in the expected status.
    #[error("Stale state for order {order_id}: expected {expected}, found {actual}")]
    StaleState {
        /// Order ID.
        order_id: String,
        /// Status the caller expected.
        expected: OrderStatus,
        /// Status actually stored.
        actual: OrderStatus,
    },

    /// Transition not in the allow-list.
    #[error("Invalid order state transition: {from} -> {to}: {reason}")]
    InvalidStateTransition {
        /// Current status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason for failure.
        reason: String,
    },

    /// Cancel requested while the order is submitting or terminal.
    #[error("Cannot cancel order in status: {status}")]
    CannotCancel {
        /// Current status.
        status: OrderStatus,
    },

    /// The order already has a completed execution attempt.
    #[error("Order {order_id} already has a completed execution")]
    AlreadyCompleted {
        /// Order ID.
        order_id: String,
    },

    /// An attempt is already in flight for the order.
    #[error("Order {order_id} already has attempt {attempt} in flight")]
    AttemptInFlight {
        /// Order ID.
        order_id: String,
        /// In-flight attempt number.
        attempt: u32,
    },

    /// Execution attempt not found.
    #[error("Attempt {attempt} not found for order {order_id}")]
    AttemptNotFound {
        /// Order ID.
        order_id: String,
        /// Attempt number.
        attempt: u32,
    },

    /// Execution attempt already reached an outcome.
    #[error("Attempt {attempt} of order {order_id} is {status}, not in flight")]
    AttemptNotInFlight {
        /// Order ID.
        order_id: String,
        /// Attempt number.
        attempt: u32,
        /// Attempt status.
        status: ExecutionStatus,
    },

    /// The key of a series occurrence is held by an order outside the series.
    #[error("Occurrence key {key} of series {series} is taken by another order")]
    OccurrenceConflict {
        /// Derived occurrence key.
        key: String,
        /// Series root key.
        series: String,
    },

    /// Backing store failure.
    #[error("Order storage error: {0}")]
    Storage(String),
}

impl OrderError {
    /// Returns true if this is a lost compare-and-swap.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleState { .. })
    }
}

impl From<DomainError> for OrderError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidValue { field, message } => Self::InvalidOrder { field, message },
        }
    }
}
