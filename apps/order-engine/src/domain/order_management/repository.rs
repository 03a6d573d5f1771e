//! Order Ledger Trait
//!
//! Persistence abstraction for orders and their execution attempts.
//! Implemented by adapters in the infrastructure layer. Every status change
//! goes through a compare-and-swap so concurrent workers never need a
//! global lock.

use std::cmp::{Ordering, Reverse};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::aggregate::{ExecutionFill, Order, OrderExecution, Transition};
use super::errors::OrderError;
use super::value_objects::{OrderStatus, Priority};
use crate::domain::shared::{IdempotencyKey, OrderId, Symbol, Timestamp, UserId};

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// The stored order (new or pre-existing).
    pub order: Order,
    /// False when the idempotency key was already known.
    pub created: bool,
}

/// Position in the pending scan: priority descending, then oldest first,
/// then id as a tie-breaker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanKey {
    /// Order priority.
    pub priority: Priority,
    /// Submission time.
    pub submitted_at: Timestamp,
    /// Order id.
    pub order_id: OrderId,
}

impl ScanKey {
    /// Scan key of an order.
    #[must_use]
    pub fn of(order: &Order) -> Self {
        Self {
            priority: order.priority(),
            submitted_at: order.submitted_at(),
            order_id: order.id().clone(),
        }
    }
}

impl Ord for ScanKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (Reverse(self.priority), self.submitted_at, &self.order_id).cmp(&(
            Reverse(other.priority),
            other.submitted_at,
            &other.order_id,
        ))
    }
}

impl PartialOrd for ScanKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One page request of the pending scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    /// Restrict to one asset.
    pub asset: Option<Symbol>,
    /// Resume strictly after this position.
    pub after: Option<ScanKey>,
    /// Page size.
    pub limit: usize,
}

impl PendingQuery {
    /// First page over all assets.
    #[must_use]
    pub const fn first(limit: usize) -> Self {
        Self {
            asset: None,
            after: None,
            limit,
        }
    }
}

/// One page of the pending scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingPage {
    /// Orders in scan order.
    pub orders: Vec<Order>,
    /// Cursor for the next page; `None` when the scan is exhausted.
    pub next: Option<ScanKey>,
}

/// Ledger of orders and execution attempts.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Insert a new `pending_trigger` order, or return the existing one with
    /// the same `(user_id, idempotency_key)` unchanged.
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails.
    async fn submit(&self, order: Order) -> Result<SubmitOutcome, OrderError>;

    /// Compare-and-swap status change, stamped with `now`.
    ///
    /// # Errors
    ///
    /// `StaleState` when the status does not match `transition.from`,
    /// `InvalidStateTransition` when the move is not allowed, `NotFound`.
    async fn transition(
        &self,
        id: &OrderId,
        transition: Transition,
        now: Timestamp,
    ) -> Result<Order, OrderError>;

    /// One page of `pending_trigger` orders in scan order.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn list_pending(&self, query: PendingQuery) -> Result<PendingPage, OrderError>;

    /// `triggered` orders whose retry backoff (if any) has elapsed, in scan
    /// order.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn list_due_for_dispatch(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<Order>, OrderError>;

    /// Monotonic max on the trailing-stop watermark. Returns the order after
    /// the update.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist.
    async fn raise_watermark(
        &self,
        id: &OrderId,
        price: Decimal,
        now: Timestamp,
    ) -> Result<Order, OrderError>;

    /// Append the next contiguous attempt in `in_flight`.
    ///
    /// # Errors
    ///
    /// `StaleState` unless the order is `submitting`, `AttemptInFlight` if an
    /// attempt is outstanding, `AlreadyCompleted` if one succeeded.
    async fn begin_attempt(
        &self,
        id: &OrderId,
        started_at: Timestamp,
    ) -> Result<OrderExecution, OrderError>;

    /// Complete an attempt, write the outcome snapshot and move the order to
    /// `completed`.
    ///
    /// # Errors
    ///
    /// `AlreadyCompleted` if any attempt of the order already completed.
    async fn complete_attempt(
        &self,
        id: &OrderId,
        attempt: u32,
        fill: ExecutionFill,
        now: Timestamp,
    ) -> Result<Order, OrderError>;

    /// Mark an attempt failed with the venue error text.
    ///
    /// # Errors
    ///
    /// Returns error if the attempt is unknown or not in flight.
    async fn fail_attempt(
        &self,
        id: &OrderId,
        attempt: u32,
        error: String,
        now: Timestamp,
    ) -> Result<OrderExecution, OrderError>;

    /// Find an order by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError>;

    /// Find an order by owner and idempotency key.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_key(
        &self,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>, OrderError>;

    /// Orders of one user, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn list_for_user(
        &self,
        user_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError>;

    /// Execution attempts of one order, by attempt number.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn executions_for(&self, id: &OrderId) -> Result<Vec<OrderExecution>, OrderError>;
}
