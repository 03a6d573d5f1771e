//! In-memory order ledger.
//!
//! All state sits behind one `RwLock`, so every operation, including the
//! status compare-and-swap, is atomic with respect to the others.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::order_management::{
    ExecutionFill, ExecutionStatus, Order, OrderError, OrderExecution, OrderLedger, OrderStatus,
    PendingPage, PendingQuery, ScanKey, SubmitOutcome, Transition,
};
use crate::domain::shared::{IdempotencyKey, OrderId, Timestamp, UserId};

#[derive(Debug, Default)]
struct LedgerState {
    orders: HashMap<OrderId, Order>,
    by_key: HashMap<(UserId, IdempotencyKey), OrderId>,
    executions: HashMap<OrderId, Vec<OrderExecution>>,
}

impl LedgerState {
    fn order(&self, id: &OrderId) -> Result<&Order, OrderError> {
        self.orders.get(id).ok_or_else(|| not_found(id))
    }
}

fn not_found(id: &OrderId) -> OrderError {
    OrderError::NotFound {
        order_id: id.to_string(),
    }
}

/// In-memory implementation of `OrderLedger`.
///
/// Suitable for testing, demos and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryOrderLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryOrderLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().orders.len()
    }

    /// Check if the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().orders.is_empty()
    }

    /// Number of completed execution attempts of one order.
    #[must_use]
    pub fn completed_attempts(&self, id: &OrderId) -> usize {
        self.state.read().executions.get(id).map_or(0, |attempts| {
            attempts
                .iter()
                .filter(|e| e.status() == ExecutionStatus::Completed)
                .count()
        })
    }
}

#[async_trait]
impl OrderLedger for InMemoryOrderLedger {
    async fn submit(&self, order: Order) -> Result<SubmitOutcome, OrderError> {
        let mut state = self.state.write();
        let key = (order.user_id().clone(), order.idempotency_key().clone());

        if let Some(existing) = state.by_key.get(&key).and_then(|id| state.orders.get(id)) {
            return Ok(SubmitOutcome {
                order: existing.clone(),
                created: false,
            });
        }

        state.by_key.insert(key, order.id().clone());
        state.orders.insert(order.id().clone(), order.clone());
        Ok(SubmitOutcome {
            order,
            created: true,
        })
    }

    async fn transition(
        &self,
        id: &OrderId,
        transition: Transition,
        now: Timestamp,
    ) -> Result<Order, OrderError> {
        let mut state = self.state.write();
        let order = state.orders.get_mut(id).ok_or_else(|| not_found(id))?;
        order.apply_transition(&transition, now)?;
        Ok(order.clone())
    }

    async fn list_pending(&self, query: PendingQuery) -> Result<PendingPage, OrderError> {
        let state = self.state.read();
        let mut candidates: Vec<(ScanKey, &Order)> = state
            .orders
            .values()
            .filter(|o| o.status() == OrderStatus::PendingTrigger)
            .filter(|o| query.asset.as_ref().is_none_or(|asset| o.asset_symbol() == asset))
            .map(|o| (ScanKey::of(o), o))
            .filter(|(key, _)| query.after.as_ref().is_none_or(|after| key > after))
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        candidates.truncate(query.limit);

        let next = if query.limit > 0 && candidates.len() == query.limit {
            candidates.last().map(|(key, _)| key.clone())
        } else {
            None
        };

        Ok(PendingPage {
            orders: candidates.into_iter().map(|(_, o)| o.clone()).collect(),
            next,
        })
    }

    async fn list_due_for_dispatch(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<Order>, OrderError> {
        let state = self.state.read();
        let mut due: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| o.status() == OrderStatus::Triggered)
            .filter(|o| o.retry_not_before().is_none_or(|at| at <= now))
            .collect();
        due.sort_by_key(|o| ScanKey::of(o));
        Ok(due.into_iter().take(limit).cloned().collect())
    }

    async fn raise_watermark(
        &self,
        id: &OrderId,
        price: Decimal,
        now: Timestamp,
    ) -> Result<Order, OrderError> {
        let mut state = self.state.write();
        let order = state.orders.get_mut(id).ok_or_else(|| not_found(id))?;
        order.raise_watermark(price, now);
        Ok(order.clone())
    }

    async fn begin_attempt(
        &self,
        id: &OrderId,
        started_at: Timestamp,
    ) -> Result<OrderExecution, OrderError> {
        let mut state = self.state.write();
        let status = state.order(id)?.status();
        if status != OrderStatus::Submitting {
            return Err(OrderError::StaleState {
                order_id: id.to_string(),
                expected: OrderStatus::Submitting,
                actual: status,
            });
        }

        let attempts = state.executions.entry(id.clone()).or_default();
        if let Some(in_flight) = attempts
            .iter()
            .find(|e| e.status() == ExecutionStatus::InFlight)
        {
            return Err(OrderError::AttemptInFlight {
                order_id: id.to_string(),
                attempt: in_flight.attempt_number(),
            });
        }
        if attempts
            .iter()
            .any(|e| e.status() == ExecutionStatus::Completed)
        {
            return Err(OrderError::AlreadyCompleted {
                order_id: id.to_string(),
            });
        }

        let attempt_number = u32::try_from(attempts.len())
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| OrderError::Storage("attempt counter overflow".to_string()))?;
        let execution = OrderExecution::start(id.clone(), attempt_number, started_at);
        attempts.push(execution.clone());
        Ok(execution)
    }

    async fn complete_attempt(
        &self,
        id: &OrderId,
        attempt: u32,
        fill: ExecutionFill,
        now: Timestamp,
    ) -> Result<Order, OrderError> {
        let mut state = self.state.write();
        let mut order = state.order(id)?.clone();

        let attempts = state.executions.get(id).map_or(&[][..], Vec::as_slice);
        if attempts
            .iter()
            .any(|e| e.status() == ExecutionStatus::Completed)
        {
            return Err(OrderError::AlreadyCompleted {
                order_id: id.to_string(),
            });
        }
        let index = attempts
            .iter()
            .position(|e| e.attempt_number() == attempt)
            .ok_or_else(|| OrderError::AttemptNotFound {
                order_id: id.to_string(),
                attempt,
            })?;

        let mut execution = attempts[index].clone();
        execution.complete(fill.clone(), now)?;
        order.record_completion(&fill, now, now)?;

        if let Some(attempts) = state.executions.get_mut(id) {
            attempts[index] = execution;
        }
        state.orders.insert(id.clone(), order.clone());
        Ok(order)
    }

    async fn fail_attempt(
        &self,
        id: &OrderId,
        attempt: u32,
        error: String,
        now: Timestamp,
    ) -> Result<OrderExecution, OrderError> {
        let mut state = self.state.write();
        let execution = state
            .executions
            .get_mut(id)
            .and_then(|attempts| attempts.iter_mut().find(|e| e.attempt_number() == attempt))
            .ok_or_else(|| OrderError::AttemptNotFound {
                order_id: id.to_string(),
                attempt,
            })?;
        execution.fail(error, now)?;
        Ok(execution.clone())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self.state.read().orders.get(id).cloned())
    }

    async fn find_by_key(
        &self,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>, OrderError> {
        let state = self.state.read();
        Ok(state
            .by_key
            .get(&(user_id.clone(), key.clone()))
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        let state = self.state.read();
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.submitted_at()
                .cmp(&a.submitted_at())
                .then_with(|| b.id().cmp(a.id()))
        });
        Ok(orders)
    }

    async fn executions_for(&self, id: &OrderId) -> Result<Vec<OrderExecution>, OrderError> {
        Ok(self
            .state
            .read()
            .executions
            .get(id)
            .cloned()
            .unwrap_or_default())
    }
}
