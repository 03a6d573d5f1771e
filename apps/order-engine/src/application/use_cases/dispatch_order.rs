//! Dispatch Order Use Case
//!
//! Drives one `triggered` order through a single execution attempt:
//!
//! 1. CAS `triggered -> submitting`; losing the race aborts with no effect.
//! 2. Reserve quota; a denial fails the order without calling the venue. A
//!    ledger outage is recorded as a failed attempt and retried.
//! 3. Append the next attempt and call the venue with the order's key.
//! 4. On success complete the attempt, commit the quota and re-arm recurring
//!    orders. On failure release the quota, fail the attempt and let the
//!    retry controller decide between a backoff and `failed`.

use std::sync::Arc;
use std::time::Instant;

use crate::application::ports::{ExecutionVenuePort, VenueError, VenueOrderRequest};
use crate::application::services::{RecurrenceScheduler, RetryController, RetryDecision};
use crate::domain::order_management::{
    FailureReason, Order, OrderError, OrderLedger, OrderStatus, Transition,
};
use crate::domain::quota::{QuotaError, QuotaLedger, QuotaScope, Reservation};
use crate::domain::shared::{OrderId, Timestamp};
use crate::observability::{
    record_dispatch_attempt, record_dispatch_conflict, record_order_failed,
    record_quota_decision, record_retry_scheduled,
};

/// Result of dispatching one order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum DispatchOutcome {
    /// Another worker owns the order, or it is no longer `triggered`.
    Skipped,
    /// The venue filled the order.
    Completed {
        /// The completed order.
        order: Order,
        /// Next occurrence of a recurring series, if one was armed.
        rearmed: Option<Order>,
    },
    /// The quota check failed; the venue was not called.
    QuotaDenied(Order),
    /// Transient failure; the order is back in `triggered` with a backoff.
    RetryScheduled {
        /// The order after the retry transition.
        order: Order,
        /// Earliest start of the next attempt.
        not_before: Timestamp,
    },
    /// Permanent failure or retries exhausted.
    Failed(Order),
}

impl DispatchOutcome {
    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Completed { .. } => "completed",
            Self::QuotaDenied(_) => "quota_denied",
            Self::RetryScheduled { .. } => "retry_scheduled",
            Self::Failed(_) => "failed",
        }
    }
}

/// Counters for one dispatch page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Orders attempted.
    pub attempted: usize,
    /// Orders completed.
    pub completed: usize,
    /// Orders skipped after losing the status race.
    pub skipped: usize,
    /// Orders failed on quota.
    pub quota_denied: usize,
    /// Orders put back for retry.
    pub retries_scheduled: usize,
    /// Orders failed for good.
    pub failed: usize,
    /// Orders whose dispatch returned an error.
    pub errors: usize,
}

impl DispatchReport {
    fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Skipped => self.skipped += 1,
            DispatchOutcome::Completed { .. } => self.completed += 1,
            DispatchOutcome::QuotaDenied(_) => self.quota_denied += 1,
            DispatchOutcome::RetryScheduled { .. } => self.retries_scheduled += 1,
            DispatchOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Use case for dispatching triggered orders to the execution venue.
pub struct DispatchOrderUseCase<L, Q, V>
where
    L: OrderLedger,
    Q: QuotaLedger,
    V: ExecutionVenuePort,
{
    ledger: Arc<L>,
    quota: Arc<Q>,
    venue: Arc<V>,
    retry: RetryController,
    recurrence: RecurrenceScheduler<L>,
}

impl<L, Q, V> DispatchOrderUseCase<L, Q, V>
where
    L: OrderLedger,
    Q: QuotaLedger,
    V: ExecutionVenuePort,
{
    /// Create a new `DispatchOrderUseCase`.
    pub fn new(ledger: Arc<L>, quota: Arc<Q>, venue: Arc<V>, retry: RetryController) -> Self {
        Self {
            recurrence: RecurrenceScheduler::new(Arc::clone(&ledger)),
            ledger,
            quota,
            venue,
            retry,
        }
    }

    /// Dispatch every due `triggered` order of one page, sequentially.
    ///
    /// # Errors
    ///
    /// Returns error only if the page cannot be read.
    pub async fn dispatch_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<DispatchReport, OrderError> {
        let due = self.ledger.list_due_for_dispatch(now, limit).await?;
        let mut report = DispatchReport::default();

        for order in due {
            report.attempted += 1;
            match self.dispatch(order.id(), now).await {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    report.errors += 1;
                    tracing::error!(order_id = %order.id(), error = %e, "Dispatch failed");
                }
            }
        }

        Ok(report)
    }

    /// Run one execution attempt for an order.
    ///
    /// # Errors
    ///
    /// Returns error when the ledger rejects a step other than the initial
    /// status CAS. The venue outcome itself is never an error here.
    pub async fn dispatch(
        &self,
        order_id: &OrderId,
        now: Timestamp,
    ) -> Result<DispatchOutcome, OrderError> {
        // 1. Claim the order
        let order = match self
            .ledger
            .transition(order_id, Transition::begin_dispatch(), now)
            .await
        {
            Ok(order) => order,
            Err(e) if e.is_stale() => {
                record_dispatch_conflict();
                tracing::debug!(order_id = %order_id, error = %e, "Dispatch lost status race");
                return Ok(DispatchOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };

        // 2. Reserve quota
        let scope = QuotaScope {
            user_id: order.user_id().clone(),
            space_id: order.space_id().cloned(),
            side: order.side(),
        };
        let reservation = match self.quota.reserve(&scope, order.amount(), now).await {
            Ok(reservation) => {
                record_quota_decision("granted");
                reservation
            }
            Err(e @ (QuotaError::Exceeded { .. } | QuotaError::InvalidAmount(_))) => {
                return self
                    .deny_quota(order_id, &e, now)
                    .await
                    .map(DispatchOutcome::QuotaDenied);
            }
            Err(e) => return self.quota_unavailable(&order, &e, now).await,
        };

        // 3. Record the attempt and call the venue
        let attempt = match self.ledger.begin_attempt(order_id, now).await {
            Ok(attempt) => attempt,
            Err(e) => {
                self.release(&reservation, order_id).await;
                return Err(e);
            }
        };
        let attempt_number = attempt.attempt_number();

        tracing::info!(
            order_id = %order_id,
            attempt = attempt_number,
            asset = %order.asset_symbol(),
            amount = %order.amount(),
            "Dispatching order to venue"
        );

        let request = VenueOrderRequest::for_order(&order);
        let started = Instant::now();
        let result = self.venue.submit_order(&request).await;
        let latency = started.elapsed().as_secs_f64();

        match result {
            Ok(fill) => {
                record_dispatch_attempt("completed", latency);
                let completed = match self
                    .ledger
                    .complete_attempt(order_id, attempt_number, fill, now)
                    .await
                {
                    Ok(order) => order,
                    Err(e) => {
                        tracing::error!(
                            order_id = %order_id,
                            attempt = attempt_number,
                            error = %e,
                            "Venue filled but completion was rejected"
                        );
                        self.release(&reservation, order_id).await;
                        return Err(e);
                    }
                };

                if let Err(e) = self.quota.commit(&reservation, now).await {
                    tracing::error!(order_id = %order_id, error = %e, "Failed to commit quota");
                }

                tracing::info!(
                    order_id = %order_id,
                    attempt = attempt_number,
                    executed_price = ?completed.outcome().map(|f| f.executed_price),
                    status = %completed.status(),
                    "Order completed"
                );

                let rearmed = match self.recurrence.on_completed(&completed, now).await {
                    Ok(outcome) => outcome.map(|o| o.order),
                    Err(e) => {
                        tracing::error!(order_id = %order_id, error = %e, "Failed to re-arm recurring order");
                        None
                    }
                };

                Ok(DispatchOutcome::Completed {
                    order: completed,
                    rearmed,
                })
            }
            Err(venue_error) => {
                let outcome = if venue_error.is_transient() {
                    "transient_error"
                } else {
                    "permanent_error"
                };
                record_dispatch_attempt(outcome, latency);
                tracing::warn!(
                    order_id = %order_id,
                    attempt = attempt_number,
                    error = %venue_error,
                    "Venue attempt failed"
                );

                self.release(&reservation, order_id).await;
                self.ledger
                    .fail_attempt(order_id, attempt_number, venue_error.message().to_string(), now)
                    .await?;

                self.back_off(&order, attempt_number, &venue_error, now).await
            }
        }
    }

    /// The ledger could not answer the quota check. The failure is recorded
    /// as an attempt so it counts toward the retry ceiling.
    async fn quota_unavailable(
        &self,
        order: &Order,
        error: &QuotaError,
        now: Timestamp,
    ) -> Result<DispatchOutcome, OrderError> {
        record_quota_decision("unavailable");
        tracing::warn!(order_id = %order.id(), error = %error, "Quota ledger unavailable");

        let attempt = self.ledger.begin_attempt(order.id(), now).await?;
        let venue_error = VenueError::transient(format!("quota ledger unavailable: {error}"));
        self.ledger
            .fail_attempt(
                order.id(),
                attempt.attempt_number(),
                venue_error.message().to_string(),
                now,
            )
            .await?;

        self.back_off(order, attempt.attempt_number(), &venue_error, now)
            .await
    }

    async fn deny_quota(
        &self,
        order_id: &OrderId,
        error: &QuotaError,
        now: Timestamp,
    ) -> Result<Order, OrderError> {
        record_quota_decision("denied");
        let reason = FailureReason::QuotaExceeded {
            message: error.to_string(),
        };
        let label = reason.label();
        let failed = self
            .ledger
            .transition(order_id, Transition::fail(reason), now)
            .await?;
        record_order_failed(label);
        tracing::warn!(order_id = %order_id, error = %error, "Order failed on quota");
        Ok(failed)
    }

    async fn back_off(
        &self,
        order: &Order,
        attempt_number: u32,
        error: &VenueError,
        now: Timestamp,
    ) -> Result<DispatchOutcome, OrderError> {
        match self.retry.decide(attempt_number, error, now) {
            RetryDecision::Retry { not_before, delay } => {
                let retried = self
                    .ledger
                    .transition(order.id(), Transition::retry(not_before), now)
                    .await?;
                record_retry_scheduled();
                tracing::info!(
                    order_id = %order.id(),
                    attempt = attempt_number,
                    delay_ms = delay.as_millis() as u64,
                    "Retry scheduled"
                );
                Ok(DispatchOutcome::RetryScheduled {
                    order: retried,
                    not_before,
                })
            }
            RetryDecision::Abandon(reason) => {
                let label = reason.label();
                let failed = self
                    .ledger
                    .transition(order.id(), Transition::fail(reason), now)
                    .await?;
                record_order_failed(label);
                tracing::warn!(
                    order_id = %order.id(),
                    attempt = attempt_number,
                    reason = label,
                    status = %OrderStatus::Failed,
                    "Order failed"
                );
                Ok(DispatchOutcome::Failed(failed))
            }
        }
    }

    async fn release(&self, reservation: &Reservation, order_id: &OrderId) {
        if let Err(e) = self.quota.release(reservation).await {
            tracing::error!(order_id = %order_id, error = %e, "Failed to release quota");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::RetryPolicy;
    use crate::domain::order_management::{
        ExecutionFill, ExecutionStatus, OrderSide, SubmitOrderCommand, TriggerReason,
    };
    use crate::domain::quota::{LimitSettings, LimitWindow, OrderLimit};
    use crate::domain::recurrence::RecurrenceRule;
    use crate::domain::shared::{IdempotencyKey, LimitId, ProviderOrderId, Symbol, UserId};
    use crate::infrastructure::persistence::{InMemoryOrderLedger, InMemoryQuotaLedger};
    use crate::infrastructure::venue::ScriptedVenue;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    type Dispatcher = DispatchOrderUseCase<InMemoryOrderLedger, InMemoryQuotaLedger, ScriptedVenue>;

    struct Harness {
        ledger: Arc<InMemoryOrderLedger>,
        quota: Arc<InMemoryQuotaLedger>,
        venue: Arc<ScriptedVenue>,
        dispatcher: Dispatcher,
    }

    fn now() -> Timestamp {
        Timestamp::parse("2026-01-19T12:00:00Z").unwrap()
    }

    fn harness(max_attempts: u32) -> Harness {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let quota = Arc::new(InMemoryQuotaLedger::new());
        let venue = Arc::new(ScriptedVenue::new());
        let policy = RetryPolicy {
            max_attempts,
            ..RetryPolicy::default()
        }
        .without_jitter();
        let dispatcher = DispatchOrderUseCase::new(
            Arc::clone(&ledger),
            Arc::clone(&quota),
            Arc::clone(&venue),
            RetryController::new(policy),
        );
        Harness {
            ledger,
            quota,
            venue,
            dispatcher,
        }
    }

    fn fill(price: Decimal) -> ExecutionFill {
        ExecutionFill {
            provider_order_id: ProviderOrderId::new(format!("prov-{price}")),
            executed_amount: dec!(150),
            executed_price: price,
            fees: dec!(0.15),
            fee_currency: Some("USD".to_string()),
        }
    }

    async fn triggered(ledger: &InMemoryOrderLedger, command: SubmitOrderCommand) -> Order {
        let order = ledger
            .submit(Order::new(command, now()).unwrap())
            .await
            .unwrap()
            .order;
        ledger
            .transition(order.id(), Transition::trigger(TriggerReason::Market), now())
            .await
            .unwrap()
    }

    fn buy(amount: Decimal) -> SubmitOrderCommand {
        SubmitOrderCommand::market(
            UserId::new("u-1"),
            IdempotencyKey::new(format!("buy-{amount}")),
            OrderSide::Buy,
            Symbol::new("BTC"),
            amount,
        )
    }

    async fn daily_limit(quota: &InMemoryQuotaLedger, used: Decimal) -> LimitId {
        let settings = LimitSettings {
            user_id: UserId::new("u-1"),
            space_id: None,
            side: Some(OrderSide::Buy),
            window: LimitWindow::Daily,
            max_amount: dec!(5000),
            enforced: true,
            used_amount: Some(used),
        };
        quota.configure_limit(settings, now()).await.unwrap().id
    }

    /// Quota ledger whose backing store is down.
    struct UnavailableQuota;

    #[async_trait::async_trait]
    impl QuotaLedger for UnavailableQuota {
        async fn configure_limit(
            &self,
            _settings: LimitSettings,
            _now: Timestamp,
        ) -> Result<OrderLimit, QuotaError> {
            Err(QuotaError::Storage("connection refused".to_string()))
        }

        async fn limits_for_user(
            &self,
            _user_id: &UserId,
        ) -> Result<Vec<OrderLimit>, QuotaError> {
            Err(QuotaError::Storage("connection refused".to_string()))
        }

        async fn find_limit(&self, _id: &LimitId) -> Result<Option<OrderLimit>, QuotaError> {
            Err(QuotaError::Storage("connection refused".to_string()))
        }

        async fn reserve(
            &self,
            _scope: &QuotaScope,
            _amount: Decimal,
            _now: Timestamp,
        ) -> Result<Reservation, QuotaError> {
            Err(QuotaError::Storage("connection refused".to_string()))
        }

        async fn commit(
            &self,
            _reservation: &Reservation,
            _now: Timestamp,
        ) -> Result<(), QuotaError> {
            Err(QuotaError::Storage("connection refused".to_string()))
        }

        async fn release(&self, _reservation: &Reservation) -> Result<(), QuotaError> {
            Err(QuotaError::Storage("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn success_completes_and_forwards_key() {
        let h = harness(5);
        let order = triggered(&h.ledger, buy(dec!(150))).await;
        h.venue.push_fill(fill(dec!(42000)));

        let outcome = h.dispatcher.dispatch(order.id(), now()).await.unwrap();

        let DispatchOutcome::Completed { order: done, rearmed } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(done.status(), OrderStatus::Completed);
        assert_eq!(done.outcome().map(|f| f.executed_price), Some(dec!(42000)));
        assert!(rearmed.is_none());
        assert_eq!(h.venue.calls(), 1);
        assert_eq!(h.venue.requests()[0].idempotency_key, *order.idempotency_key());
    }

    #[tokio::test]
    async fn quota_denial_fails_without_venue_call() {
        let h = harness(5);
        let limit_id = daily_limit(&h.quota, dec!(4800)).await;
        let order = triggered(&h.ledger, buy(dec!(500))).await;

        let outcome = h.dispatcher.dispatch(order.id(), now()).await.unwrap();

        let DispatchOutcome::QuotaDenied(failed) = outcome else {
            panic!("expected quota denial, got {outcome:?}");
        };
        assert_eq!(failed.status(), OrderStatus::Failed);
        assert!(matches!(
            failed.failure_reason(),
            Some(FailureReason::QuotaExceeded { .. })
        ));
        assert_eq!(h.venue.calls(), 0);
        assert!(h.ledger.executions_for(order.id()).await.unwrap().is_empty());

        let limit = h.quota.find_limit(&limit_id).await.unwrap().unwrap();
        assert_eq!(limit.used_amount, dec!(4800));
    }

    #[tokio::test]
    async fn quota_grant_commits_used_amount() {
        let h = harness(5);
        let limit_id = daily_limit(&h.quota, dec!(4800)).await;
        let order = triggered(&h.ledger, buy(dec!(150))).await;

        let outcome = h.dispatcher.dispatch(order.id(), now()).await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::Completed { .. }));
        let limit = h.quota.find_limit(&limit_id).await.unwrap().unwrap();
        assert_eq!(limit.used_amount, dec!(4950));
        assert_eq!(h.quota.held_amount(&limit_id), dec!(0));
    }

    #[tokio::test]
    async fn transient_failure_then_success_on_retry() {
        let h = harness(5);
        let limit_id = daily_limit(&h.quota, dec!(0)).await;
        let order = triggered(&h.ledger, buy(dec!(150))).await;
        h.venue.push_error(VenueError::transient("503 Service Unavailable"));
        h.venue.push_fill(fill(dec!(43000)));

        let first = h.dispatcher.dispatch(order.id(), now()).await.unwrap();
        let DispatchOutcome::RetryScheduled { not_before, .. } = first else {
            panic!("expected retry, got {first:?}");
        };
        assert_eq!(not_before.duration_since(now()).num_milliseconds(), 500);
        assert_eq!(h.quota.held_amount(&limit_id), dec!(0));

        let early = h.dispatcher.dispatch_due(now(), 10).await.unwrap();
        assert_eq!(early.attempted, 0);

        let report = h.dispatcher.dispatch_due(not_before, 10).await.unwrap();
        assert_eq!(report.completed, 1);

        let executions = h.ledger.executions_for(order.id()).await.unwrap();
        let statuses: Vec<_> = executions.iter().map(|e| e.status()).collect();
        assert_eq!(statuses, vec![ExecutionStatus::Failed, ExecutionStatus::Completed]);
        assert_eq!(executions[1].attempt_number(), 2);

        let stored = h.ledger.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.outcome(), executions[1].fill());
        let limit = h.quota.find_limit(&limit_id).await.unwrap().unwrap();
        assert_eq!(limit.used_amount, dec!(150));
    }

    #[tokio::test]
    async fn permanent_failure_fails_immediately() {
        let h = harness(5);
        let order = triggered(&h.ledger, buy(dec!(150))).await;
        h.venue.push_error(VenueError::permanent("insufficient funds"));

        let outcome = h.dispatcher.dispatch(order.id(), now()).await.unwrap();

        let DispatchOutcome::Failed(failed) = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(
            failed.failure_reason(),
            Some(&FailureReason::VenueRejected {
                message: "insufficient funds".to_string()
            })
        );
        let executions = h.ledger.executions_for(order.id()).await.unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].error(), Some("insufficient funds"));
    }

    #[tokio::test]
    async fn exhausting_attempts_fails_order() {
        let h = harness(2);
        let order = triggered(&h.ledger, buy(dec!(150))).await;
        h.venue.push_error(VenueError::transient("timeout"));
        h.venue.push_error(VenueError::transient("timeout"));

        let first = h.dispatcher.dispatch(order.id(), now()).await.unwrap();
        let DispatchOutcome::RetryScheduled { not_before, .. } = first else {
            panic!("expected retry, got {first:?}");
        };
        let second = h.dispatcher.dispatch(order.id(), not_before).await.unwrap();

        let DispatchOutcome::Failed(failed) = second else {
            panic!("expected failure, got {second:?}");
        };
        assert_eq!(
            failed.failure_reason(),
            Some(&FailureReason::RetriesExhausted {
                attempts: 2,
                last_error: "timeout".to_string()
            })
        );
        assert_eq!(h.venue.calls(), 2);
    }

    #[tokio::test]
    async fn dispatch_of_non_triggered_order_is_skipped() {
        let h = harness(5);
        let order = h
            .ledger
            .submit(Order::new(buy(dec!(150)), now()).unwrap())
            .await
            .unwrap()
            .order;

        let outcome = h.dispatcher.dispatch(order.id(), now()).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Skipped);
        assert_eq!(h.venue.calls(), 0);
    }

    #[tokio::test]
    async fn recurring_completion_rearms_next_occurrence() {
        let h = harness(5);
        let order = triggered(
            &h.ledger,
            buy(dec!(100)).with_recurrence(RecurrenceRule::daily(), 0, Some(2)),
        )
        .await;

        let outcome = h.dispatcher.dispatch(order.id(), now()).await.unwrap();

        let DispatchOutcome::Completed { rearmed, .. } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        let next = rearmed.unwrap();
        assert_eq!(next.status(), OrderStatus::PendingTrigger);
        assert_eq!(next.execution_count(), 1);
    }

    #[tokio::test]
    async fn unavailable_quota_ledger_counts_toward_the_retry_ceiling() {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let venue = Arc::new(ScriptedVenue::new());
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        }
        .without_jitter();
        let dispatcher = DispatchOrderUseCase::new(
            Arc::clone(&ledger),
            Arc::new(UnavailableQuota),
            Arc::clone(&venue),
            RetryController::new(policy),
        );
        let order = triggered(&ledger, buy(dec!(150))).await;

        let mut clock = now();
        let mut dispatches = 0;
        let failed = loop {
            dispatches += 1;
            assert!(dispatches <= 3, "order kept retrying past the ceiling");
            match dispatcher.dispatch(order.id(), clock).await.unwrap() {
                DispatchOutcome::RetryScheduled { not_before, .. } => clock = not_before,
                DispatchOutcome::Failed(failed) => break failed,
                other => panic!("unexpected outcome {other:?}"),
            }
        };

        assert_eq!(dispatches, 3);
        assert_eq!(failed.status(), OrderStatus::Failed);
        let Some(FailureReason::RetriesExhausted { attempts, last_error }) = failed.failure_reason()
        else {
            panic!("expected exhausted retries, got {:?}", failed.failure_reason());
        };
        assert_eq!(*attempts, 3);
        assert!(last_error.contains("quota ledger unavailable"));
        assert_eq!(venue.calls(), 0);

        let executions = ledger.executions_for(order.id()).await.unwrap();
        assert_eq!(executions.len(), 3);
        assert!(executions.iter().all(|e| e.status() == ExecutionStatus::Failed));
    }
}
