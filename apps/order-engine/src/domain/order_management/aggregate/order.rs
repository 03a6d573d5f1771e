//! Order Aggregate Root
//!
//! A logical trading instruction: what to trade, under which condition, and
//! where it is in the trigger/dispatch lifecycle. Status changes only through
//! [`Order::apply_transition`] and [`Order::record_completion`], both of which
//! check the expected prior status and the transition allow-list.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::execution::ExecutionFill;
use crate::domain::order_management::errors::OrderError;
use crate::domain::order_management::services::OrderStateMachine;
use crate::domain::order_management::value_objects::{
    AdvancedType, FailureReason, OrderSide, OrderStatus, Priority, TriggerCondition,
    TriggerReason,
};
use crate::domain::recurrence::{RecurrenceRule, has_next_occurrence};
use crate::domain::shared::{
    DomainError, IdempotencyKey, OrderId, SpaceId, Symbol, Timestamp, UserId,
};

/// Command to create a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrderCommand {
    /// Owning user.
    pub user_id: UserId,
    /// Shared space the order is charged against, if any.
    pub space_id: Option<SpaceId>,
    /// Caller-supplied de-duplication key.
    pub idempotency_key: IdempotencyKey,
    /// Buy or sell.
    pub side: OrderSide,
    /// Scheduling priority.
    pub priority: Priority,
    /// Amount to trade, in `currency`.
    pub amount: Decimal,
    /// Quote currency of `amount`.
    pub currency: String,
    /// Asset to trade.
    pub asset_symbol: Symbol,
    /// Trigger condition.
    pub condition: TriggerCondition,
    /// Initial trailing-stop watermark.
    pub highest_price: Option<Decimal>,
    /// Recurrence rule for DCA orders.
    pub recurrence: Option<RecurrenceRule>,
    /// Occurrence index within the series.
    pub execution_count: u32,
    /// Highest occurrence index the series may reach.
    pub max_executions: Option<u32>,
    /// Root key of the recurring series (defaults to `idempotency_key`).
    pub series_key: Option<IdempotencyKey>,
    /// Explicit schedule time; computed from the rule when absent.
    pub scheduled_for: Option<Timestamp>,
}

impl SubmitOrderCommand {
    /// Minimal market order command, used as a base by callers and tests.
    #[must_use]
    pub fn market(
        user_id: UserId,
        idempotency_key: IdempotencyKey,
        side: OrderSide,
        asset_symbol: Symbol,
        amount: Decimal,
    ) -> Self {
        Self {
            user_id,
            space_id: None,
            idempotency_key,
            side,
            priority: Priority::Normal,
            amount,
            currency: "USD".to_string(),
            asset_symbol,
            condition: TriggerCondition::Market,
            highest_price: None,
            recurrence: None,
            execution_count: 0,
            max_executions: None,
            series_key: None,
            scheduled_for: None,
        }
    }

    /// Replace the trigger condition.
    #[must_use]
    pub fn with_condition(mut self, condition: TriggerCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Make the order recurring.
    #[must_use]
    pub fn with_recurrence(
        mut self,
        rule: RecurrenceRule,
        execution_count: u32,
        max_executions: Option<u32>,
    ) -> Self {
        self.recurrence = Some(rule);
        self.execution_count = execution_count;
        self.max_executions = max_executions;
        self
    }

    /// Validate everything that can be checked without the ledger.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::invalid("amount", "must be positive"));
        }
        if self.currency.trim().is_empty() {
            return Err(DomainError::invalid("currency", "cannot be empty"));
        }
        self.asset_symbol.validate()?;
        validate_key("idempotency_key", &self.idempotency_key)?;
        if let Some(series_key) = &self.series_key {
            validate_key("series_key", series_key)?;
            if series_key.is_occurrence() {
                return Err(DomainError::invalid(
                    "series_key",
                    format!("cannot contain '{}'", IdempotencyKey::OCCURRENCE_SEPARATOR),
                ));
            }
        }
        if self.idempotency_key.is_occurrence() && !self.is_derived_occurrence() {
            return Err(DomainError::invalid(
                "idempotency_key",
                format!(
                    "'{}' is reserved for recurring occurrence keys",
                    IdempotencyKey::OCCURRENCE_SEPARATOR
                ),
            ));
        }
        self.condition.validate(self.side)?;

        if let Some(highest) = self.highest_price {
            if !matches!(self.condition, TriggerCondition::TrailingStop { .. }) {
                return Err(DomainError::invalid(
                    "highest_price",
                    "only valid for trailing stops",
                ));
            }
            if highest <= Decimal::ZERO {
                return Err(DomainError::invalid("highest_price", "must be positive"));
            }
        }

        match &self.recurrence {
            Some(rule) => {
                rule.validate()?;
                if self.condition != TriggerCondition::Market {
                    return Err(DomainError::invalid(
                        "condition",
                        "recurring orders must use the market condition",
                    ));
                }
                if let Some(max) = self.max_executions {
                    if max == 0 {
                        return Err(DomainError::invalid("max_executions", "must be positive"));
                    }
                    if self.execution_count > max {
                        return Err(DomainError::invalid(
                            "execution_count",
                            format!("exceeds max_executions ({max})"),
                        ));
                    }
                }
            }
            None => {
                if self.max_executions.is_some() || self.execution_count != 0 {
                    return Err(DomainError::invalid(
                        "recurrence",
                        "execution bounds require a recurrence pattern",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns true if the key is the one the series derives for this
    /// occurrence.
    fn is_derived_occurrence(&self) -> bool {
        match (&self.series_key, &self.recurrence) {
            (Some(root), Some(_)) => {
                self.idempotency_key == IdempotencyKey::for_occurrence(root, self.execution_count)
            }
            _ => false,
        }
    }
}

fn validate_key(field: &str, key: &IdempotencyKey) -> Result<(), DomainError> {
    if key.as_str().trim().is_empty() {
        return Err(DomainError::invalid(field, "cannot be empty"));
    }
    if key.as_str().len() > IdempotencyKey::MAX_LEN {
        return Err(DomainError::invalid(
            field,
            format!("cannot exceed {} characters", IdempotencyKey::MAX_LEN),
        ));
    }
    Ok(())
}

/// Why a status transition happens. Determines the target status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionReason {
    /// Trigger condition satisfied (`pending_trigger -> triggered`).
    Triggered(TriggerReason),
    /// A dispatcher claimed the order (`triggered -> submitting`).
    DispatchStarted,
    /// Transient failure, another attempt allowed (`submitting -> triggered`).
    RetryScheduled {
        /// Earliest time the next attempt may start.
        not_before: Timestamp,
    },
    /// Terminal failure.
    Failed(FailureReason),
    /// Owner cancelled.
    Cancelled,
}

impl TransitionReason {
    /// Status this reason leads to.
    #[must_use]
    pub const fn target(&self) -> OrderStatus {
        match self {
            Self::Triggered(_) | Self::RetryScheduled { .. } => OrderStatus::Triggered,
            Self::DispatchStarted => OrderStatus::Submitting,
            Self::Failed(_) => OrderStatus::Failed,
            Self::Cancelled => OrderStatus::Cancelled,
        }
    }
}

/// Compare-and-swap request: move from `from` to `to` for `reason`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Status the caller believes the order is in.
    pub from: OrderStatus,
    /// Requested status.
    pub to: OrderStatus,
    /// Why.
    pub reason: TransitionReason,
}

impl Transition {
    /// Build a transition whose target is implied by the reason.
    #[must_use]
    pub fn new(from: OrderStatus, reason: TransitionReason) -> Self {
        Self {
            from,
            to: reason.target(),
            reason,
        }
    }

    /// `pending_trigger -> triggered`.
    #[must_use]
    pub fn trigger(reason: TriggerReason) -> Self {
        Self::new(OrderStatus::PendingTrigger, TransitionReason::Triggered(reason))
    }

    /// `triggered -> submitting`.
    #[must_use]
    pub fn begin_dispatch() -> Self {
        Self::new(OrderStatus::Triggered, TransitionReason::DispatchStarted)
    }

    /// `submitting -> triggered` with a backoff.
    #[must_use]
    pub fn retry(not_before: Timestamp) -> Self {
        Self::new(
            OrderStatus::Submitting,
            TransitionReason::RetryScheduled { not_before },
        )
    }

    /// `submitting -> failed`.
    #[must_use]
    pub fn fail(reason: FailureReason) -> Self {
        Self::new(OrderStatus::Submitting, TransitionReason::Failed(reason))
    }

    /// `from -> cancelled`.
    #[must_use]
    pub fn cancel(from: OrderStatus) -> Self {
        Self::new(from, TransitionReason::Cancelled)
    }
}

/// Order aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    space_id: Option<SpaceId>,
    idempotency_key: IdempotencyKey,
    series_key: IdempotencyKey,
    side: OrderSide,
    priority: Priority,
    amount: Decimal,
    currency: String,
    asset_symbol: Symbol,
    condition: TriggerCondition,
    highest_price: Option<Decimal>,
    recurrence: Option<RecurrenceRule>,
    execution_count: u32,
    max_executions: Option<u32>,
    scheduled_for: Option<Timestamp>,
    status: OrderStatus,
    trigger_reason: Option<TriggerReason>,
    failure_reason: Option<FailureReason>,
    retry_not_before: Option<Timestamp>,
    outcome: Option<ExecutionFill>,
    submitted_at: Timestamp,
    triggered_at: Option<Timestamp>,
    executed_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
    updated_at: Timestamp,
}

impl Order {
    /// Create a new order in `pending_trigger`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidOrder` if the command fails validation.
    pub fn new(cmd: SubmitOrderCommand, now: Timestamp) -> Result<Self, OrderError> {
        cmd.validate()?;

        let scheduled_for = cmd
            .recurrence
            .map(|rule| cmd.scheduled_for.unwrap_or_else(|| rule.first_occurrence(now)));
        let series_key = cmd
            .series_key
            .unwrap_or_else(|| cmd.idempotency_key.clone());

        Ok(Self {
            id: OrderId::generate(),
            user_id: cmd.user_id,
            space_id: cmd.space_id,
            idempotency_key: cmd.idempotency_key,
            series_key,
            side: cmd.side,
            priority: cmd.priority,
            amount: cmd.amount,
            currency: cmd.currency.trim().to_uppercase(),
            asset_symbol: cmd.asset_symbol,
            condition: cmd.condition,
            highest_price: cmd.highest_price,
            recurrence: cmd.recurrence,
            execution_count: cmd.execution_count,
            max_executions: cmd.max_executions,
            scheduled_for,
            status: OrderStatus::PendingTrigger,
            trigger_reason: None,
            failure_reason: None,
            retry_not_before: None,
            outcome: None,
            submitted_at: now,
            triggered_at: None,
            executed_at: None,
            completed_at: None,
            updated_at: now,
        })
    }

    // ========================================================================
    // State Transitions
    // ========================================================================

    /// Apply a compare-and-swap transition.
    ///
    /// # Errors
    ///
    /// - `StaleState` if the current status is not `transition.from`.
    /// - `InvalidStateTransition` if `from -> to` is not allowed or the reason
    ///   does not lead to `to`.
    pub fn apply_transition(
        &mut self,
        transition: &Transition,
        now: Timestamp,
    ) -> Result<(), OrderError> {
        self.ensure_status(transition.from)?;

        if transition.reason.target() != transition.to {
            return Err(OrderError::InvalidStateTransition {
                from: transition.from,
                to: transition.to,
                reason: format!(
                    "transition reason leads to {}",
                    transition.reason.target()
                ),
            });
        }
        OrderStateMachine::validate_transition(transition.from, transition.to)?;

        match &transition.reason {
            TransitionReason::Triggered(reason) => {
                self.trigger_reason = Some(reason.clone());
                self.triggered_at = Some(now);
                self.retry_not_before = None;
            }
            TransitionReason::DispatchStarted => {}
            TransitionReason::RetryScheduled { not_before } => {
                self.retry_not_before = Some(*not_before);
            }
            TransitionReason::Failed(reason) => {
                self.failure_reason = Some(reason.clone());
                self.retry_not_before = None;
            }
            TransitionReason::Cancelled => {
                self.retry_not_before = None;
            }
        }

        self.status = transition.to;
        self.updated_at = now;
        Ok(())
    }

    /// Record the outcome snapshot and move `submitting -> completed`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyCompleted` if an outcome is already recorded, or a
    /// status error if the order is not `submitting`.
    pub fn record_completion(
        &mut self,
        fill: &ExecutionFill,
        executed_at: Timestamp,
        now: Timestamp,
    ) -> Result<(), OrderError> {
        if self.outcome.is_some() {
            return Err(OrderError::AlreadyCompleted {
                order_id: self.id.to_string(),
            });
        }
        self.ensure_status(OrderStatus::Submitting)?;
        OrderStateMachine::validate_transition(self.status, OrderStatus::Completed)?;

        self.outcome = Some(fill.clone());
        self.status = OrderStatus::Completed;
        self.retry_not_before = None;
        self.executed_at = Some(executed_at);
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Raise the trailing-stop watermark to `price` if it is higher.
    ///
    /// Returns true if the watermark changed. Non-trailing orders are left
    /// untouched.
    pub fn raise_watermark(&mut self, price: Decimal, now: Timestamp) -> bool {
        if !matches!(self.condition, TriggerCondition::TrailingStop { .. }) {
            return false;
        }
        match self.highest_price {
            Some(highest) if highest >= price => false,
            _ => {
                self.highest_price = Some(price);
                self.updated_at = now;
                true
            }
        }
    }

    /// Command for the next occurrence of a recurring series, if any remain.
    ///
    /// The derived key is a function of the series root and the occurrence
    /// index, so repeating this for the same completed order always yields
    /// the same key.
    #[must_use]
    pub fn next_occurrence(&self, now: Timestamp) -> Option<SubmitOrderCommand> {
        let rule = self.recurrence?;
        if !has_next_occurrence(self.execution_count, self.max_executions) {
            return None;
        }
        let next_count = self.execution_count.checked_add(1)?;
        let previous = self.scheduled_for.unwrap_or(now);

        Some(SubmitOrderCommand {
            user_id: self.user_id.clone(),
            space_id: self.space_id.clone(),
            idempotency_key: IdempotencyKey::for_occurrence(&self.series_key, next_count),
            side: self.side,
            priority: self.priority,
            amount: self.amount,
            currency: self.currency.clone(),
            asset_symbol: self.asset_symbol.clone(),
            condition: self.condition,
            highest_price: None,
            recurrence: Some(rule),
            execution_count: next_count,
            max_executions: self.max_executions,
            series_key: Some(self.series_key.clone()),
            scheduled_for: Some(rule.following(previous)),
        })
    }

    fn ensure_status(&self, expected: OrderStatus) -> Result<(), OrderError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(OrderError::StaleState {
                order_id: self.id.to_string(),
                expected,
                actual: self.status,
            })
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Engine-assigned id.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Shared space, if any.
    #[must_use]
    pub const fn space_id(&self) -> Option<&SpaceId> {
        self.space_id.as_ref()
    }

    /// Caller-supplied de-duplication key.
    #[must_use]
    pub const fn idempotency_key(&self) -> &IdempotencyKey {
        &self.idempotency_key
    }

    /// Root key of the recurring series (equal to the key for one-shot orders).
    #[must_use]
    pub const fn series_key(&self) -> &IdempotencyKey {
        &self.series_key
    }

    /// Buy or sell.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Scheduling priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Amount to trade.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Quote currency.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Asset symbol.
    #[must_use]
    pub const fn asset_symbol(&self) -> &Symbol {
        &self.asset_symbol
    }

    /// Trigger condition.
    #[must_use]
    pub const fn condition(&self) -> &TriggerCondition {
        &self.condition
    }

    /// Classification derived from condition and recurrence.
    #[must_use]
    pub const fn advanced_type(&self) -> AdvancedType {
        if self.recurrence.is_some() {
            AdvancedType::RecurringDca
        } else {
            self.condition.advanced_type()
        }
    }

    /// Trailing-stop watermark.
    #[must_use]
    pub const fn highest_price(&self) -> Option<Decimal> {
        self.highest_price
    }

    /// Recurrence rule.
    #[must_use]
    pub const fn recurrence(&self) -> Option<&RecurrenceRule> {
        self.recurrence.as_ref()
    }

    /// Occurrence index within the series.
    #[must_use]
    pub const fn execution_count(&self) -> u32 {
        self.execution_count
    }

    /// Series bound.
    #[must_use]
    pub const fn max_executions(&self) -> Option<u32> {
        self.max_executions
    }

    /// When a recurring occurrence becomes due.
    #[must_use]
    pub const fn scheduled_for(&self) -> Option<Timestamp> {
        self.scheduled_for
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Why the order triggered.
    #[must_use]
    pub const fn trigger_reason(&self) -> Option<&TriggerReason> {
        self.trigger_reason.as_ref()
    }

    /// Why the order failed.
    #[must_use]
    pub const fn failure_reason(&self) -> Option<&FailureReason> {
        self.failure_reason.as_ref()
    }

    /// Earliest time the next dispatch attempt may start.
    #[must_use]
    pub const fn retry_not_before(&self) -> Option<Timestamp> {
        self.retry_not_before
    }

    /// Outcome snapshot of the completed attempt.
    #[must_use]
    pub const fn outcome(&self) -> Option<&ExecutionFill> {
        self.outcome.as_ref()
    }

    /// Submission time.
    #[must_use]
    pub const fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }

    /// Trigger time.
    #[must_use]
    pub const fn triggered_at(&self) -> Option<Timestamp> {
        self.triggered_at
    }

    /// Start of the successful attempt.
    #[must_use]
    pub const fn executed_at(&self) -> Option<Timestamp> {
        self.executed_at
    }

    /// Completion time.
    #[must_use]
    pub const fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    /// Last modification time.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}
