//! Trigger Evaluator
//!
//! Decides, for one pending order and the current price of its asset,
//! whether the order fires now. Pure: persistence of the outcome (watermark
//! raise, status CAS) is the caller's job.

use std::time::Duration;

use rust_decimal::Decimal;

use super::observation::PriceObservation;
use crate::domain::order_management::{
    Order, OrderSide, OrderStatus, TriggerCondition, TriggerReason,
};
use crate::domain::shared::Timestamp;

/// Why an evaluation was deferred to a later cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// No price for the asset.
    PriceUnavailable,
    /// Price older than the configured maximum age.
    StalePrice,
}

impl DeferReason {
    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::PriceUnavailable => "price_unavailable",
            Self::StalePrice => "stale_price",
        }
    }
}

/// Outcome of evaluating one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Condition satisfied.
    Fire(TriggerReason),
    /// Condition not satisfied.
    Hold,
    /// Not enough information this cycle.
    Defer(DeferReason),
}

/// Verdict plus the watermark to persist, if the observation raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerDecision {
    /// New trailing-stop watermark, set only when it rises.
    pub raise_watermark_to: Option<Decimal>,
    /// Verdict.
    pub verdict: Verdict,
}

impl TriggerDecision {
    const fn verdict(verdict: Verdict) -> Self {
        Self {
            raise_watermark_to: None,
            verdict,
        }
    }

    /// Returns true if the order fires.
    #[must_use]
    pub const fn fires(&self) -> bool {
        matches!(self.verdict, Verdict::Fire(_))
    }
}

/// Pure trigger evaluation service.
#[derive(Debug, Clone, Copy)]
pub struct TriggerEvaluator {
    max_price_age: Duration,
}

impl TriggerEvaluator {
    /// Create an evaluator that defers on prices older than `max_price_age`.
    #[must_use]
    pub const fn new(max_price_age: Duration) -> Self {
        Self { max_price_age }
    }

    /// Evaluate one order.
    #[must_use]
    pub fn evaluate(
        &self,
        order: &Order,
        observation: Option<&PriceObservation>,
        now: Timestamp,
    ) -> TriggerDecision {
        if order.status() != OrderStatus::PendingTrigger {
            return TriggerDecision::verdict(Verdict::Hold);
        }

        if order.recurrence().is_some() {
            return TriggerDecision::verdict(match order.scheduled_for() {
                Some(scheduled_for) if scheduled_for <= now => {
                    Verdict::Fire(TriggerReason::ScheduleDue { scheduled_for })
                }
                _ => Verdict::Hold,
            });
        }

        if !order.condition().needs_price() {
            return TriggerDecision::verdict(Verdict::Fire(TriggerReason::Market));
        }

        let Some(observation) = observation.filter(|o| &o.symbol == order.asset_symbol()) else {
            return TriggerDecision::verdict(Verdict::Defer(DeferReason::PriceUnavailable));
        };
        if observation.is_stale(now, self.max_price_age) {
            return TriggerDecision::verdict(Verdict::Defer(DeferReason::StalePrice));
        }

        evaluate_price(
            order.condition(),
            order.side(),
            order.highest_price(),
            observation.price,
        )
    }
}

/// Evaluate a price condition against one observed price.
///
/// For trailing stops the watermark is raised before the trigger check, so
/// a new peak can never fire on the same observation.
#[must_use]
pub fn evaluate_price(
    condition: &TriggerCondition,
    side: OrderSide,
    highest_price: Option<Decimal>,
    price: Decimal,
) -> TriggerDecision {
    let mut raise_watermark_to = None;

    let fired = match (*condition, side) {
        (TriggerCondition::Market, _) => Some(TriggerReason::Market),

        (TriggerCondition::Limit { target_price }, OrderSide::Buy) => {
            (price <= target_price).then_some(TriggerReason::LimitReached { price })
        }
        (TriggerCondition::Limit { target_price }, OrderSide::Sell) => {
            (price >= target_price).then_some(TriggerReason::LimitReached { price })
        }

        (TriggerCondition::StopLoss { stop_price }, OrderSide::Sell) => {
            (price <= stop_price).then_some(TriggerReason::StopHit { price })
        }
        (TriggerCondition::StopLoss { stop_price }, OrderSide::Buy) => {
            (price >= stop_price).then_some(TriggerReason::StopHit { price })
        }

        (TriggerCondition::TrailingStop { trailing_percent }, _) => {
            let highest = highest_price.map_or(price, |h| h.max(price));
            if highest_price != Some(highest) {
                raise_watermark_to = Some(highest);
            }
            let threshold = highest * (Decimal::ONE - trailing_percent / Decimal::ONE_HUNDRED);
            (price <= threshold).then_some(TriggerReason::TrailingStopHit {
                price,
                highest_price: highest,
            })
        }

        (
            TriggerCondition::Oco {
                stop_price,
                take_profit_price,
            },
            OrderSide::Sell,
        ) => {
            if price <= stop_price {
                Some(TriggerReason::StopHit { price })
            } else if price >= take_profit_price {
                Some(TriggerReason::TakeProfitHit { price })
            } else {
                None
            }
        }
        (
            TriggerCondition::Oco {
                stop_price,
                take_profit_price,
            },
            OrderSide::Buy,
        ) => {
            if price >= stop_price {
                Some(TriggerReason::StopHit { price })
            } else if price <= take_profit_price {
                Some(TriggerReason::TakeProfitHit { price })
            } else {
                None
            }
        }
    };

    TriggerDecision {
        raise_watermark_to,
        verdict: fired.map_or(Verdict::Hold, Verdict::Fire),
    }
}
