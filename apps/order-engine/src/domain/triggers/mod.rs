//! Trigger Evaluation Domain
//!
//! Price- and schedule-based trigger rules for pending orders.

mod evaluator;
mod observation;

pub use crate::domain::order_management::TriggerReason;
pub use evaluator::{DeferReason, TriggerDecision, TriggerEvaluator, Verdict, evaluate_price};
pub use observation::PriceObservation;
