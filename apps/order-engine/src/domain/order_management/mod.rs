//! Order Management Bounded Context
//!
//! Orders, their execution attempts, and the status lifecycle
//! `pending_trigger -> triggered -> submitting -> {completed, failed}` with
//! `cancelled` reachable before dispatch.

pub mod aggregate;
pub mod errors;
pub mod repository;
pub mod services;
pub mod value_objects;

pub use aggregate::{
    ExecutionFill, ExecutionStatus, Order, OrderExecution, SubmitOrderCommand, Transition,
    TransitionReason,
};
pub use errors::OrderError;
pub use repository::{OrderLedger, PendingPage, PendingQuery, ScanKey, SubmitOutcome};
pub use services::OrderStateMachine;
pub use value_objects::{
    AdvancedType, FailureReason, OrderSide, OrderStatus, Priority, TriggerCondition,
    TriggerReason,
};
