//! Order Aggregate

mod execution;
mod order;

pub use execution::{ExecutionFill, ExecutionStatus, OrderExecution};
pub use order::{Order, SubmitOrderCommand, Transition, TransitionReason};
