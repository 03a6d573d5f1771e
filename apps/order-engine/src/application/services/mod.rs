//! Application Services
//!
//! Application services coordinate domain logic and infrastructure adapters.
//! They differ from use cases in that they typically run as background tasks
//! or are shared by several use cases.

mod engine;
mod recurrence_scheduler;
mod retry_controller;

pub use engine::{CycleReport, EngineSettings, OrderEngine};
pub use recurrence_scheduler::RecurrenceScheduler;
pub use retry_controller::{RetryController, RetryDecision, RetryPolicy, is_retryable_status};
