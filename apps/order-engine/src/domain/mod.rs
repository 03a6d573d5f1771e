//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: The Order and its execution attempts
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Services**: Stateless business logic (transition allow-list, trigger rules)
//! - **Repository Traits**: Ledger abstractions (implemented in adapters)
//!
//! # Bounded Contexts
//!
//! - [`order_management`]: Order lifecycle, execution attempts, order ledger
//! - [`quota`]: Spending limits with reserve/commit/release accounting
//! - [`triggers`]: Price and schedule trigger evaluation
//! - [`recurrence`]: Calendar arithmetic for recurring (DCA) orders

pub mod order_management;
pub mod quota;
pub mod recurrence;
pub mod shared;
pub mod triggers;
