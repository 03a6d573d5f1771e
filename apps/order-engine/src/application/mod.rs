//! Application Layer
//!
//! The application layer orchestrates domain logic through use cases.
//! It defines:
//!
//! - **Ports**: Interfaces for the execution venue and market data feed
//! - **Use Cases**: Submission, cancellation, queries, trigger evaluation,
//!   dispatch and quota administration
//! - **Services**: Retry policy, recurrence re-arming and the worker pool
//! - **DTOs**: Data transfer objects for API boundaries

pub mod dto;
pub mod ports;
pub mod services;
pub mod use_cases;

pub use dto::*;
pub use ports::*;
pub use use_cases::*;
