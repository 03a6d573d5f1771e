// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Order Engine - Rust Core Library
//!
//! Advanced order management and execution engine: accepts idempotent
//! trading instructions, evaluates their trigger conditions against market
//! data, enforces per-user spending quotas and dispatches at-most-once
//! execution attempts to an external venue.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `order_management`: Order aggregate, execution attempts, status allow-list
//!   - `quota`: Spending limits, windows and reservations
//!   - `triggers`: Pure trigger evaluation against price observations
//!   - `recurrence`: DCA schedule arithmetic
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: `ExecutionVenuePort`, `MarketDataPort`
//!   - `use_cases`: `SubmitOrder`, `CancelOrder`, `QueryOrders`,
//!     `EvaluateTriggers`, `DispatchOrder`, `ConfigureLimits`
//!   - `services`: `RetryController`, `RecurrenceScheduler`, `OrderEngine`
//!
//! - **Infrastructure**: Adapters
//!   - `persistence`: In-memory order and quota ledgers
//!   - `venue`, `market_data`: HTTP and in-process adapters
//!   - `http`: Axum REST API

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Ambient stack
// =============================================================================

/// YAML configuration with environment interpolation.
pub mod config;

/// Caller-facing error codes.
pub mod error;

/// Logging and Prometheus metrics.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::order_management::{
    Order, OrderError, OrderLedger, OrderSide, OrderStatus, SubmitOrderCommand, TriggerCondition,
};
pub use domain::quota::{OrderLimit, QuotaError, QuotaLedger};
pub use domain::shared::{IdempotencyKey, OrderId, Symbol, Timestamp, UserId};

// Application re-exports
pub use application::ports::{ExecutionVenuePort, MarketDataPort};
pub use application::services::{EngineSettings, OrderEngine, RetryController, RetryPolicy};
pub use application::use_cases::{
    CancelOrderUseCase, ConfigureLimitsUseCase, DispatchOrderUseCase, EvaluateTriggersUseCase,
    QueryOrdersUseCase, SubmitOrderUseCase,
};

// Infrastructure re-exports
pub use error::{EngineError, ErrorCode};
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::market_data::{HttpMarketData, StaticPriceFeed};
pub use infrastructure::persistence::{InMemoryOrderLedger, InMemoryQuotaLedger};
pub use infrastructure::venue::{HttpVenue, ScriptedVenue};
