//! Quota Bounded Context
//!
//! Spending limits per user, optionally narrowed to a space and/or an order
//! side, with daily or monthly windows.

pub mod errors;
pub mod limit;
pub mod repository;
pub mod reservation;

pub use errors::QuotaError;
pub use limit::{LimitSettings, LimitWindow, OrderLimit, QuotaScope, most_specific};
pub use repository::QuotaLedger;
pub use reservation::Reservation;
