//! Quota errors.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::shared::DomainError;

/// Errors raised by the quota ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    /// A hard limit would be exceeded.
    #[error(
        "Quota exceeded on limit {limit_id}: requested {requested}, used {used}, held {held}, max {max}"
    )]
    Exceeded {
        /// Bucket id.
        limit_id: String,
        /// Requested amount.
        requested: Decimal,
        /// Committed amount in the window.
        used: Decimal,
        /// Amount held by other in-flight reservations.
        held: Decimal,
        /// Ceiling.
        max: Decimal,
    },

    /// Reservation amount is not positive.
    #[error("Invalid reservation amount: {0}")]
    InvalidAmount(Decimal),

    /// Limit configuration is invalid.
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Backing store failure.
    #[error("Quota storage error: {0}")]
    Storage(String),
}

impl From<DomainError> for QuotaError {
    fn from(err: DomainError) -> Self {
        Self::InvalidLimit(err.to_string())
    }
}
