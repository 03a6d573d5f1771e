//! Quota Ledger Trait

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::errors::QuotaError;
use super::limit::{LimitSettings, OrderLimit, QuotaScope};
use super::reservation::Reservation;
use crate::domain::shared::{LimitId, Timestamp, UserId};

/// Reserve/commit/release accounting against quota buckets.
///
/// `reserve` never touches `used_amount`; only `commit` does, so an attempt
/// that fails after reserving leaves no trace once released.
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Create the bucket for the settings' scope, or merge the settings into
    /// the existing one under its lock. A merge keeps the id, the in-flight
    /// holds and, unless overridden, the usage of the current window.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLimit` if the bucket fails validation.
    async fn configure_limit(
        &self,
        settings: LimitSettings,
        now: Timestamp,
    ) -> Result<OrderLimit, QuotaError>;

    /// Buckets owned by a user.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn limits_for_user(&self, user_id: &UserId) -> Result<Vec<OrderLimit>, QuotaError>;

    /// Find one bucket.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_limit(&self, id: &LimitId) -> Result<Option<OrderLimit>, QuotaError>;

    /// Atomically check the most specific bucket and hold `amount`.
    ///
    /// # Errors
    ///
    /// Returns `Exceeded` if a hard limit would be crossed.
    async fn reserve(
        &self,
        scope: &QuotaScope,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<Reservation, QuotaError>;

    /// Add the held amount to `used_amount`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails.
    async fn commit(&self, reservation: &Reservation, now: Timestamp) -> Result<(), QuotaError>;

    /// Drop the hold without charging. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails.
    async fn release(&self, reservation: &Reservation) -> Result<(), QuotaError>;
}
