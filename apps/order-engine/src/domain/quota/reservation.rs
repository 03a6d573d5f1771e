//! In-flight quota reservations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::limit::QuotaScope;
use crate::domain::shared::{LimitId, ReservationId};

/// A hold against a quota bucket, settled by exactly one commit or release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation id.
    pub id: ReservationId,
    /// Bucket charged; `None` when no limit applied (unlimited).
    pub limit_id: Option<LimitId>,
    /// Scope the reservation was made for.
    pub scope: QuotaScope,
    /// Amount held.
    pub amount: Decimal,
}

impl Reservation {
    /// Reservation not backed by any bucket.
    #[must_use]
    pub fn unlimited(scope: QuotaScope, amount: Decimal) -> Self {
        Self {
            id: ReservationId::generate(),
            limit_id: None,
            scope,
            amount,
        }
    }

    /// Returns true if no bucket is charged.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.limit_id.is_none()
    }
}
