//! In-memory quota ledger.
//!
//! Each bucket has its own mutex; the check-and-hold in `reserve` and the
//! settings merge in `configure_limit` run under it, so concurrent
//! reservations can never overshoot the ceiling and reconfiguring never
//! loses a commit. Holds live only in memory and are dropped by `commit` or
//! `release`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;

use crate::domain::quota::{
    LimitSettings, OrderLimit, QuotaError, QuotaLedger, QuotaScope, Reservation,
};
use crate::domain::shared::{LimitId, ReservationId, Timestamp, UserId};
use crate::observability::record_quota_decision;

#[derive(Debug)]
struct Bucket {
    limit: OrderLimit,
    holds: HashMap<ReservationId, Decimal>,
}

impl Bucket {
    fn held(&self) -> Decimal {
        self.holds.values().copied().sum()
    }
}

/// In-memory implementation of `QuotaLedger`.
#[derive(Debug, Default)]
pub struct InMemoryQuotaLedger {
    buckets: RwLock<HashMap<LimitId, Arc<Mutex<Bucket>>>>,
}

impl InMemoryQuotaLedger {
    /// Create a new ledger with no limits (every reservation is granted).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount currently held by in-flight reservations on a bucket.
    #[must_use]
    pub fn held_amount(&self, id: &LimitId) -> Decimal {
        self.bucket(id).map_or(Decimal::ZERO, |b| b.lock().held())
    }

    fn bucket(&self, id: &LimitId) -> Option<Arc<Mutex<Bucket>>> {
        self.buckets.read().get(id).cloned()
    }

    /// Most specific bucket for a scope; ties broken by id.
    fn select(&self, scope: &QuotaScope) -> Option<Arc<Mutex<Bucket>>> {
        let buckets = self.buckets.read();
        buckets
            .iter()
            .filter_map(|(id, bucket)| {
                bucket
                    .lock()
                    .limit
                    .specificity(scope)
                    .map(|rank| (rank, id, bucket))
            })
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1)))
            .map(|(_, _, bucket)| Arc::clone(bucket))
    }
}

#[async_trait]
impl QuotaLedger for InMemoryQuotaLedger {
    async fn configure_limit(
        &self,
        settings: LimitSettings,
        now: Timestamp,
    ) -> Result<OrderLimit, QuotaError> {
        let mut buckets = self.buckets.write();
        let existing = buckets
            .values()
            .find(|bucket| settings.targets(&bucket.lock().limit))
            .cloned();

        if let Some(bucket) = existing {
            let mut bucket = bucket.lock();
            bucket.limit.reconfigure(&settings, now)?;
            return Ok(bucket.limit.clone());
        }

        let limit = settings.open(LimitId::generate(), now)?;
        buckets.insert(
            limit.id.clone(),
            Arc::new(Mutex::new(Bucket {
                limit: limit.clone(),
                holds: HashMap::new(),
            })),
        );
        Ok(limit)
    }

    async fn limits_for_user(&self, user_id: &UserId) -> Result<Vec<OrderLimit>, QuotaError> {
        let buckets = self.buckets.read();
        let mut limits: Vec<OrderLimit> = buckets
            .values()
            .map(|bucket| bucket.lock().limit.clone())
            .filter(|limit| &limit.user_id == user_id)
            .collect();
        limits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(limits)
    }

    async fn find_limit(&self, id: &LimitId) -> Result<Option<OrderLimit>, QuotaError> {
        Ok(self.bucket(id).map(|bucket| bucket.lock().limit.clone()))
    }

    async fn reserve(
        &self,
        scope: &QuotaScope,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<Reservation, QuotaError> {
        if amount <= Decimal::ZERO {
            return Err(QuotaError::InvalidAmount(amount));
        }

        let Some(bucket) = self.select(scope) else {
            return Ok(Reservation::unlimited(scope.clone(), amount));
        };

        let mut bucket = bucket.lock();
        if bucket.limit.roll_window(now) {
            tracing::info!(
                limit_id = %bucket.limit.id,
                reset_at = %bucket.limit.reset_at,
                "Quota window rolled over"
            );
        }

        let held = bucket.held();
        if amount > bucket.limit.headroom(held) {
            if bucket.limit.enforced {
                return Err(QuotaError::Exceeded {
                    limit_id: bucket.limit.id.to_string(),
                    requested: amount,
                    used: bucket.limit.used_amount,
                    held,
                    max: bucket.limit.max_amount,
                });
            }
            record_quota_decision("soft_breach");
            tracing::warn!(
                limit_id = %bucket.limit.id,
                user_id = %scope.user_id,
                requested = %amount,
                used = %bucket.limit.used_amount,
                held = %held,
                max = %bucket.limit.max_amount,
                "Soft quota limit exceeded"
            );
        }

        let reservation = Reservation {
            id: ReservationId::generate(),
            limit_id: Some(bucket.limit.id.clone()),
            scope: scope.clone(),
            amount,
        };
        bucket.holds.insert(reservation.id.clone(), amount);
        Ok(reservation)
    }

    async fn commit(&self, reservation: &Reservation, now: Timestamp) -> Result<(), QuotaError> {
        let Some(bucket) = reservation.limit_id.as_ref().and_then(|id| self.bucket(id)) else {
            return Ok(());
        };

        let mut bucket = bucket.lock();
        if bucket.holds.remove(&reservation.id).is_some() {
            bucket.limit.roll_window(now);
            bucket.limit.used_amount += reservation.amount;
        }
        Ok(())
    }

    async fn release(&self, reservation: &Reservation) -> Result<(), QuotaError> {
        if let Some(bucket) = reservation.limit_id.as_ref().and_then(|id| self.bucket(id)) {
            bucket.lock().holds.remove(&reservation.id);
        }
        Ok(())
    }
}
