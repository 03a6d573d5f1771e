//! Configure Limits Use Case

use std::sync::Arc;

use crate::domain::quota::{LimitSettings, OrderLimit, QuotaError, QuotaLedger};
use crate::domain::shared::{Timestamp, UserId};

/// Command to create or reconfigure the bucket of one scope.
pub type UpsertLimitCommand = LimitSettings;

/// Use case for quota administration.
pub struct ConfigureLimitsUseCase<Q>
where
    Q: QuotaLedger,
{
    quota: Arc<Q>,
}

impl<Q> ConfigureLimitsUseCase<Q>
where
    Q: QuotaLedger,
{
    /// Create a new `ConfigureLimitsUseCase`.
    pub const fn new(quota: Arc<Q>) -> Self {
        Self { quota }
    }

    /// Create or reconfigure the bucket for the command's scope.
    ///
    /// Reconfiguring keeps the bucket id and, unless overridden, its usage in
    /// the current window. The merge runs inside the quota ledger so a
    /// concurrent commit is never lost.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLimit` if the bucket fails validation.
    pub async fn upsert(
        &self,
        command: UpsertLimitCommand,
        now: Timestamp,
    ) -> Result<OrderLimit, QuotaError> {
        let stored = self.quota.configure_limit(command, now).await?;
        tracing::info!(
            limit_id = %stored.id,
            user_id = %stored.user_id,
            window = %stored.window,
            max_amount = %stored.max_amount,
            enforced = stored.enforced,
            "Quota limit configured"
        );
        Ok(stored)
    }

    /// Buckets of one user.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<OrderLimit>, QuotaError> {
        self.quota.limits_for_user(user_id).await
    }
}
