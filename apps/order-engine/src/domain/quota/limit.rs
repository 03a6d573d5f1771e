//! Quota buckets and scope matching.

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::order_management::OrderSide;
use crate::domain::recurrence::clamp_day;
use crate::domain::shared::{DomainError, LimitId, SpaceId, Timestamp, UserId};

/// Length of a quota window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitWindow {
    /// One day.
    Daily,
    /// One calendar month.
    Monthly,
}

impl LimitWindow {
    /// Boundary one window after `from`, or `None` on calendar overflow.
    ///
    /// Monthly boundaries land on `anchor_day` of the following month,
    /// clamped to that month's last day, so a window opened on the 31st
    /// returns to the 31st after a short month.
    #[must_use]
    pub fn advance(&self, from: Timestamp, anchor_day: u32) -> Option<Timestamp> {
        let dt = from.as_datetime();
        match self {
            Self::Daily => dt.checked_add_days(Days::new(1)).map(Timestamp::new),
            Self::Monthly => {
                let first_of_next = NaiveDate::from_ymd_opt(dt.year(), dt.month(), 1)?
                    .checked_add_months(Months::new(1))?;
                let date = clamp_day(first_of_next.year(), first_of_next.month(), anchor_day)?;
                Some(Timestamp::new(date.and_time(dt.time()).and_utc()))
            }
        }
    }

    /// Boundary of the window that contains `now`, aligned to UTC midnight
    /// and anchored on the day of `now`.
    #[must_use]
    pub fn first_reset_after(&self, now: Timestamp) -> Timestamp {
        let anchor = now.date().day();
        let start = Timestamp::start_of(now.date());
        let mut boundary = self.advance(start, anchor).unwrap_or(now);
        while boundary <= now {
            match self.advance(boundary, anchor) {
                Some(next) => boundary = next,
                None => break,
            }
        }
        boundary
    }
}

impl fmt::Display for LimitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// What a reservation is charged against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotaScope {
    /// Owning user.
    pub user_id: UserId,
    /// Shared space, if the order belongs to one.
    pub space_id: Option<SpaceId>,
    /// Order side.
    pub side: OrderSide,
}

/// A quota bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLimit {
    /// Bucket id.
    pub id: LimitId,
    /// Owning user.
    pub user_id: UserId,
    /// Narrow to one space.
    pub space_id: Option<SpaceId>,
    /// Narrow to one order side.
    pub side: Option<OrderSide>,
    /// Window length.
    pub window: LimitWindow,
    /// Ceiling per window.
    pub max_amount: Decimal,
    /// Committed amount in the current window.
    pub used_amount: Decimal,
    /// End of the current window.
    pub reset_at: Timestamp,
    /// Hard limits deny, soft limits only warn.
    pub enforced: bool,
    /// Day of month monthly windows reset on. Defaults to the day of
    /// `reset_at`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_day: Option<u32>,
}

/// Desired configuration of the bucket for one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitSettings {
    /// Owning user.
    pub user_id: UserId,
    /// Narrow to a space.
    pub space_id: Option<SpaceId>,
    /// Narrow to an order side.
    pub side: Option<OrderSide>,
    /// Window length.
    pub window: LimitWindow,
    /// Ceiling per window.
    pub max_amount: Decimal,
    /// Hard (deny) or soft (warn) limit.
    pub enforced: bool,
    /// Override the committed amount; the bucket's usage is kept otherwise.
    pub used_amount: Option<Decimal>,
}

impl LimitSettings {
    /// Returns true if `limit` is the bucket of this scope.
    #[must_use]
    pub fn targets(&self, limit: &OrderLimit) -> bool {
        limit.user_id == self.user_id && limit.space_id == self.space_id && limit.side == self.side
    }

    /// A fresh bucket whose first window ends after `now`.
    ///
    /// # Errors
    ///
    /// Returns error if the resulting bucket fails validation.
    pub fn open(&self, id: LimitId, now: Timestamp) -> Result<OrderLimit, DomainError> {
        let limit = OrderLimit {
            id,
            user_id: self.user_id.clone(),
            space_id: self.space_id.clone(),
            side: self.side,
            window: self.window,
            max_amount: self.max_amount,
            used_amount: self.used_amount.unwrap_or(Decimal::ZERO),
            reset_at: self.window.first_reset_after(now),
            enforced: self.enforced,
            anchor_day: Some(now.date().day()),
        };
        limit.validate()?;
        Ok(limit)
    }
}

impl OrderLimit {
    /// Validate amounts.
    ///
    /// # Errors
    ///
    /// Returns error if `max_amount` is not positive or `used_amount` is
    /// negative.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_amount <= Decimal::ZERO {
            return Err(DomainError::invalid("max_amount", "must be positive"));
        }
        if self.used_amount < Decimal::ZERO {
            return Err(DomainError::invalid("used_amount", "cannot be negative"));
        }
        Ok(())
    }

    /// Specificity of this bucket for `scope`, or `None` if it does not
    /// apply. Higher wins: user+space+side (4) > user+side (3) >
    /// user+space (2) > user (1).
    #[must_use]
    pub fn specificity(&self, scope: &QuotaScope) -> Option<u8> {
        if self.user_id != scope.user_id {
            return None;
        }
        let space_matches = match &self.space_id {
            None => true,
            Some(space) => scope.space_id.as_ref() == Some(space),
        };
        let side_matches = self.side.is_none_or(|side| side == scope.side);
        if !space_matches || !side_matches {
            return None;
        }
        Some(match (self.space_id.is_some(), self.side.is_some()) {
            (true, true) => 4,
            (false, true) => 3,
            (true, false) => 2,
            (false, false) => 1,
        })
    }

    /// Day of month the window resets on.
    #[must_use]
    pub fn reset_anchor(&self) -> u32 {
        self.anchor_day.unwrap_or_else(|| self.reset_at.date().day())
    }

    /// Apply new settings in place. The id, the usage and the current
    /// window are kept unless the window length changes or the settings
    /// override `used_amount`.
    ///
    /// # Errors
    ///
    /// Returns error if the result fails validation; `self` is then left
    /// untouched.
    pub fn reconfigure(
        &mut self,
        settings: &LimitSettings,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let mut next = self.clone();
        if next.window != settings.window {
            next.window = settings.window;
            next.reset_at = settings.window.first_reset_after(now);
            next.anchor_day = Some(now.date().day());
        }
        next.max_amount = settings.max_amount;
        next.enforced = settings.enforced;
        if let Some(used) = settings.used_amount {
            next.used_amount = used;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Reset the window if `now` has passed `reset_at`. Advances `reset_at`
    /// by whole windows until it is in the future. Returns true on reset.
    pub fn roll_window(&mut self, now: Timestamp) -> bool {
        if now < self.reset_at {
            return false;
        }
        let anchor = self.reset_anchor();
        self.anchor_day = Some(anchor);
        self.used_amount = Decimal::ZERO;
        while self.reset_at <= now {
            match self.window.advance(self.reset_at, anchor) {
                Some(next) => self.reset_at = next,
                None => break,
            }
        }
        true
    }

    /// Remaining headroom given amounts already held by in-flight
    /// reservations.
    #[must_use]
    pub fn headroom(&self, held: Decimal) -> Decimal {
        self.max_amount - self.used_amount - held
    }
}

/// Best-matching bucket for `scope` among `limits`.
pub fn most_specific<'a, I>(limits: I, scope: &QuotaScope) -> Option<&'a OrderLimit>
where
    I: IntoIterator<Item = &'a OrderLimit>,
{
    limits
        .into_iter()
        .filter_map(|limit| limit.specificity(scope).map(|rank| (rank, limit)))
        .max_by_key(|(rank, _)| *rank)
        .map(|(_, limit)| limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limit(id: &str, space: Option<&str>, side: Option<OrderSide>) -> OrderLimit {
        OrderLimit {
            id: LimitId::new(id),
            user_id: UserId::new("u-1"),
            space_id: space.map(SpaceId::new),
            side,
            window: LimitWindow::Daily,
            max_amount: dec!(5000),
            used_amount: dec!(0),
            reset_at: Timestamp::parse("2026-01-20T00:00:00Z").unwrap(),
            enforced: true,
            anchor_day: None,
        }
    }

    fn settings(window: LimitWindow, max: Decimal) -> LimitSettings {
        LimitSettings {
            user_id: UserId::new("u-1"),
            space_id: None,
            side: None,
            window,
            max_amount: max,
            enforced: true,
            used_amount: None,
        }
    }

    fn scope(space: Option<&str>, side: OrderSide) -> QuotaScope {
        QuotaScope {
            user_id: UserId::new("u-1"),
            space_id: space.map(SpaceId::new),
            side,
        }
    }

    #[test]
    fn most_specific_scope_wins() {
        let limits = vec![
            limit("user", None, None),
            limit("user-space", Some("fam"), None),
            limit("user-side", None, Some(OrderSide::Buy)),
            limit("all", Some("fam"), Some(OrderSide::Buy)),
        ];

        let pick = |s: &QuotaScope| most_specific(&limits, s).map(|l| l.id.as_str().to_string());

        assert_eq!(pick(&scope(Some("fam"), OrderSide::Buy)).as_deref(), Some("all"));
        assert_eq!(pick(&scope(None, OrderSide::Buy)).as_deref(), Some("user-side"));
        assert_eq!(pick(&scope(Some("fam"), OrderSide::Sell)).as_deref(), Some("user-space"));
        assert_eq!(pick(&scope(Some("other"), OrderSide::Sell)).as_deref(), Some("user"));
    }

    #[test]
    fn other_users_limits_do_not_apply() {
        let limits = vec![limit("user", None, None)];
        let other = QuotaScope {
            user_id: UserId::new("u-2"),
            space_id: None,
            side: OrderSide::Buy,
        };
        assert!(most_specific(&limits, &other).is_none());
    }

    #[test]
    fn roll_window_resets_and_advances_past_now() {
        let mut bucket = limit("user", None, None);
        bucket.used_amount = dec!(4800);

        let before = Timestamp::parse("2026-01-19T23:59:59Z").unwrap();
        assert!(!bucket.roll_window(before));
        assert_eq!(bucket.used_amount, dec!(4800));

        let three_days_later = Timestamp::parse("2026-01-22T08:00:00Z").unwrap();
        assert!(bucket.roll_window(three_days_later));
        assert_eq!(bucket.used_amount, dec!(0));
        assert_eq!(bucket.reset_at.to_rfc3339(), "2026-01-23T00:00:00+00:00");
    }

    #[test]
    fn monthly_window_uses_calendar_months() {
        let from = Timestamp::parse("2026-01-31T00:00:00Z").unwrap();
        let next = LimitWindow::Monthly.advance(from, 31).unwrap();
        assert_eq!(next.to_rfc3339(), "2026-02-28T00:00:00+00:00");
    }

    #[test]
    fn monthly_window_returns_to_its_anchor_after_short_month() {
        let mut bucket = limit("user", None, None);
        bucket.window = LimitWindow::Monthly;
        bucket.reset_at = Timestamp::parse("2026-01-31T00:00:00Z").unwrap();

        assert!(bucket.roll_window(Timestamp::parse("2026-02-01T00:00:00Z").unwrap()));
        assert_eq!(bucket.reset_at.to_rfc3339(), "2026-02-28T00:00:00+00:00");

        assert!(bucket.roll_window(Timestamp::parse("2026-03-01T00:00:00Z").unwrap()));
        assert_eq!(bucket.reset_at.to_rfc3339(), "2026-03-31T00:00:00+00:00");

        assert!(bucket.roll_window(Timestamp::parse("2026-04-02T00:00:00Z").unwrap()));
        assert_eq!(bucket.reset_at.to_rfc3339(), "2026-04-30T00:00:00+00:00");
        assert_eq!(bucket.anchor_day, Some(31));
    }

    #[test]
    fn monthly_window_opened_on_the_31st_keeps_its_anchor() {
        let opened = Timestamp::parse("2026-01-31T10:00:00Z").unwrap();
        let mut bucket = settings(LimitWindow::Monthly, dec!(1000))
            .open(LimitId::new("m"), opened)
            .unwrap();
        assert_eq!(bucket.reset_at.to_rfc3339(), "2026-02-28T00:00:00+00:00");

        bucket.roll_window(Timestamp::parse("2026-03-05T00:00:00Z").unwrap());

        assert_eq!(bucket.reset_at.to_rfc3339(), "2026-03-31T00:00:00+00:00");
    }

    #[test]
    fn reconfigure_keeps_usage_unless_overridden() {
        let mut bucket = limit("user", None, None);
        bucket.used_amount = dec!(4800);
        let now = Timestamp::parse("2026-01-19T12:00:00Z").unwrap();

        bucket.reconfigure(&settings(LimitWindow::Daily, dec!(8000)), now).unwrap();
        assert_eq!(bucket.max_amount, dec!(8000));
        assert_eq!(bucket.used_amount, dec!(4800));
        assert_eq!(bucket.reset_at.to_rfc3339(), "2026-01-20T00:00:00+00:00");

        let mut reset = settings(LimitWindow::Monthly, dec!(8000));
        reset.used_amount = Some(dec!(0));
        bucket.reconfigure(&reset, now).unwrap();
        assert_eq!(bucket.used_amount, dec!(0));
        assert_eq!(bucket.reset_at.to_rfc3339(), "2026-02-19T00:00:00+00:00");
    }

    #[test]
    fn rejected_reconfigure_leaves_bucket_untouched() {
        let mut bucket = limit("user", None, None);
        let before = bucket.clone();
        let now = Timestamp::parse("2026-01-19T12:00:00Z").unwrap();

        let result = bucket.reconfigure(&settings(LimitWindow::Monthly, dec!(0)), now);

        assert!(result.is_err());
        assert_eq!(bucket, before);
    }

    #[test]
    fn first_reset_is_next_midnight() {
        let now = Timestamp::parse("2026-01-19T15:00:00Z").unwrap();
        let reset = LimitWindow::Daily.first_reset_after(now);
        assert_eq!(reset.to_rfc3339(), "2026-01-20T00:00:00+00:00");
    }
}
