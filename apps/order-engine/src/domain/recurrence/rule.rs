//! Recurrence rule and schedule arithmetic.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{DomainError, Timestamp};

/// How often a recurring order repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceFrequency {
    /// Every day.
    Daily,
    /// Once a week on an ISO weekday.
    Weekly,
    /// Once a month on a day of month (clamped to the month's last day).
    Monthly,
}

/// A recurrence pattern plus its anchor day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// Repeat frequency.
    pub frequency: RecurrenceFrequency,
    /// ISO weekday (1 = Monday .. 7 = Sunday) for weekly, day of month
    /// (1..=31) for monthly, ignored for daily.
    #[serde(default)]
    pub day: Option<u32>,
}

impl RecurrenceRule {
    /// Daily rule.
    #[must_use]
    pub const fn daily() -> Self {
        Self {
            frequency: RecurrenceFrequency::Daily,
            day: None,
        }
    }

    /// Weekly rule on an ISO weekday.
    #[must_use]
    pub const fn weekly(iso_weekday: u32) -> Self {
        Self {
            frequency: RecurrenceFrequency::Weekly,
            day: Some(iso_weekday),
        }
    }

    /// Monthly rule on a day of month.
    #[must_use]
    pub const fn monthly(day_of_month: u32) -> Self {
        Self {
            frequency: RecurrenceFrequency::Monthly,
            day: Some(day_of_month),
        }
    }

    /// Validate the anchor day for the frequency.
    ///
    /// # Errors
    ///
    /// Returns error if weekly/monthly rules lack a day or the day is out of
    /// range.
    pub fn validate(&self) -> Result<(), DomainError> {
        match (self.frequency, self.day) {
            (RecurrenceFrequency::Daily, _) => Ok(()),
            (RecurrenceFrequency::Weekly, Some(1..=7)) => Ok(()),
            (RecurrenceFrequency::Monthly, Some(1..=31)) => Ok(()),
            (RecurrenceFrequency::Weekly, _) => Err(DomainError::invalid(
                "recurrence_day",
                "weekly recurrence needs an ISO weekday 1..=7",
            )),
            (RecurrenceFrequency::Monthly, _) => Err(DomainError::invalid(
                "recurrence_day",
                "monthly recurrence needs a day of month 1..=31",
            )),
        }
    }

    /// First matching day on or after `date`.
    #[must_use]
    pub fn first_on_or_after(&self, date: NaiveDate) -> NaiveDate {
        match self.frequency {
            RecurrenceFrequency::Daily => date,
            RecurrenceFrequency::Weekly => {
                let target = self.day.unwrap_or(1);
                let current = date.weekday().number_from_monday();
                let ahead = (target + 7 - current) % 7;
                date.checked_add_days(Days::new(u64::from(ahead)))
                    .unwrap_or(date)
            }
            RecurrenceFrequency::Monthly => {
                let anchor = self.day.unwrap_or(1);
                let this_month = clamp_day(date.year(), date.month(), anchor);
                match this_month {
                    Some(candidate) if candidate >= date => candidate,
                    _ => next_month_anchor(date, anchor).unwrap_or(date),
                }
            }
        }
    }

    /// First matching day strictly after `date`.
    #[must_use]
    pub fn next_after(&self, date: NaiveDate) -> NaiveDate {
        date.succ_opt()
            .map_or(date, |tomorrow| self.first_on_or_after(tomorrow))
    }

    /// Schedule time of the first occurrence for an order submitted at `now`.
    #[must_use]
    pub fn first_occurrence(&self, now: Timestamp) -> Timestamp {
        Timestamp::start_of(self.first_on_or_after(now.date()))
    }

    /// Schedule time of the occurrence following `previous`.
    #[must_use]
    pub fn following(&self, previous: Timestamp) -> Timestamp {
        Timestamp::start_of(self.next_after(previous.date()))
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.frequency, self.day) {
            (RecurrenceFrequency::Daily, _) => write!(f, "daily"),
            (RecurrenceFrequency::Weekly, Some(day)) => write!(f, "weekly(iso_day={day})"),
            (RecurrenceFrequency::Monthly, Some(day)) => write!(f, "monthly(day={day})"),
            (frequency, None) => write!(f, "{frequency:?}"),
        }
    }
}

/// Returns true if a series whose current order carries `execution_count`
/// may arm one more occurrence. `None` means the series is unbounded.
#[must_use]
pub fn has_next_occurrence(execution_count: u32, max_executions: Option<u32>) -> bool {
    max_executions.is_none_or(|max| execution_count < max)
}

/// `day` of the given month, clamped to the month's last day.
pub(crate) fn clamp_day(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last_day = first
        .checked_add_months(Months::new(1))?
        .pred_opt()?
        .day();
    NaiveDate::from_ymd_opt(year, month, day.min(last_day))
}

fn next_month_anchor(date: NaiveDate, anchor: u32) -> Option<NaiveDate> {
    let first_of_next = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?
        .checked_add_months(Months::new(1))?;
    clamp_day(first_of_next.year(), first_of_next.month(), anchor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // 2026-01-19 is a Monday.
    #[test_case(RecurrenceRule::weekly(1), d(2026, 1, 19), d(2026, 1, 19) ; "weekly same day")]
    #[test_case(RecurrenceRule::weekly(5), d(2026, 1, 19), d(2026, 1, 23) ; "weekly later this week")]
    #[test_case(RecurrenceRule::weekly(7), d(2026, 1, 19), d(2026, 1, 25) ; "weekly sunday")]
    #[test_case(RecurrenceRule::monthly(15), d(2026, 1, 19), d(2026, 2, 15) ; "monthly next month")]
    #[test_case(RecurrenceRule::monthly(31), d(2026, 2, 3), d(2026, 2, 28) ; "monthly clamped")]
    #[test_case(RecurrenceRule::monthly(19), d(2026, 1, 19), d(2026, 1, 19) ; "monthly same day")]
    #[test_case(RecurrenceRule::daily(), d(2026, 1, 19), d(2026, 1, 19) ; "daily")]
    fn first_on_or_after(rule: RecurrenceRule, from: NaiveDate, expected: NaiveDate) {
        assert_eq!(rule.first_on_or_after(from), expected);
    }

    #[test_case(RecurrenceRule::weekly(1), d(2026, 1, 19), d(2026, 1, 26) ; "weekly advances a week")]
    #[test_case(RecurrenceRule::monthly(31), d(2026, 1, 31), d(2026, 2, 28) ; "monthly into short month")]
    #[test_case(RecurrenceRule::monthly(31), d(2026, 2, 28), d(2026, 3, 31) ; "monthly back to long month")]
    #[test_case(RecurrenceRule::monthly(30), d(2026, 12, 30), d(2027, 1, 30) ; "monthly year rollover")]
    #[test_case(RecurrenceRule::daily(), d(2026, 12, 31), d(2027, 1, 1) ; "daily year rollover")]
    fn next_after(rule: RecurrenceRule, from: NaiveDate, expected: NaiveDate) {
        assert_eq!(rule.next_after(from), expected);
    }

    #[test]
    fn validate_rejects_missing_or_out_of_range_day() {
        assert!(RecurrenceRule::weekly(0).validate().is_err());
        assert!(RecurrenceRule::weekly(8).validate().is_err());
        assert!(RecurrenceRule::monthly(32).validate().is_err());
        assert!(
            RecurrenceRule {
                frequency: RecurrenceFrequency::Monthly,
                day: None
            }
            .validate()
            .is_err()
        );
        assert!(RecurrenceRule::daily().validate().is_ok());
        assert!(RecurrenceRule::weekly(7).validate().is_ok());
    }

    #[test]
    fn first_occurrence_is_midnight_utc() {
        let now = Timestamp::parse("2026-01-19T15:30:00Z").unwrap();
        let first = RecurrenceRule::weekly(3).first_occurrence(now);
        assert_eq!(first.to_rfc3339(), "2026-01-21T00:00:00+00:00");
    }

    #[test]
    fn series_bound() {
        assert!(has_next_occurrence(51, Some(52)));
        assert!(!has_next_occurrence(52, Some(52)));
        assert!(has_next_occurrence(1_000, None));
    }
}
