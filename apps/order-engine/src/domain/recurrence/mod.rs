//! Recurrence Domain
//!
//! Calendar arithmetic for recurring (DCA) orders: which day an occurrence
//! lands on, and whether a series has another occurrence left.

mod rule;

pub use rule::{RecurrenceFrequency, RecurrenceRule, has_next_occurrence};
pub(crate) use rule::clamp_day;
