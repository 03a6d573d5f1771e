//! Scheduling priority.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Evaluation/dispatch priority. Affects ordering only, never correctness.
///
/// Variants are declared low to high so the derived `Ord` ranks `High` first
/// when sorted descending.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Evaluated after everything else.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Evaluated first.
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering() {
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::default(), Priority::Normal);
    }
}
