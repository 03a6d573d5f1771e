//! Newtype identifiers.
//!
//! Engine-assigned ids are UUID v4 strings; caller-supplied ones (users,
//! spaces, idempotency keys) are kept verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Fresh random (UUID v4) identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(OrderId, "Unique identifier for an order (engine-assigned).");
define_id!(UserId, "Identifier of the user owning an order or quota bucket.");
define_id!(SpaceId, "Identifier of a shared space (family budget) an order belongs to.");
define_id!(
    IdempotencyKey,
    "Caller-supplied de-duplication token, unique per owning user."
);
define_id!(ProviderOrderId, "Execution venue's identifier for a filled order.");
define_id!(LimitId, "Identifier of a quota bucket.");
define_id!(ReservationId, "Identifier of an in-flight quota reservation.");

impl IdempotencyKey {
    /// Maximum accepted key length.
    pub const MAX_LEN: usize = 128;

    /// Separator between a series root and an occurrence index.
    pub const OCCURRENCE_SEPARATOR: char = '#';

    /// Returns true if the key carries an occurrence suffix.
    #[must_use]
    pub fn is_occurrence(&self) -> bool {
        self.0.contains(Self::OCCURRENCE_SEPARATOR)
    }

    /// Derive the key of a later occurrence in a recurring series.
    ///
    /// Deterministic in `(root, occurrence)` so a repeated re-arm lands on the
    /// same key and is absorbed by submission de-duplication.
    #[must_use]
    pub fn for_occurrence(root: &Self, occurrence: u32) -> Self {
        Self(format!("{}{}{occurrence}", root.0, Self::OCCURRENCE_SEPARATOR))
    }
}
