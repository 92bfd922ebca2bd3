//! Card module - Core data model
//!
//! The entities the revision engine reads:
//! - Cards, optionally grouped into ordered series and tagged
//! - Card bodies as ordered text and code partials
//! - Per-owner recall scores
//! - An immutable point-in-time snapshot of all of the above

mod model;
mod snapshot;

pub use model::{
    Card, CardPartial, CardScore, CardSeries, NewCard, NewPartial, Owner, PartialType, Tag,
    MAX_SCORE,
};
pub use snapshot::CardSnapshot;

use serde::{Deserialize, Serialize};

// ============================================================================
// IDENTIFIERS
// ============================================================================

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Card identifier
    CardId
);
id_type!(
    /// Card series identifier
    SeriesId
);
id_type!(
    /// Tag identifier
    TagId
);
id_type!(
    /// Owner (user) identifier
    OwnerId
);
id_type!(
    /// Score record identifier
    ScoreId
);
id_type!(
    /// Card partial identifier
    PartialId
);
