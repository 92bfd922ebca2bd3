//! # Knards Core
//!
//! Revision scheduling engine for knards flashcards:
//!
//! - **Eligibility & weight**: a card is due once more days have passed since
//!   its last revision than its recall score; due cards get an urgency weight
//!   that falls with the score and rises with elapsed time
//! - **Tag statistics**: totals and due counts per tag set, with per-tag
//!   roll-ups for tags shared by several sets
//! - **Series-grouped scheduling**: heaviest cards first, shuffled within a
//!   weight, series always studied as one ordered block
//! - **Series renumbering**: reordering a series under a per-write uniqueness
//!   constraint through negative placeholders, with recovery
//! - **Grading**: self-review along a Fibonacci score ladder
//! - **Storage**: SQLite reference store with point-in-time snapshots
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use knards_core::card::{Card, CardId, CardSnapshot, OwnerId};
//! use knards_core::revision::{RevisionConfig, RevisionPlanner};
//!
//! let now = Utc::now();
//! let owner = OwnerId(1);
//! let snapshot = CardSnapshot::new(owner)
//!     .with_card(Card::new(CardId(1), owner, now - Duration::days(3)))
//!     .with_card(Card::new(CardId(2), owner, now));
//!
//! let planner = RevisionPlanner::with_config(RevisionConfig { seed: Some(7) });
//! let plan = planner.plan(&snapshot, now);
//!
//! assert_eq!(plan.cards_total, 2);
//! assert_eq!(plan.cardset.len(), 1);
//! assert_eq!(plan.cardset[0].id, CardId(1));
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): compile SQLite into the binary

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod card;
pub mod filter;
pub mod renumber;
pub mod revision;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Data model
pub use card::{
    Card, CardId, CardPartial, CardScore, CardSeries, CardSnapshot, NewCard, NewPartial, Owner,
    OwnerId, PartialId, PartialType, ScoreId, SeriesId, Tag, TagId, MAX_SCORE,
};

// Revision engine
pub use revision::{
    aggregate_tag_stats, apply_grade, grade_options, tags_key, CardForRevision,
    CardsetAndStatistics, Grade, GradeOptions, RevisionCandidate, RevisionConfig,
    RevisionPlanner, SeriesGroupedScheduler, TagStats,
};

// Renumbering
pub use renumber::{
    PositionChange, PositionWriter, RenumberError, RenumberPlan, RenumberRequest, RenumberState,
};

// Filtering
pub use filter::{paginate, CardFilter, Page, TagInclusion, DEFAULT_PAGE_SIZE};

// Storage layer
pub use storage::{Result, Storage, StorageError};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Card, CardFilter, CardId, CardSnapshot, CardsetAndStatistics, Grade, NewCard, OwnerId,
        RenumberRequest, Result, RevisionConfig, RevisionPlanner, SeriesId, Storage,
        StorageError, TagId,
    };
}
