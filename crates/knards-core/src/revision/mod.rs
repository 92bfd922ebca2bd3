//! Revision Engine
//!
//! Decides which cards are due, how urgent they are and in which order they
//! are studied:
//! - Eligibility and urgency weight per card
//! - Tag statistics over the whole filtered set
//! - Weight-bucketed, shuffled study order with series kept together
//! - Self-review grading along the score ladder

mod candidate;
pub mod eligibility;
mod grading;
mod planner;
mod scheduler;
mod stats;

pub use candidate::{tags_key, RevisionCandidate, TAGS_KEY_SEPARATOR};
pub use eligibility::{days_passed, evaluate, is_eligible, weight, Evaluation};
pub use grading::{apply_grade, grade_options, Grade, GradeOptions, SCORE_LADDER};
pub use planner::{
    plan_for_owner, CardForRevision, CardsetAndStatistics, RevisionConfig, RevisionPlanner,
};
pub use scheduler::SeriesGroupedScheduler;
pub use stats::{aggregate_tag_stats, TagStats};
