//! Eligibility and urgency weight
//!
//! A card is due when its score is lower than the number of whole days since
//! its last revision. Due cards get an integer weight:
//!
//! ```text
//! weight = floor(1000 * e^(-0.6 * score) + 18 * days_passed^0.7)
//! ```
//!
//! The exponential term makes well-known cards sharply less urgent; the
//! power term grows slowly and only dominates after long neglect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Urgency of a card with score 0
pub const BASE_URGENCY: f64 = 1000.0;
/// Exponential decay of urgency per score point
pub const DECAY_RATE: f64 = 0.6;
/// Multiplier of the elapsed-time term
pub const RECENCY_COEFFICIENT: f64 = 18.0;
/// Exponent of the elapsed-time term
pub const RECENCY_EXPONENT: f64 = 0.7;

/// Outcome of evaluating one card at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub days_passed: i64,
    pub eligible: bool,
    /// Only present for eligible cards
    pub weight: Option<u32>,
}

/// Whole UTC days between `last_revision` and `now`
///
/// Clamped to zero when `now` lies before `last_revision` (clock skew).
pub fn days_passed(last_revision: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last_revision).num_days().max(0)
}

/// A card is due when `score < days_passed`; a card revised today never is
pub fn is_eligible(score: u8, days_passed: i64) -> bool {
    days_passed > 0 && i64::from(score) < days_passed
}

/// Urgency weight, truncated toward zero
pub fn weight(score: u8, days_passed: i64) -> u32 {
    let days = days_passed.max(0) as f64;
    let urgency = BASE_URGENCY * (-DECAY_RATE * f64::from(score)).exp()
        + RECENCY_COEFFICIENT * days.powf(RECENCY_EXPONENT);
    urgency as u32
}

/// Evaluate a card's score and last revision at `now`
pub fn evaluate(score: u8, last_revision: DateTime<Utc>, now: DateTime<Utc>) -> Evaluation {
    let days_passed = days_passed(last_revision, now);
    let eligible = is_eligible(score, days_passed);
    Evaluation {
        days_passed,
        eligible,
        weight: eligible.then(|| weight(score, days_passed)),
    }
}
