//! Self-review grading
//!
//! Scores walk along a Fibonacci-like ladder (0, 1, 2, 3, 5, 8, ... 233).
//! After a review the owner picks one of four grades, each moving the score to
//! another rung. Since a card is due once `score < days_passed`, the rung is
//! also roughly the number of days until the card comes back.

use serde::{Deserialize, Serialize};

/// Score ladder; the last rung is the highest score that fits in a `u8`
pub const SCORE_LADDER: [u8; 13] = [0, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233];

/// Outcome of a self-review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    /// Knew it very well: one rung up
    Up,
    /// Minor mistakes: one rung down
    Down,
    /// Major mistakes: down to a third of the ladder climbed so far
    DownToThird,
    /// Did not know it at all
    Reset,
}

impl std::str::FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Grade::Up),
            "down" => Ok(Grade::Down),
            "down_to_third" | "third" => Ok(Grade::DownToThird),
            "reset" | "zero" => Ok(Grade::Reset),
            _ => Err(format!("Unknown grade: {}", s)),
        }
    }
}

/// Scores each grade would produce from the current score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeOptions {
    pub up: u8,
    pub down: u8,
    pub down_to_third: u8,
    pub reset: u8,
}

impl GradeOptions {
    pub fn score_for(&self, grade: Grade) -> u8 {
        match grade {
            Grade::Up => self.up,
            Grade::Down => self.down,
            Grade::DownToThird => self.down_to_third,
            Grade::Reset => self.reset,
        }
    }
}

/// Rung of the ladder for `score`, snapping down when off the ladder
fn rung(score: u8) -> usize {
    SCORE_LADDER
        .iter()
        .rposition(|&value| value <= score)
        .unwrap_or(0)
}

/// Possible next scores from `score`
pub fn grade_options(score: u8) -> GradeOptions {
    let rung = rung(score);
    let top = SCORE_LADDER.len() - 1;

    let up = SCORE_LADDER[(rung + 1).min(top)];
    let (down, down_to_third) = if rung < 2 {
        (0, 0)
    } else {
        (SCORE_LADDER[rung - 1], SCORE_LADDER[(rung + 2) / 3])
    };

    GradeOptions {
        up,
        down,
        down_to_third,
        reset: 0,
    }
}

/// Score after grading a review of a card holding `score`
pub fn apply_grade(score: u8, grade: Grade) -> u8 {
    grade_options(score).score_for(grade)
}
