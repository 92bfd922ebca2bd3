//! Series Renumbering
//!
//! Applies a new order to the cards of one series when storage enforces
//! uniqueness of (series, position) on every single write. Assigning the new
//! positions directly can collide halfway through (swapping 1 and 2), so the
//! plan goes through a disjoint placeholder domain:
//!
//! 1. Every card, sorted by target position, gets the placeholder `-target`.
//!    Placeholders are negative and distinct, so they never meet an existing
//!    positive position or each other.
//! 2. Every placeholder is flipped back to its positive target.
//!
//! Because the placeholder of a card is always `-target`, phase 2 needs no
//! memory of the request: flipping every negative position of a series is
//! enough to finish an interrupted renumbering.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::card::{CardId, SeriesId};

// ============================================================================
// REQUEST
// ============================================================================

/// Desired position of one card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionChange {
    pub id: CardId,
    pub n_in_series: i64,
}

/// Body of a reorder request: the new position of every card of a series
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenumberRequest {
    pub changes: Vec<PositionChange>,
}

impl RenumberRequest {
    pub fn new(changes: impl IntoIterator<Item = (CardId, i64)>) -> Self {
        Self {
            changes: changes
                .into_iter()
                .map(|(id, n_in_series)| PositionChange { id, n_in_series })
                .collect(),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Phase of the renumbering protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenumberPhase {
    /// Writing negative placeholders
    Placeholders,
    /// Flipping placeholders to their targets
    Targets,
}

impl std::fmt::Display for RenumberPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenumberPhase::Placeholders => write!(f, "placeholders"),
            RenumberPhase::Targets => write!(f, "targets"),
        }
    }
}

/// Renumbering error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RenumberError {
    /// Nothing to renumber
    #[error("Renumber request is empty")]
    Empty,
    /// Same card listed twice
    #[error("Card {0} appears more than once")]
    DuplicateCard(CardId),
    /// Two cards asked for the same position
    #[error("Position {0} requested more than once")]
    DuplicatePosition(i64),
    /// Target outside 1..=N
    #[error("Position {position} is outside 1..={len}")]
    PositionOutOfRange { position: i64, len: usize },
    /// Card does not belong to the series
    #[error("Card {card} is not part of series {series}")]
    ForeignCard { card: CardId, series: SeriesId },
    /// Card of the series left out of the request
    #[error("Card {0} of the series is missing from the request")]
    MissingCard(CardId),
    /// A write failed partway; the series may hold placeholder positions
    #[error("Renumbering interrupted while writing {phase} (card {card}): {source}")]
    Interrupted {
        phase: RenumberPhase,
        card: CardId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Placeholders cannot be resolved without the request that wrote them
    #[error("Series {0} was interrupted before all placeholders were written; re-run the same request")]
    NeedsReplay(SeriesId),
}

impl RenumberError {
    /// Failures a caller can recover from by retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RenumberError::Interrupted { .. } | RenumberError::NeedsReplay(_)
        )
    }
}

/// Renumber result type
pub type Result<T> = std::result::Result<T, RenumberError>;

// ============================================================================
// WRITER SEAM
// ============================================================================

/// Something that persists one card position per call
///
/// Each call must be durable before it returns; uniqueness of positions may
/// be checked on every call.
pub trait PositionWriter {
    type Error: std::error::Error + Send + Sync + 'static;

    fn write_position(&mut self, card: CardId, position: i64) -> std::result::Result<(), Self::Error>;
}

// ============================================================================
// STATE DETECTION
// ============================================================================

/// Condition of a series' stored positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenumberState {
    /// No placeholders left
    Settled,
    /// Every position is a placeholder; phase 2 is pending
    Placeholders,
    /// Some placeholders and some positive positions
    Mixed,
}

impl RenumberState {
    pub fn detect(positions: impl IntoIterator<Item = i64>) -> Self {
        let (mut negative, mut positive) = (0usize, 0usize);
        for position in positions {
            if position < 0 {
                negative += 1;
            } else {
                positive += 1;
            }
        }
        match (negative, positive) {
            (0, _) => RenumberState::Settled,
            (_, 0) => RenumberState::Placeholders,
            _ => RenumberState::Mixed,
        }
    }

    pub fn needs_recovery(&self) -> bool {
        !matches!(self, RenumberState::Settled)
    }
}

// ============================================================================
// PLAN
// ============================================================================

/// A validated renumbering, ready to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenumberPlan {
    series: SeriesId,
    /// (card, target) sorted by target; targets are exactly 1..=N
    assignments: Vec<(CardId, i64)>,
}

impl RenumberPlan {
    /// Check `request` against the cards currently in `series`
    ///
    /// Nothing is written when validation fails.
    pub fn validate(
        series: SeriesId,
        request: &RenumberRequest,
        series_cards: &[CardId],
    ) -> Result<Self> {
        if request.changes.is_empty() {
            return Err(RenumberError::Empty);
        }

        let members: HashSet<CardId> = series_cards.iter().copied().collect();
        let len = request.changes.len();
        let mut seen_cards = HashSet::with_capacity(len);
        let mut seen_positions = HashSet::with_capacity(len);

        for change in &request.changes {
            if !seen_cards.insert(change.id) {
                return Err(RenumberError::DuplicateCard(change.id));
            }
            if !members.contains(&change.id) {
                return Err(RenumberError::ForeignCard { card: change.id, series });
            }
            if change.n_in_series < 1 || change.n_in_series > len as i64 {
                return Err(RenumberError::PositionOutOfRange {
                    position: change.n_in_series,
                    len,
                });
            }
            if !seen_positions.insert(change.n_in_series) {
                return Err(RenumberError::DuplicatePosition(change.n_in_series));
            }
        }

        if let Some(missing) = series_cards.iter().find(|card| !seen_cards.contains(card)) {
            return Err(RenumberError::MissingCard(*missing));
        }

        let mut assignments: Vec<(CardId, i64)> = request
            .changes
            .iter()
            .map(|change| (change.id, change.n_in_series))
            .collect();
        assignments.sort_by_key(|&(_, target)| target);

        Ok(Self { series, assignments })
    }

    pub fn series(&self) -> SeriesId {
        self.series
    }

    /// (card, target) pairs in target order
    pub fn assignments(&self) -> &[(CardId, i64)] {
        &self.assignments
    }

    /// Run both phases against `writer`
    pub fn apply<W: PositionWriter>(&self, writer: &mut W) -> Result<()> {
        for (index, &(card, _)) in self.assignments.iter().enumerate() {
            let placeholder = -(index as i64 + 1);
            write(writer, card, placeholder, RenumberPhase::Placeholders)?;
        }
        tracing::debug!(series = %self.series, cards = self.assignments.len(), "Placeholders written");

        for &(card, target) in &self.assignments {
            write(writer, card, target, RenumberPhase::Targets)?;
        }
        tracing::info!(series = %self.series, cards = self.assignments.len(), "Series renumbered");
        Ok(())
    }
}

fn write<W: PositionWriter>(
    writer: &mut W,
    card: CardId,
    position: i64,
    phase: RenumberPhase,
) -> Result<()> {
    writer
        .write_position(card, position)
        .map_err(|e| RenumberError::Interrupted {
            phase,
            card,
            source: Box::new(e),
        })
}

/// Finish an interrupted renumbering by flipping every placeholder
///
/// `positions` are the stored positions of every card of `series`. Returns
/// the number of cards moved.
///
/// Phase 2 writes targets in ascending order, so a series it left behind
/// holds exactly the positives `1..=k` and the placeholders `-(k+1)..=-N`.
/// Any other mix means phase 1 never completed: the request is then only
/// partly on disk and fails with [`RenumberError::NeedsReplay`] instead of
/// being flipped into an order nobody asked for.
pub fn resume_from_placeholders<W: PositionWriter>(
    series: SeriesId,
    positions: &[(CardId, i64)],
    writer: &mut W,
) -> Result<usize> {
    let mut pending: Vec<(CardId, i64)> = positions
        .iter()
        .filter(|&&(_, position)| position < 0)
        .map(|&(card, position)| (card, -position))
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let mut held: Vec<i64> = positions
        .iter()
        .map(|&(_, position)| position)
        .filter(|&position| position >= 0)
        .collect();
    held.sort_unstable();
    pending.sort_by_key(|&(_, target)| target);

    let settled = held.len() as i64;
    let prefix_written = held.iter().copied().eq(1..=settled);
    let placeholders_complete = pending
        .iter()
        .map(|&(_, target)| target)
        .eq(settled + 1..=positions.len() as i64);
    if !(prefix_written && placeholders_complete) {
        tracing::warn!(
            %series,
            settled,
            placeholders = pending.len(),
            "Placeholders do not match an interrupted second phase, renumbering must be replayed"
        );
        return Err(RenumberError::NeedsReplay(series));
    }

    for &(card, target) in &pending {
        write(writer, card, target, RenumberPhase::Targets)?;
    }

    tracing::info!(%series, cards = pending.len(), "Recovered interrupted renumbering");
    Ok(pending.len())
}
