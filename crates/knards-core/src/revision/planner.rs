//! Revision planner
//!
//! Runs the whole pipeline for one request: evaluate every card of the
//! filtered set, aggregate tag statistics over all of them, and schedule the
//! eligible ones.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{aggregate_tag_stats, RevisionCandidate, SeriesGroupedScheduler, TagStats};
use crate::card::{Card, CardId, CardSnapshot, OwnerId, ScoreId, SeriesId, TagId};

// ============================================================================
// CONFIG
// ============================================================================

/// Configuration for revision planning
#[derive(Debug, Clone, Default)]
pub struct RevisionConfig {
    /// Fixed shuffle seed; `None` seeds from OS entropy on every run
    pub seed: Option<u64>,
}

// ============================================================================
// OUTPUT SHAPES
// ============================================================================

/// One card of the study order, as handed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardForRevision {
    pub id: CardId,
    pub title: Option<String>,
    pub series_id: Option<SeriesId>,
    pub series_name: Option<String>,
    pub n_in_series: i64,
    pub tags_ids: Vec<TagId>,
    pub tags_names: Vec<String>,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    pub owner_id: OwnerId,
    pub owner_name: Option<String>,
    pub score_id: Option<ScoreId>,
    pub score: u8,
    pub weight: u32,
    /// Eligible cards in this card's series
    pub series_size: usize,
}

impl From<RevisionCandidate> for CardForRevision {
    fn from(candidate: RevisionCandidate) -> Self {
        Self {
            id: candidate.id,
            title: candidate.title,
            series_id: candidate.series,
            series_name: candidate.series_name,
            n_in_series: candidate.n_in_series,
            tags_ids: candidate.tag_ids,
            tags_names: candidate.tag_names,
            created_at: candidate.created_at.timestamp_millis(),
            owner_id: candidate.owner,
            owner_name: candidate.owner_name,
            score_id: candidate.score_id,
            score: candidate.score,
            weight: candidate.weight.unwrap_or(0),
            series_size: candidate.series_size,
        }
    }
}

/// Study order plus statistics for one filtered card set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardsetAndStatistics {
    pub cardset: Vec<CardForRevision>,
    /// All cards matching the filter, due or not
    pub cards_total: usize,
    pub cards_total_by_tags: BTreeMap<String, TagStats>,
}

// ============================================================================
// PLANNER
// ============================================================================

/// Entry point of the revision engine
#[derive(Debug, Clone, Default)]
pub struct RevisionPlanner {
    config: RevisionConfig,
}

impl RevisionPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RevisionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RevisionConfig {
        &self.config
    }

    fn scheduler(&self) -> SeriesGroupedScheduler<StdRng> {
        match self.config.seed {
            Some(seed) => SeriesGroupedScheduler::seeded(seed),
            None => SeriesGroupedScheduler::from_entropy(),
        }
    }

    /// Evaluate `cards` (already filtered) against `snapshot` at `now`
    pub fn cardset_and_statistics<'a>(
        &self,
        snapshot: &CardSnapshot,
        cards: impl IntoIterator<Item = &'a Card>,
        now: DateTime<Utc>,
    ) -> CardsetAndStatistics {
        let candidates: Vec<RevisionCandidate> = cards
            .into_iter()
            .map(|card| RevisionCandidate::evaluate(card, snapshot, now))
            .collect();

        let cards_total = candidates.len();
        let cards_total_by_tags = aggregate_tag_stats(&candidates);

        let eligible: Vec<RevisionCandidate> =
            candidates.into_iter().filter(|c| c.eligible).collect();
        let due = eligible.len();
        let series: HashSet<SeriesId> = eligible.iter().filter_map(|c| c.series).collect();
        let cardset: Vec<CardForRevision> = self
            .scheduler()
            .schedule(eligible)
            .into_iter()
            .map(CardForRevision::from)
            .collect();

        tracing::info!(
            owner = ?snapshot.owner(),
            total = cards_total,
            due,
            series = series.len(),
            "Planned revision session"
        );

        CardsetAndStatistics {
            cardset,
            cards_total,
            cards_total_by_tags,
        }
    }

    /// Plan over every card in the snapshot
    pub fn plan(&self, snapshot: &CardSnapshot, now: DateTime<Utc>) -> CardsetAndStatistics {
        self.cardset_and_statistics(snapshot, snapshot.cards(), now)
    }
}

/// Convenience for callers that only know the owner id
pub fn plan_for_owner(owner: OwnerId, snapshot: &CardSnapshot, now: DateTime<Utc>) -> CardsetAndStatistics {
    let cards = snapshot.cards().iter().filter(|card| card.owner == owner);
    RevisionPlanner::new().cardset_and_statistics(snapshot, cards, now)
}
