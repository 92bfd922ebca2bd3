//! Point-in-time view over one owner's collection
//!
//! The revision engine never reads storage directly. It works on a snapshot
//! that was taken in a single read transaction and is never mutated while a
//! scheduling run uses it.

use std::collections::HashMap;

use super::{Card, CardId, CardScore, CardSeries, Owner, OwnerId, SeriesId, Tag, TagId};

/// Immutable collection snapshot for one owner
#[derive(Debug, Clone, Default)]
pub struct CardSnapshot {
    owner: Option<OwnerId>,
    cards: Vec<Card>,
    series: HashMap<SeriesId, CardSeries>,
    tags: HashMap<TagId, Tag>,
    owners: HashMap<OwnerId, Owner>,
    scores: HashMap<CardId, CardScore>,
}

impl CardSnapshot {
    /// Create an empty snapshot for `owner`
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner: Some(owner),
            ..Default::default()
        }
    }

    pub fn with_card(mut self, card: Card) -> Self {
        self.cards.push(card);
        self
    }

    pub fn with_series(mut self, series: CardSeries) -> Self {
        self.series.insert(series.id, series);
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.insert(tag.id, tag);
        self
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owners.insert(owner.id, owner);
        self
    }

    /// Attach a score record. Scores of other owners are ignored.
    pub fn with_score(mut self, score: CardScore) -> Self {
        if self.owner.is_none_or(|owner| owner == score.owner) {
            self.scores.insert(score.card, score);
        }
        self
    }

    /// Owner whose scores this snapshot carries
    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn series(&self, id: SeriesId) -> Option<&CardSeries> {
        self.series.get(&id)
    }

    pub fn all_series(&self) -> impl Iterator<Item = &CardSeries> {
        self.series.values()
    }

    pub fn tag(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(&id)
    }

    pub fn owner_info(&self, id: OwnerId) -> Option<&Owner> {
        self.owners.get(&id)
    }

    pub fn score_for(&self, card: CardId) -> Option<&CardScore> {
        self.scores.get(&card)
    }

    /// Cards of `series` ordered by position
    pub fn cards_in_series(&self, series: SeriesId) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self
            .cards
            .iter()
            .filter(|card| card.series == Some(series))
            .collect();
        cards.sort_by_key(|card| (card.n_in_series, card.id));
        cards
    }

    /// Resolve a card's series, treating dangling references as standalone
    pub fn resolved_series(&self, card: &Card) -> Option<&CardSeries> {
        card.series.and_then(|id| self.series.get(&id))
    }

    /// Resolve a card's tags in attachment order, skipping dangling ids
    pub fn resolved_tags(&self, card: &Card) -> Vec<&Tag> {
        card.tags.iter().filter_map(|id| self.tags.get(id)).collect()
    }
}
