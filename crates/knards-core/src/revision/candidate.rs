//! Revision candidates
//!
//! A candidate is one card evaluated for one owner at one instant. It is
//! rebuilt from the snapshot on every request and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::eligibility;
use crate::card::{Card, CardId, CardSnapshot, OwnerId, ScoreId, SeriesId, TagId};

/// Separator between tag names inside a tags key
pub const TAGS_KEY_SEPARATOR: &str = ",";

/// Escapes a literal separator or backslash inside a tag name
const TAGS_KEY_ESCAPE: char = '\\';

/// Canonical key for one exact tag combination
///
/// Names are sorted and de-duplicated so two cards share a key iff they carry
/// the same tag set, whatever order the tags were attached in. A name that
/// itself contains the separator is escaped, so the single tag `a,b` keys as
/// `a\,b` and never meets the pair `a` + `b`.
pub fn tags_key<S: AsRef<str>>(names: &[S]) -> String {
    let mut names: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    names.sort_unstable();
    names.dedup();
    names
        .into_iter()
        .map(escape_tag_name)
        .collect::<Vec<_>>()
        .join(TAGS_KEY_SEPARATOR)
}

fn escape_tag_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if c == TAGS_KEY_ESCAPE || TAGS_KEY_SEPARATOR.contains(c) {
            escaped.push(TAGS_KEY_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// One card evaluated for revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionCandidate {
    pub id: CardId,
    pub title: Option<String>,
    pub series: Option<SeriesId>,
    pub series_name: Option<String>,
    pub n_in_series: i64,
    pub tag_ids: Vec<TagId>,
    /// Tag names in attachment order
    pub tag_names: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub owner: OwnerId,
    pub owner_name: Option<String>,
    pub score: u8,
    pub score_id: Option<ScoreId>,
    pub days_passed: i64,
    pub eligible: bool,
    pub weight: Option<u32>,
    pub tags_key: String,
    /// Eligible cards sharing this card's series (1 for standalone cards).
    /// Only known once the whole eligible set has been grouped.
    pub series_size: usize,
}

impl RevisionCandidate {
    /// Evaluate `card` against the snapshot's score records at `now`
    ///
    /// A card without a score record counts as score 0, last revised when it
    /// was created. A series reference the snapshot does not know is dropped.
    pub fn evaluate(card: &Card, snapshot: &CardSnapshot, now: DateTime<Utc>) -> Self {
        let score = snapshot.score_for(card.id);
        let (score_value, last_revision) = score
            .map(|s| (s.score, s.last_revised_at))
            .unwrap_or((0, card.created_at));
        let evaluation = eligibility::evaluate(score_value, last_revision, now);

        let series = snapshot.resolved_series(card);
        let tags = snapshot.resolved_tags(card);
        let tag_names: Vec<String> = tags.iter().map(|tag| tag.name.clone()).collect();

        Self {
            id: card.id,
            title: card.title.clone(),
            series: series.map(|s| s.id),
            series_name: series.map(|s| s.name.clone()),
            n_in_series: card.n_in_series,
            tag_ids: tags.iter().map(|tag| tag.id).collect(),
            tags_key: tags_key(&tag_names),
            tag_names,
            created_at: card.created_at,
            owner: card.owner,
            owner_name: snapshot.owner_info(card.owner).map(|o| o.name.clone()),
            score: score_value,
            score_id: score.map(|s| s.id),
            days_passed: evaluation.days_passed,
            eligible: evaluation.eligible,
            weight: evaluation.weight,
            series_size: 1,
        }
    }

    /// Evaluate every card of the snapshot
    pub fn evaluate_all(snapshot: &CardSnapshot, now: DateTime<Utc>) -> Vec<Self> {
        snapshot
            .cards()
            .iter()
            .map(|card| Self::evaluate(card, snapshot, now))
            .collect()
    }
}
