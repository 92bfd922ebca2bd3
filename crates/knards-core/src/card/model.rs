//! Cards, series, tags, owners and scores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CardId, OwnerId, PartialId, ScoreId, SeriesId, TagId};

/// Highest score a card can hold
pub const MAX_SCORE: u8 = u8::MAX;

// ============================================================================
// CARD
// ============================================================================

/// A flashcard owned by one user
///
/// A card without a series reference is standalone and always sits at
/// position 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    /// Optional short title; the body is made of [`CardPartial`]s
    pub title: Option<String>,
    /// Series this card belongs to
    #[serde(rename = "card_series")]
    pub series: Option<SeriesId>,
    /// Position inside the series, 1-based once settled
    pub n_in_series: i64,
    /// Tags in the order they were attached
    pub tags: Vec<TagId>,
    pub owner: OwnerId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    /// Create a standalone card created at `created_at`
    pub fn new(id: CardId, owner: OwnerId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: None,
            series: None,
            n_in_series: 1,
            tags: vec![],
            owner,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn in_series(mut self, series: SeriesId, n_in_series: i64) -> Self {
        self.series = Some(series);
        self.n_in_series = n_in_series;
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = TagId>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn is_standalone(&self) -> bool {
        self.series.is_none()
    }
}

/// Input for creating a new card
///
/// The position is never supplied by the caller: standalone cards get 1,
/// series cards are appended at the end of their series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCard {
    pub title: Option<String>,
    #[serde(rename = "card_series")]
    pub series: Option<SeriesId>,
    #[serde(default)]
    pub tags: Vec<TagId>,
}

// ============================================================================
// PARTIALS
// ============================================================================

/// How a partial's content is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialType {
    #[default]
    Text,
    Code,
}

impl PartialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartialType::Text => "text",
            PartialType::Code => "code",
        }
    }
}

impl std::fmt::Display for PartialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PartialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(PartialType::Text),
            "code" => Ok(PartialType::Code),
            _ => Err(format!("Unknown partial type: {}", s)),
        }
    }
}

/// One block of a card's body
///
/// Partials of a card are shown in ascending `position`, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPartial {
    pub id: PartialId,
    pub card: CardId,
    pub partial_type: PartialType,
    pub content: String,
    pub position: i64,
}

/// Input for appending a partial to a card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPartial {
    #[serde(default)]
    pub partial_type: PartialType,
    pub content: String,
}

// ============================================================================
// SERIES, TAGS, OWNERS
// ============================================================================

/// An ordered group of cards that is always studied as one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSeries {
    pub id: SeriesId,
    pub name: String,
    pub owner: OwnerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub name: String,
}

// ============================================================================
// SCORE
// ============================================================================

/// Recall score of one card for one owner
///
/// A missing score record means the card was never revised: score 0,
/// last revision at card creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardScore {
    pub id: ScoreId,
    pub card: CardId,
    pub owner: OwnerId,
    pub score: u8,
    pub last_revised_at: DateTime<Utc>,
}
