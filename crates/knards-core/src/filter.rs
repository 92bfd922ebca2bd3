//! Card Filtering and Pagination
//!
//! Narrows an owner's collection down to the cards a listing or revision
//! request asks for: by series, by tags (any or all of them), and by a
//! case-insensitive fulltext match on the title. Matches are returned newest
//! first.

use serde::{Deserialize, Serialize};

use crate::card::{Card, CardSnapshot, OwnerId, SeriesId, TagId};

/// How multiple requested tags combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagInclusion {
    /// Card carries at least one of the tags
    #[default]
    #[serde(alias = "or")]
    Any,
    /// Card carries every tag
    #[serde(alias = "and")]
    All,
}

impl std::str::FromStr for TagInclusion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" | "or" => Ok(TagInclusion::Any),
            "all" | "and" => Ok(TagInclusion::All),
            _ => Err(format!("Unknown tag inclusion: {}", s)),
        }
    }
}

/// Query over a card collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CardFilter {
    pub owner: Option<OwnerId>,
    pub series: Option<SeriesId>,
    pub tags: Vec<TagId>,
    pub tag_inclusion: TagInclusion,
    pub fulltext: Option<String>,
}

impl CardFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owned_by(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn in_series(mut self, series: SeriesId) -> Self {
        self.series = Some(series);
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = TagId>, inclusion: TagInclusion) -> Self {
        self.tags = tags.into_iter().collect();
        self.tag_inclusion = inclusion;
        self
    }

    pub fn with_fulltext(mut self, text: impl Into<String>) -> Self {
        self.fulltext = Some(text.into());
        self
    }

    /// Whether `card` satisfies every criterion
    pub fn matches(&self, card: &Card) -> bool {
        if self.owner.is_some_and(|owner| owner != card.owner) {
            return false;
        }
        if self.series.is_some() && self.series != card.series {
            return false;
        }
        if !self.tags.is_empty() {
            let has = |tag: &TagId| card.tags.contains(tag);
            let tags_match = match self.tag_inclusion {
                TagInclusion::Any => self.tags.iter().any(has),
                TagInclusion::All => self.tags.iter().all(has),
            };
            if !tags_match {
                return false;
            }
        }
        if let Some(text) = self.fulltext.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let found = card
                .title
                .as_deref()
                .is_some_and(|title| title.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }
        true
    }

    /// Matching cards of `snapshot`, newest first
    pub fn apply<'a>(&self, snapshot: &'a CardSnapshot) -> Vec<&'a Card> {
        let mut cards: Vec<&Card> = snapshot.cards().iter().filter(|c| self.matches(c)).collect();
        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        cards
    }
}

// ============================================================================
// PAGINATION
// ============================================================================

/// Default number of cards per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of items across all pages
    pub count: usize,
    /// Next page number, if any
    pub next: Option<usize>,
    /// Previous page number, if any
    pub previous: Option<usize>,
    pub results: Vec<T>,
}

/// Cut `items` into pages of `page_size` and return 1-based page `page`
///
/// A page past the end is empty but still reports the total count.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let count = items.len();
    let pages = count.div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size).min(count);
    let end = start.saturating_add(page_size).min(count);

    Page {
        count,
        next: (page < pages).then_some(page + 1),
        previous: (page > 1 && page <= pages).then_some(page - 1),
        results: items[start..end].to_vec(),
    }
}
