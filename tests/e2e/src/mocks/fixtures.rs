//! Test Data Factory
//!
//! Provides utilities for generating realistic test data:
//! - Cards of a given age, optionally with a score
//! - Batch generation
//! - Pre-built scenarios for common test cases

use chrono::{DateTime, Duration, Utc};
use knards_core::{Card, CardId, CardSeries, NewCard, OwnerId, Storage, TagId};
use std::collections::HashMap;

/// Factory for creating test data
///
/// All ages are measured back from the `now` the caller passes in, so tests
/// can evaluate the same data at a fixed instant.
///
/// # Example
///
/// ```rust,ignore
/// let now = Utc::now();
///
/// // A card created ten days ago, never reviewed
/// let card = TestDataFactory::create_aged_card(&storage, owner, "ownership", 10, None, now);
///
/// // A series of three cards
/// let (series, cards) = TestDataFactory::create_series(&storage, owner, "traits", 3, 20, now);
/// ```
pub struct TestDataFactory;

/// Configuration for batch card generation
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of cards to create
    pub count: usize,
    /// Base title prefix
    pub title_prefix: String,
    /// Tag names to apply (created on demand)
    pub tags: Vec<String>,
    /// Days since creation
    pub age_days: i64,
    /// Score and days since the last review, if reviewed
    pub score: Option<(u8, i64)>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 10,
            title_prefix: "Test card".to_string(),
            tags: vec![],
            age_days: 10,
            score: None,
        }
    }
}

/// Scenario containing related test data
#[derive(Debug)]
pub struct TestScenario {
    /// IDs of created cards
    pub card_ids: Vec<CardId>,
    /// Description of the scenario
    pub description: String,
    /// Metadata for test assertions
    pub metadata: HashMap<String, String>,
}

impl TestDataFactory {
    // ========================================================================
    // SINGLE CARD CREATION
    // ========================================================================

    /// Create a card created right now, never reviewed
    pub fn create_card(storage: &Storage, owner: OwnerId, title: &str) -> Card {
        storage
            .create_card(
                owner,
                NewCard {
                    title: Some(title.to_string()),
                    ..Default::default()
                },
            )
            .expect("Failed to create card")
    }

    /// Create a card `age_days` old, optionally scored `days_since_review` ago
    pub fn create_aged_card(
        storage: &Storage,
        owner: OwnerId,
        title: &str,
        age_days: i64,
        score: Option<(u8, i64)>,
        now: DateTime<Utc>,
    ) -> Card {
        Self::create_tagged_card(storage, owner, title, &[], age_days, score, now)
    }

    /// Create an aged card carrying the named tags
    pub fn create_tagged_card(
        storage: &Storage,
        owner: OwnerId,
        title: &str,
        tags: &[&str],
        age_days: i64,
        score: Option<(u8, i64)>,
        now: DateTime<Utc>,
    ) -> Card {
        let input = NewCard {
            title: Some(title.to_string()),
            series: None,
            tags: Self::tag_ids(storage, tags),
        };
        let card = storage
            .create_card_at(owner, input, now - Duration::days(age_days))
            .expect("Failed to create card");
        if let Some((value, days)) = score {
            storage
                .record_score(card.id, owner, value, now - Duration::days(days))
                .expect("Failed to record score");
        }
        card
    }

    /// Look up or create tags by name
    pub fn tag_ids(storage: &Storage, names: &[&str]) -> Vec<TagId> {
        names
            .iter()
            .map(|name| storage.create_tag(name).expect("Failed to create tag").id)
            .collect()
    }

    // ========================================================================
    // BATCHES AND SERIES
    // ========================================================================

    /// Create a batch of standalone cards
    pub fn create_batch(
        storage: &Storage,
        owner: OwnerId,
        config: &BatchConfig,
        now: DateTime<Utc>,
    ) -> Vec<Card> {
        let tags: Vec<&str> = config.tags.iter().map(String::as_str).collect();
        (0..config.count)
            .map(|i| {
                Self::create_tagged_card(
                    storage,
                    owner,
                    &format!("{} {}", config.title_prefix, i),
                    &tags,
                    config.age_days,
                    config.score,
                    now,
                )
            })
            .collect()
    }

    /// Create a series of `len` cards, all `age_days` old and never reviewed
    pub fn create_series(
        storage: &Storage,
        owner: OwnerId,
        name: &str,
        len: usize,
        age_days: i64,
        now: DateTime<Utc>,
    ) -> (CardSeries, Vec<Card>) {
        let series = storage
            .create_series(owner, name)
            .expect("Failed to create series");
        let cards = (0..len)
            .map(|i| {
                storage
                    .create_card_at(
                        owner,
                        NewCard {
                            title: Some(format!("{} part {}", name, i + 1)),
                            series: Some(series.id),
                            tags: vec![],
                        },
                        now - Duration::days(age_days),
                    )
                    .expect("Failed to create series card")
            })
            .collect();
        (series, cards)
    }

    // ========================================================================
    // SCENARIOS
    // ========================================================================

    /// Two tag sets sharing the tag "a"
    ///
    /// - {a}: 2 cards, 1 due
    /// - {a, b}: 3 cards, 2 due
    ///
    /// Expected statistics: "a" rolls up to 5 total / 3 due, "a,b" is 3 / 2,
    /// and "b" gets no roll-up since it only occurs in one set.
    pub fn create_shared_tag_scenario(
        storage: &Storage,
        owner: OwnerId,
        now: DateTime<Utc>,
    ) -> TestScenario {
        let mut card_ids = Vec::new();

        card_ids.push(Self::create_tagged_card(storage, owner, "a due", &["a"], 10, None, now).id);
        card_ids.push(Self::create_tagged_card(storage, owner, "a fresh", &["a"], 0, None, now).id);

        for i in 0..2 {
            let title = format!("ab due {}", i);
            card_ids.push(
                Self::create_tagged_card(storage, owner, &title, &["b", "a"], 10, None, now).id,
            );
        }
        card_ids
            .push(Self::create_tagged_card(storage, owner, "ab fresh", &["a", "b"], 0, None, now).id);

        let mut metadata = HashMap::new();
        metadata.insert("a".to_string(), "5/3".to_string());
        metadata.insert("a,b".to_string(), "3/2".to_string());

        TestScenario {
            card_ids,
            description: "Tag 'a' shared by two tag sets".to_string(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestDatabaseManager;

    #[test]
    fn test_batch_creation() {
        let db = TestDatabaseManager::new_temp();
        let config = BatchConfig {
            count: 4,
            tags: vec!["rust".into()],
            ..Default::default()
        };
        let cards = TestDataFactory::create_batch(&db.storage, db.owner(), &config, Utc::now());
        assert_eq!(cards.len(), 4);
        assert!(cards.iter().all(|c| c.tags.len() == 1));
        assert_eq!(db.card_count(), 4);
    }

    #[test]
    fn test_series_positions() {
        let db = TestDatabaseManager::new_temp();
        let (_, cards) =
            TestDataFactory::create_series(&db.storage, db.owner(), "s", 3, 5, Utc::now());
        let positions: Vec<i64> = cards.iter().map(|c| c.n_in_series).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }
}
