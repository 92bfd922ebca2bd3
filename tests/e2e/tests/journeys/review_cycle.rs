//! Journey: review cycle
//!
//! A card is studied, graded, disappears from the session and comes back
//! once more days have passed than its new score.

use chrono::{DateTime, Duration, Utc};
use knards_core::{grade_options, CardFilter, CardId, Grade, RevisionPlanner};
use knards_e2e_tests::{TestDataFactory, TestDatabaseManager};

fn due_at(db: &TestDatabaseManager, at: DateTime<Utc>) -> Vec<CardId> {
    db.storage
        .cardset_and_statistics(db.owner(), &CardFilter::new(), &RevisionPlanner::new(), at)
        .unwrap()
        .cardset
        .iter()
        .map(|c| c.id)
        .collect()
}

#[test]
fn test_graded_card_returns_after_its_score_in_days() {
    let db = TestDatabaseManager::new_temp();
    let now = Utc::now();
    let card = TestDataFactory::create_aged_card(&db.storage, db.owner(), "borrowing", 10, None, now);
    assert_eq!(due_at(&db, now), vec![card.id]);

    // 0 -> 1 -> 2
    db.storage.review(card.id, db.owner(), Grade::Up, now).unwrap();
    let score = db.storage.review(card.id, db.owner(), Grade::Up, now).unwrap();
    assert_eq!(score.score, 2);

    assert!(due_at(&db, now).is_empty());
    assert!(due_at(&db, now + Duration::days(2)).is_empty());
    assert_eq!(due_at(&db, now + Duration::days(3)), vec![card.id]);
}

#[test]
fn test_grades_follow_the_ladder() {
    let db = TestDatabaseManager::new_temp();
    let now = Utc::now();
    let card = TestDataFactory::create_aged_card(&db.storage, db.owner(), "traits", 200, Some((55, 60)), now);

    let options = grade_options(55);
    assert_eq!((options.up, options.down, options.down_to_third, options.reset), (89, 34, 3, 0));

    let up = db.storage.review(card.id, db.owner(), Grade::Up, now).unwrap();
    assert_eq!(up.score, 89);
    let third = db.storage.review(card.id, db.owner(), Grade::DownToThird, now).unwrap();
    assert_eq!(third.score, 5);
    let reset = db.storage.review(card.id, db.owner(), Grade::Reset, now).unwrap();
    assert_eq!(reset.score, 0);
    assert_eq!(due_at(&db, now + Duration::days(1)), vec![card.id]);
}

#[test]
fn test_review_of_missing_card_fails() {
    let db = TestDatabaseManager::new_temp();
    assert!(db.storage.review(CardId(1234), db.owner(), Grade::Up, Utc::now()).is_err());
}
