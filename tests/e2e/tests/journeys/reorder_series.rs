//! Journey: reordering a series
//!
//! An owner rearranges the parts of a series, keeps studying it in the new
//! order, and recovers a series a crashed writer left half renumbered.

use chrono::Utc;
use knards_core::{
    CardFilter, CardId, NewCard, RenumberError, RenumberRequest, RevisionConfig, RevisionPlanner,
    SeriesId, StorageError,
};
use knards_e2e_tests::{TestDataFactory, TestDatabaseManager};
use rusqlite::{params, Connection};

struct SeriesFixture {
    db: TestDatabaseManager,
    series: SeriesId,
    a: CardId,
    b: CardId,
    c: CardId,
}

fn series_of_three() -> SeriesFixture {
    let db = TestDatabaseManager::new_temp();
    let (series, cards) =
        TestDataFactory::create_series(&db.storage, db.owner(), "ownership", 3, 10, Utc::now());
    SeriesFixture {
        series: series.id,
        a: cards[0].id,
        b: cards[1].id,
        c: cards[2].id,
        db,
    }
}

/// Write positions behind the store's back, one statement each
fn force_positions(fixture: &SeriesFixture, positions: &[(CardId, i64)]) {
    let conn = Connection::open(fixture.db.path()).unwrap();
    for (card, position) in positions {
        conn.execute(
            "UPDATE cards SET n_in_series = ?1 WHERE id = ?2",
            params![position, card.0],
        )
        .unwrap();
    }
}

#[test]
fn test_reorder_changes_study_order() {
    let f = series_of_three();
    let request = RenumberRequest::new([(f.a, 2), (f.b, 3), (f.c, 1)]);
    f.db.storage.reorder_series(f.series, &request).unwrap();

    assert_eq!(
        f.db.storage.series_positions(f.series).unwrap(),
        vec![(f.c, 1), (f.a, 2), (f.b, 3)]
    );

    let planner = RevisionPlanner::with_config(RevisionConfig { seed: Some(5) });
    let result = f
        .db
        .storage
        .cardset_and_statistics(f.db.owner(), &CardFilter::new(), &planner, Utc::now())
        .unwrap();
    let order: Vec<(CardId, i64)> = result
        .cardset
        .iter()
        .map(|c| (c.id, c.n_in_series))
        .collect();
    assert_eq!(order, vec![(f.c, 1), (f.a, 2), (f.b, 3)]);
}

#[test]
fn test_swap_of_two_neighbours() {
    let f = series_of_three();
    let request = RenumberRequest::new([(f.a, 2), (f.b, 1), (f.c, 3)]);
    f.db.storage.reorder_series(f.series, &request).unwrap();
    assert_eq!(
        f.db.storage.series_positions(f.series).unwrap(),
        vec![(f.b, 1), (f.a, 2), (f.c, 3)]
    );
}

#[test]
fn test_request_body_from_json() {
    let f = series_of_three();
    let body = format!(
        r#"[{{"id": {}, "n_in_series": 3}}, {{"id": {}, "n_in_series": 2}}, {{"id": {}, "n_in_series": 1}}]"#,
        f.a, f.b, f.c
    );
    let request: RenumberRequest = serde_json::from_str(&body).unwrap();
    f.db.storage.reorder_series(f.series, &request).unwrap();
    assert_eq!(
        f.db.storage.series_positions(f.series).unwrap(),
        vec![(f.c, 1), (f.b, 2), (f.a, 3)]
    );
}

#[test]
fn test_malformed_requests_change_nothing() {
    let f = series_of_three();
    let before = f.db.storage.series_positions(f.series).unwrap();

    let cases = [
        RenumberRequest::new([(f.a, 1), (f.b, 2)]),
        RenumberRequest::new([(f.a, 1), (f.b, 2), (f.c, 2)]),
        RenumberRequest::new([(f.a, 1), (f.b, 2), (f.c, 5)]),
        RenumberRequest::new([(f.a, 1), (f.b, 2), (CardId(9999), 3)]),
        RenumberRequest::default(),
    ];
    for request in &cases {
        let err = f.db.storage.reorder_series(f.series, request).unwrap_err();
        assert!(matches!(err, StorageError::Renumber(_)), "unexpected {:?}", err);
    }

    assert_eq!(f.db.storage.series_positions(f.series).unwrap(), before);
}

#[test]
fn test_new_card_is_appended_after_reorder() {
    let f = series_of_three();
    let request = RenumberRequest::new([(f.a, 3), (f.b, 1), (f.c, 2)]);
    f.db.storage.reorder_series(f.series, &request).unwrap();

    let card = f
        .db
        .storage
        .create_card(
            f.db.owner(),
            NewCard {
                title: Some("epilogue".into()),
                series: Some(f.series),
                tags: vec![],
            },
        )
        .unwrap();
    assert_eq!(card.n_in_series, 4);
}

#[test]
fn test_recover_after_crash_in_second_phase() {
    let f = series_of_three();
    // Target a:3 b:1 c:2. Placeholders b:-1 c:-2 a:-3, then only b reached 1.
    force_positions(&f, &[(f.a, -3), (f.c, -2), (f.b, 1)]);

    assert_eq!(f.db.storage.recover_series(f.series).unwrap(), 2);
    assert_eq!(
        f.db.storage.series_positions(f.series).unwrap(),
        vec![(f.b, 1), (f.c, 2), (f.a, 3)]
    );
}

#[test]
fn test_crash_in_first_phase_needs_replay() {
    let f = series_of_three();
    let request = RenumberRequest::new([(f.a, 3), (f.b, 1), (f.c, 2)]);
    // Only the first placeholder (b:-1) was written
    force_positions(&f, &[(f.b, -1)]);

    let err = f.db.storage.recover_series(f.series).unwrap_err();
    assert!(matches!(
        err,
        StorageError::Renumber(RenumberError::NeedsReplay(series)) if series == f.series
    ));

    f.db.storage.reorder_series(f.series, &request).unwrap();
    assert_eq!(
        f.db.storage.series_positions(f.series).unwrap(),
        vec![(f.b, 1), (f.c, 2), (f.a, 3)]
    );
}

#[test]
fn test_first_phase_crash_without_collision_keeps_request_pending() {
    let f = series_of_three();
    let request = RenumberRequest::new([(f.a, 1), (f.b, 3), (f.c, 2)]);
    // Only a's placeholder (-1) was written; flipping it back would look fine
    force_positions(&f, &[(f.a, -1)]);

    let err = f.db.storage.recover_series(f.series).unwrap_err();
    assert!(matches!(
        err,
        StorageError::Renumber(RenumberError::NeedsReplay(series)) if series == f.series
    ));
    assert_eq!(
        f.db.storage.series_positions(f.series).unwrap(),
        vec![(f.a, -1), (f.b, 2), (f.c, 3)]
    );

    f.db.storage.reorder_series(f.series, &request).unwrap();
    assert_eq!(
        f.db.storage.series_positions(f.series).unwrap(),
        vec![(f.a, 1), (f.c, 2), (f.b, 3)]
    );
}

#[test]
fn test_unknown_series() {
    let f = series_of_three();
    let err = f
        .db
        .storage
        .reorder_series(SeriesId(404), &RenumberRequest::new([(f.a, 1)]))
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
    assert!(matches!(
        f.db.storage.recover_series(SeriesId(404)),
        Err(StorageError::NotFound(_))
    ));
}
