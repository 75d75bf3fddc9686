use cerebral_core::{
    CandidateAttributes, CollectionRouter, Engine, ErrorKind, FieldProblem, FieldValue,
    ItemFilter, ItemPayload, ItemStatus, ManualClock, MetadataSearch, MetadataSearchError,
    PageRequest, SortOrder, SqliteItemStore, TaxonomyPath,
};
use rusqlite::Connection;
use serde_json::json;
use std::cell::Cell;

const T0: i64 = 1_700_000_000_000;

fn payload(value: serde_json::Value) -> ItemPayload {
    value.as_object().cloned().unwrap()
}

fn engine<'c>(
    conn: &'c Connection,
    clock: &'c ManualClock,
) -> Engine<SqliteItemStore<'c>, &'c ManualClock> {
    let store = SqliteItemStore::try_new(conn).unwrap();
    Engine::with_clock(CollectionRouter::builtin().unwrap(), store, clock)
}

fn books() -> TaxonomyPath {
    TaxonomyPath::category("intellectual", "books")
}

#[test]
fn create_assigns_id_and_equal_timestamps() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);

    let item = engine
        .create(
            &books(),
            &payload(json!({"title": "Dune", "rating": 5, "author": "Frank Herbert"})),
        )
        .unwrap();

    assert!(item.id > 0);
    assert_eq!(item.path, books());
    assert_eq!(item.status, ItemStatus::Wishlist);
    assert_eq!(item.rating, Some(5));
    assert_eq!(item.created_at, T0);
    assert_eq!(item.created_at, item.updated_at);
    assert_eq!(
        item.attributes.get("author"),
        Some(&FieldValue::from("Frank Herbert"))
    );

    let page = engine
        .query(
            &books(),
            &ItemFilter::default(),
            SortOrder::Name,
            PageRequest::new(0, 1),
        )
        .unwrap();
    assert_eq!(page.items, [item]);
}

#[test]
fn create_rejects_unknown_fields_and_non_leaf_paths() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);

    let err = engine
        .create(
            &books(),
            &payload(json!({"title": "Dune", "cuisine": "arrakeen"})),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = engine
        .create(
            &TaxonomyPath::category("intellectual", "professional"),
            &payload(json!({"title": "Rust book"})),
        )
        .unwrap_err();
    match err {
        cerebral_core::EngineError::Validation(validation) => {
            assert_eq!(validation.problem_for("path"), Some(&FieldProblem::NotLeaf));
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = engine
        .create(
            &TaxonomyPath::category("intellectual", "scrolls"),
            &payload(json!({"title": "x"})),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownNode);
    assert_eq!(engine.count_all(&books()).unwrap(), 0);
}

#[test]
fn update_validates_and_advances_updated_at() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);
    let item = engine
        .create(&books(), &payload(json!({"title": "Dune", "rating": 5})))
        .unwrap();

    let err = engine
        .update(item.id, &books(), &payload(json!({"rating": 6})))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Same millisecond: updated_at still moves forward.
    let updated = engine
        .update(item.id, &books(), &payload(json!({"rating": 3})))
        .unwrap();
    assert_eq!(updated.rating, Some(3));
    assert!(updated.updated_at > item.updated_at);
    assert_eq!(updated.created_at, item.created_at);
    assert_eq!(updated.title, "Dune");

    clock.advance(60_000);
    let completed = engine
        .update(
            item.id,
            &books(),
            &payload(json!({"status": "completed", "rating": null})),
        )
        .unwrap();
    assert_eq!(completed.status, ItemStatus::Completed);
    assert_eq!(completed.rating, None);
    assert_eq!(completed.updated_at, T0 + 60_000);
}

#[test]
fn update_refuses_identity_and_path_changes() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);
    let item = engine
        .create(&books(), &payload(json!({"title": "Dune"})))
        .unwrap();

    for patch in [
        json!({"id": 99}),
        json!({"created_at": 1}),
        json!({"category": "courses"}),
    ] {
        let err = engine
            .update(item.id, &books(), &payload(patch))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert_eq!(engine.get(item.id, &books()).unwrap(), item);
}

#[test]
fn items_are_only_reachable_under_their_own_leaf() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);
    let item = engine
        .create(&books(), &payload(json!({"title": "Dune"})))
        .unwrap();

    let courses = TaxonomyPath::category("intellectual", "courses");
    let err = engine
        .update(item.id, &courses, &payload(json!({"rating": 1})))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(
        engine.delete(item.id, &courses).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(engine.count_all(&books()).unwrap(), 1);
}

#[test]
fn second_delete_fails_with_not_found() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);
    let item = engine
        .create(&books(), &payload(json!({"title": "Dune"})))
        .unwrap();

    engine.delete(item.id, &books()).unwrap();
    let err = engine.delete(item.id, &books()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(engine.get(item.id, &books()).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn deleted_ids_are_never_reused() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);

    let first = engine
        .create(&books(), &payload(json!({"title": "Dune"})))
        .unwrap();
    engine.delete(first.id, &books()).unwrap();
    let second = engine
        .create(&books(), &payload(json!({"title": "Dune Messiah"})))
        .unwrap();
    assert!(second.id > first.id);
}

struct FakeCatalogue {
    calls: Cell<usize>,
    fail: bool,
}

impl MetadataSearch for FakeCatalogue {
    fn search(
        &self,
        _query: &str,
        _path: &TaxonomyPath,
    ) -> Result<Vec<CandidateAttributes>, MetadataSearchError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(MetadataSearchError::new("books", "timeout"));
        }
        Ok(vec![
            payload(json!({"title": "Dune", "author": "Frank Herbert", "thumbnail": "x.png"})),
            payload(json!({"thumbnail": "y.png"})),
        ])
    }
}

#[test]
fn prefill_filters_candidates_and_swallows_failures() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);

    let catalogue = FakeCatalogue {
        calls: Cell::new(0),
        fail: false,
    };
    assert!(engine.prefill(&catalogue, "d", &books()).unwrap().is_empty());
    assert_eq!(catalogue.calls.get(), 0);

    let candidates = engine.prefill(&catalogue, "dune", &books()).unwrap();
    assert_eq!(
        candidates,
        [payload(json!({"title": "Dune", "author": "Frank Herbert"}))]
    );

    let failing = FakeCatalogue {
        calls: Cell::new(0),
        fail: true,
    };
    assert!(engine.prefill(&failing, "dune", &books()).unwrap().is_empty());
    assert_eq!(failing.calls.get(), 1);

    // A failed lookup never blocks a manual create.
    engine
        .create(&books(), &payload(json!({"title": "Dune"})))
        .unwrap();
}
