use cerebral_core::clock::DAY_MS;
use cerebral_core::{
    CollectionRouter, Engine, ErrorKind, ItemPayload, ItemStatus, ManualClock, SqliteItemStore,
    TaxonomyPath,
};
use rusqlite::Connection;
use serde_json::json;

const T0: i64 = 1_700_000_000_000;

type TestEngine<'c> = Engine<SqliteItemStore<'c>, &'c ManualClock>;

fn payload(value: serde_json::Value) -> ItemPayload {
    value.as_object().cloned().unwrap()
}

fn engine<'c>(conn: &'c Connection, clock: &'c ManualClock) -> TestEngine<'c> {
    let store = SqliteItemStore::try_new(conn).unwrap();
    Engine::with_clock(CollectionRouter::builtin().unwrap(), store, clock)
}

fn books() -> TaxonomyPath {
    TaxonomyPath::category("intellectual", "books")
}

fn counts(engine: &TestEngine<'_>, path: &TaxonomyPath) -> (usize, usize, usize) {
    (
        engine.count_all(path).unwrap(),
        engine.count_recent(path, 7).unwrap(),
        engine.status_breakdown(path).unwrap().wishlist,
    )
}

#[test]
fn dune_create_and_delete_moves_every_count_by_one() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);
    engine
        .create(&books(), &payload(json!({"title": "Neuromancer", "status": "completed"})))
        .unwrap();

    let before = counts(&engine, &books());
    let dune = engine
        .create(&books(), &payload(json!({"title": "Dune", "rating": 5})))
        .unwrap();
    let after = counts(&engine, &books());
    assert_eq!(after, (before.0 + 1, before.1 + 1, before.2 + 1));

    let domain_before = engine
        .count_all(&TaxonomyPath::domain("intellectual"))
        .unwrap();
    assert_eq!(domain_before, 2);

    engine.delete(dune.id, &books()).unwrap();
    assert_eq!(counts(&engine, &books()), before);
}

#[test]
fn recent_window_is_trailing_and_inclusive() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);

    engine
        .create(&books(), &payload(json!({"title": "Old"})))
        .unwrap();
    clock.advance(7 * DAY_MS);
    engine
        .create(&books(), &payload(json!({"title": "New"})))
        .unwrap();

    assert_eq!(engine.count_recent(&books(), 7).unwrap(), 2);
    clock.advance(1);
    assert_eq!(engine.count_recent(&books(), 7).unwrap(), 1);
    assert_eq!(engine.count_recent(&books(), 30).unwrap(), 2);
    assert_eq!(engine.count_all(&books()).unwrap(), 2);
}

#[test]
fn breakdown_sums_to_total_across_collections() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);

    let rows = [
        (books(), json!({"title": "Dune", "status": "completed"})),
        (books(), json!({"title": "Hyperion", "status": "in_progress"})),
        (
            TaxonomyPath::category("intellectual", "documentaries"),
            json!({"title": "Cosmos", "status": "completed"}),
        ),
        (
            TaxonomyPath::category("intellectual", "ideas"),
            json!({"title": "Shower thought"}),
        ),
        (
            TaxonomyPath::subcategory("intellectual", "professional", "skills"),
            json!({"title": "Rust", "status": "in_progress"}),
        ),
    ];
    for (path, body) in rows {
        engine.create(&path, &payload(body)).unwrap();
    }

    for node in engine.router().registry().walk() {
        let total = engine.count_all(&node.path).unwrap();
        let breakdown = engine.status_breakdown(&node.path).unwrap();
        assert_eq!(breakdown.total(), total, "{}", node.path);
    }

    let domain = TaxonomyPath::domain("intellectual");
    let breakdown = engine.status_breakdown(&domain).unwrap();
    assert_eq!(breakdown.get(ItemStatus::Completed), 2);
    assert_eq!(breakdown.get(ItemStatus::InProgress), 2);
    assert_eq!(breakdown.get(ItemStatus::Wishlist), 1);
}

#[test]
fn node_stats_child_stats_and_overview() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);

    engine
        .create(
            &TaxonomyPath::category("physical", "restaurants"),
            &payload(json!({"title": "Noma", "location": "Copenhagen", "rating": 5})),
        )
        .unwrap();
    engine
        .create(
            &TaxonomyPath::category("physical", "places"),
            &payload(json!({"title": "Wadi Rum", "location": "Jordan", "rating": 4})),
        )
        .unwrap();
    engine
        .create(
            &TaxonomyPath::category("physical", "fitness"),
            &payload(json!({"title": "Morning run", "intensity": 6})),
        )
        .unwrap();

    let physical = engine
        .node_stats(&TaxonomyPath::domain("physical"))
        .unwrap();
    assert_eq!(physical.total, 3);
    assert_eq!(physical.recent, 3);
    assert_eq!(physical.window_days, 7);
    assert_eq!(physical.average_rating, Some(4.5));
    assert_eq!(physical.label, "Physical");

    let children = engine
        .child_stats(&TaxonomyPath::domain("physical"))
        .unwrap();
    let child_keys = children
        .iter()
        .map(|stats| stats.path.to_string())
        .collect::<Vec<_>>();
    assert_eq!(child_keys[0], "physical/restaurants");
    assert_eq!(children.iter().map(|stats| stats.total).sum::<usize>(), 3);
    assert!(engine
        .child_stats(&TaxonomyPath::category("physical", "fitness"))
        .unwrap()
        .is_empty());

    let overview = engine.overview().unwrap();
    assert_eq!(overview.len(), 4);
    assert_eq!(overview[2].total, 3);
    assert_eq!(overview[0].total, 0);
    assert_eq!(overview[0].average_rating, None);
    assert_eq!(overview[0].favorites, 0);
    assert_eq!(overview[0].completion_ratio, None);
}

#[test]
fn node_stats_count_favorites_and_completion() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);

    let rows = [
        json!({"title": "Dune", "status": "completed", "rating": 5}),
        json!({"title": "Hyperion", "status": "in_progress", "rating": 5}),
        json!({"title": "Snow Crash", "status": "completed", "rating": 3}),
        json!({"title": "Neuromancer"}),
    ];
    for body in rows {
        engine.create(&books(), &payload(body)).unwrap();
    }

    let stats = engine.node_stats(&books()).unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.favorites, 2);
    assert_eq!(stats.completion_ratio, Some(0.5));

    let intellectual = engine
        .node_stats(&TaxonomyPath::domain("intellectual"))
        .unwrap();
    assert_eq!(intellectual.favorites, 2);
    assert_eq!(intellectual.completion_ratio, Some(0.5));
}

#[test]
fn aggregates_on_unknown_nodes_fail() {
    let conn = cerebral_core::open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let engine = engine(&conn, &clock);
    let err = engine
        .count_all(&TaxonomyPath::category("beyond", "astrology"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownNode);
}
