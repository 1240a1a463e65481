//! Scenario and property tests for tabletop-engine collections.
//!
//! These exercise the public API the way a host would: raw JSON in,
//! entities and change events out.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tabletop_engine::{
    Change, ChangeAction, ChangeEvent, Collection, EmbeddedChange, Entity, EntityKind, Error,
    RemoteEvent, RequestOptions, Schema, World,
};

fn actors(names: &[(&str, &str)]) -> Collection {
    Collection::new(
        EntityKind::Actor,
        names
            .iter()
            .map(|(id, name)| json!({"_id": id, "name": name}))
            .collect(),
    )
    .unwrap()
}

fn counting(collection: &mut Collection) -> Arc<Mutex<Vec<ChangeEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    collection.subscribe(move |e: &ChangeEvent| sink.lock().unwrap().push(e.clone()));
    log
}

// ============================================================================
// Lookup scenarios
// ============================================================================

#[test]
fn alpha_beta_scenario() {
    let mut collection = actors(&[("a", "Alpha"), ("b", "Beta")]);

    assert_eq!(collection.get_by_name("Beta").unwrap().id(), "b");
    assert_eq!(collection.index_of("b"), Some(1));

    collection.remove("a");

    assert!(collection.get("a").is_none());
    assert_eq!(collection.index_of("b"), Some(0));
}

#[test]
fn strict_get_on_absent_id() {
    let collection = actors(&[("a", "Alpha")]);
    let err = collection.get_strict("missing").unwrap_err();
    assert_eq!(err.to_string(), "Actor not found: missing");
}

#[test]
fn unicode_names() {
    let names = ["日本語テスト", "Привет мир", "🎉🚀", "Hello\nWorld\tTab", ""];
    let data = names
        .iter()
        .enumerate()
        .map(|(i, name)| json!({"_id": format!("a{i}"), "name": name}))
        .collect();
    let collection = Collection::new(EntityKind::Actor, data).unwrap();

    for (i, name) in names.iter().enumerate() {
        let found = collection.get_by_name(name).unwrap();
        assert_eq!(found.id(), format!("a{i}"), "failed for {name:?}");
    }
}

#[test]
fn empty_id_is_rejected() {
    let result = Collection::new(EntityKind::Actor, vec![json!({"_id": "", "name": "Nobody"})]);
    assert!(matches!(result, Err(Error::InvalidPayload(_))));
}

#[test]
fn numeric_id_is_type_mismatch() {
    let result = Collection::new(EntityKind::Item, vec![json!({"_id": 7, "name": "Seven"})]);
    assert!(matches!(result, Err(Error::TypeMismatch { field, .. }) if field == "_id"));
}

#[test]
fn duplicate_ids_in_source_keep_first_position() {
    let collection = Collection::new(
        EntityKind::Item,
        vec![
            json!({"_id": "x", "name": "First"}),
            json!({"_id": "y", "name": "Other"}),
            json!({"_id": "x", "name": "Second"}),
        ],
    )
    .unwrap();

    assert_eq!(collection.len(), 2);
    assert_eq!(collection.index_of("x"), Some(0));
    assert_eq!(collection.get("x").unwrap().name(), Some("Second"));
    assert_eq!(collection.source().len(), 2);
}

// ============================================================================
// Remote sync scenarios
// ============================================================================

#[test]
fn large_batch_create_notifies_once() {
    let mut collection = actors(&[]);
    let log = counting(&mut collection);

    let payloads = (0..500)
        .map(|i| json!({"_id": format!("a{i}"), "name": format!("Actor {i}")}))
        .collect();
    let created = collection
        .on_create_many(payloads, &RequestOptions::default(), "gm")
        .unwrap();

    assert_eq!(created.len(), 500);
    assert_eq!(collection.len(), 500);
    assert_eq!(collection.index_of("a499"), Some(499));

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, ChangeAction::Created);
    assert_eq!(log[0].ids.len(), 500);
}

#[test]
fn echo_of_own_create_replaces_in_place() {
    let mut collection = actors(&[("a", "Alpha"), ("b", "Beta")]);

    collection
        .on_create(
            json!({"_id": "a", "name": "Alpha (echo)"}),
            &RequestOptions::default(),
            "me",
        )
        .unwrap();

    assert_eq!(collection.len(), 2);
    assert_eq!(collection.index_of("a"), Some(0));
    assert_eq!(collection.get("a").unwrap().name(), Some("Alpha (echo)"));
}

#[test]
fn events_apply_in_arrival_order() {
    let mut world = World::new(Schema::new())
        .with_collection(EntityKind::Item, vec![])
        .unwrap();

    let events = vec![
        RemoteEvent::Create(Change::new(
            EntityKind::Item,
            json!({"_id": "i", "name": "Rope", "weight": 10}),
            "gm",
        )),
        RemoteEvent::Update(Change::new(
            EntityKind::Item,
            json!({"_id": "i", "weight": 5}),
            "p1",
        )),
        RemoteEvent::Update(Change::new(
            EntityKind::Item,
            json!({"_id": "i", "weight": 2}),
            "p2",
        )),
    ];
    for event in events {
        world.dispatch(event).unwrap();
    }

    let item = world.get(EntityKind::Item, "i").unwrap();
    assert_eq!(item.field("weight"), Some(&json!(2)));
}

#[test]
fn embedded_events_against_missing_parent_change_nothing() {
    let mut world = World::new(Schema::new())
        .with_collection(
            EntityKind::Actor,
            vec![json!({"_id": "hero", "name": "Hero", "items": [{"_id": "s", "name": "Sword"}]})],
        )
        .unwrap();
    let before: Vec<Value> = world
        .collection(EntityKind::Actor)
        .unwrap()
        .source()
        .to_vec();

    let events = vec![
        RemoteEvent::CreateEmbeddedMany(EmbeddedChange::new(
            EntityKind::Actor,
            "villain",
            EntityKind::OwnedItem,
            vec![json!({"_id": "d", "name": "Dagger"})],
            "gm",
        )),
        RemoteEvent::UpdateEmbedded(EmbeddedChange::new(
            EntityKind::Actor,
            "villain",
            EntityKind::OwnedItem,
            json!({"_id": "s", "name": "Blunt Sword"}),
            "gm",
        )),
        RemoteEvent::DeleteEmbeddedMany(EmbeddedChange::new(
            EntityKind::Actor,
            "villain",
            EntityKind::OwnedItem,
            vec!["s".to_string()],
            "gm",
        )),
    ];

    for event in events {
        let err = world.dispatch(event).unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
    }

    let after = world.collection(EntityKind::Actor).unwrap().source();
    assert_eq!(after, before.as_slice());
}

#[test]
fn embedded_update_through_world() {
    let mut world = World::new(Schema::new())
        .with_collection(
            EntityKind::Actor,
            vec![json!({"_id": "hero", "name": "Hero", "items": [{"_id": "s", "name": "Sword"}]})],
        )
        .unwrap();

    let outcome = world
        .dispatch(RemoteEvent::UpdateEmbeddedMany(EmbeddedChange::new(
            EntityKind::Actor,
            "hero",
            EntityKind::OwnedItem,
            vec![json!({"_id": "s", "data.damage": "1d8"})],
            "gm",
        )))
        .unwrap();

    assert_eq!(outcome.entities[0].field("data.damage"), Some(&json!("1d8")));
    let hero = world.get(EntityKind::Actor, "hero").unwrap();
    let sword = hero.embedded(EntityKind::OwnedItem).unwrap().get("s").unwrap();
    assert_eq!(sword.name(), Some("Sword"));
    assert_eq!(sword.field("data"), Some(&json!({"damage": "1d8"})));
}

#[test]
fn wire_event_round_trip_through_world() {
    let mut world = World::new(Schema::new())
        .with_collection(EntityKind::JournalEntry, vec![])
        .unwrap();

    let json = r#"{
        "event": "createMany",
        "kind": "JournalEntry",
        "payload": [
            {"_id": "j1", "name": "Session 1", "content": "<p>Goblins.</p>"},
            {"_id": "j2", "name": "Session 2", "content": "<p>More goblins.</p>"}
        ],
        "options": {"renderSheet": false},
        "userId": "gm",
        "requestId": "abc"
    }"#;
    let event: RemoteEvent = serde_json::from_str(json).unwrap();
    let outcome = world.dispatch(event).unwrap();

    assert_eq!(outcome.request_id.as_deref(), Some("abc"));
    let ids: Vec<_> = outcome.entities.iter().map(Entity::id).collect();
    assert_eq!(ids, vec!["j1", "j2"]);
}

// ============================================================================
// Properties
// ============================================================================

fn collection_of(n: usize) -> Collection {
    Collection::new(
        EntityKind::Item,
        (0..n)
            .map(|i| json!({"_id": format!("i{i}"), "name": format!("Item {i}"), "weight": i}))
            .collect(),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn prop_inserted_entities_are_retrievable(ids in prop::collection::hash_set("[a-z]{1,8}", 1..40)) {
        let mut collection = Collection::new(EntityKind::Item, vec![]).unwrap();
        for id in &ids {
            collection
                .insert(Entity::new(EntityKind::Item, id.clone()).with_name(id.clone()))
                .unwrap();
        }

        prop_assert_eq!(collection.len(), ids.len());
        for id in &ids {
            prop_assert_eq!(collection.get(id).map(Entity::id), Some(id.as_str()));
            prop_assert!(collection.index_of(id).is_some());
        }
    }

    #[test]
    fn prop_map_then_reduce_matches_fused_reduce(n in 0usize..60, seed in 0u64..1000) {
        let collection = collection_of(n);
        let f = |e: &Entity| e.field("weight").and_then(Value::as_u64).unwrap_or(0) * seed;
        let combine = |acc: Vec<u64>, x: u64| {
            let mut acc = acc;
            acc.push(x);
            acc
        };

        let composed = collection
            .map(f)
            .into_iter()
            .fold(Vec::new(), combine);
        let fused = collection.reduce(Vec::new(), |acc, e| combine(acc, f(e)));

        prop_assert_eq!(composed, fused);
    }

    #[test]
    fn prop_remove_then_get_is_absent(n in 1usize..40, pick in 0usize..40) {
        let mut collection = collection_of(n);
        let id = format!("i{}", pick % n);

        prop_assert!(collection.remove(&id).is_some());
        prop_assert!(collection.get(&id).is_none());
        prop_assert!(collection.remove(&id).is_none());
        prop_assert_eq!(collection.len(), n - 1);
        prop_assert_eq!(collection.source().len(), n - 1);
    }

    #[test]
    fn prop_batch_create_adds_exactly_n(n in 0usize..50) {
        let mut collection = collection_of(3);
        let log = counting(&mut collection);

        let payloads = (0..n)
            .map(|i| json!({"_id": format!("new{i}"), "name": "New"}))
            .collect();
        let created = collection
            .on_create_many(payloads, &RequestOptions::default(), "gm")
            .unwrap();

        prop_assert_eq!(created.len(), n);
        prop_assert_eq!(collection.len(), 3 + n);
        for entity in &created {
            prop_assert!(collection.get(entity.id()).is_some());
        }
        prop_assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn prop_initialize_is_idempotent(n in 0usize..30, removed in prop::collection::vec(0usize..30, 0..10)) {
        let mut collection = collection_of(n);
        for r in removed {
            collection.remove(&format!("i{r}"));
        }

        let before: Vec<Value> = collection.source().to_vec();
        collection.initialize().unwrap();
        let ids_once: Vec<String> = collection.ids().map(str::to_string).collect();
        collection.initialize().unwrap();
        let ids_twice: Vec<String> = collection.ids().map(str::to_string).collect();

        prop_assert_eq!(collection.source(), before.as_slice());
        prop_assert_eq!(ids_once, ids_twice);
    }
}
