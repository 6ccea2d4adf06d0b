//! Serialization round trips for every registered module and object type,
//! and partial-failure behavior of object deserialization.

use std::fmt::Debug;

use ollie_engine::level::spawn_entry;
use ollie_engine::prelude::*;
use serde_json::json;

fn ctx() -> LoadContext {
    LoadContext::new(Vec2::new(800.0, 450.0))
}

/// Serialize through JSON text and back, then compare.
fn round_trip<M: Module + PartialEq + Debug>(module: M) {
    let dto = MODULE_SERIALIZER.serialize(&module);
    let text = serde_json::to_string(&dto.to_value()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();

    let back = MODULE_SERIALIZER.deserialize(&value, &mut ctx()).unwrap();
    assert_eq!(
        back.downcast_ref::<M>(),
        Some(&module),
        "round trip of {} changed the module",
        dto.type_key
    );
}

// ---------------------------------------------------------------------------
// 1. Module round trips
// ---------------------------------------------------------------------------

#[test]
fn transform_round_trip() {
    let transform = Transform2d::new(Vec2::new(12.5, -3.0));
    let dto = MODULE_SERIALIZER.serialize(&transform);
    assert_eq!(dto.type_key, "Transform2d");

    let back = MODULE_SERIALIZER.deserialize_dto(&dto, &mut ctx()).unwrap();
    let back = back.downcast_ref::<Transform2d>().unwrap();
    assert_eq!(back.position(), Vec2::new(12.5, -3.0));
}

#[test]
fn size_round_trip() {
    round_trip(Size2d::new(Vec2::new(40.0, 20.0)));
}

#[test]
fn collider_round_trips() {
    let mut circle = CircleCollider2d::new(Vec2::new(1.0, 2.0), 7.5);
    circle.gizmo.stroke = Some("#ff0000".to_owned());
    circle.gizmo.line_dash = vec![];
    round_trip(circle);

    round_trip(RectangleCollider2d::new(Vec2::new(-5.0, -5.0), Vec2::new(10.0, 10.0)));

    let mut ray = RayCollider2d::new(Vec2::ZERO, Vec2::new(0.0, 1.0), 250.0);
    ray.gizmo.visible = false;
    round_trip(ray);
}

#[test]
fn animation_round_trip_keeps_current_frame() {
    let mut animation = Animation::new("bird.png", 16.0, 16.0, 4);
    animation.ticks_per_frame = 3;
    animation.looping = false;
    animation.set_frame(2);
    round_trip(animation);
}

#[test]
fn gameplay_module_round_trips() {
    round_trip(PlayerSpawner { player_radius: 9.0 });

    let mut walker = WalkBackAndForthBehavior::new(2.0, 64.0);
    walker.travelled = 10.0;
    walker.direction = -1.0;
    round_trip(walker);

    round_trip(GoalTrigger::default());
    round_trip(ShapeRenderer::filled("#123456"));

    let mut bird = BirdController::default();
    bird.velocity = 3.5;
    round_trip(bird);
}

#[test]
fn editor_is_not_serializable() {
    let editor = LevelEditor::default();
    assert!(MODULE_SERIALIZER.try_serialize(&editor).is_err());
}

// ---------------------------------------------------------------------------
// 2. Envelope validation
// ---------------------------------------------------------------------------

#[test]
fn malformed_envelopes_are_errors() {
    let cases = [
        json!(42),
        json!({ "data": {} }),
        json!({ "$type": 7 }),
        json!({ "$type": "NoSuchModule" }),
        json!({ "$type": "CircleCollider2d", "data": { "radius": "big" } }),
    ];
    for case in cases {
        assert!(
            MODULE_SERIALIZER.deserialize(&case, &mut ctx()).is_err(),
            "expected an error for {case}"
        );
    }
}

#[test]
fn flattened_envelope_is_accepted() {
    let value = json!({ "$type": "Size2d", "size": [3.0, 4.0] });
    let module = MODULE_SERIALIZER.deserialize(&value, &mut ctx()).unwrap();
    assert_eq!(module.downcast_ref::<Size2d>().unwrap().size, Vec2::new(3.0, 4.0));
}

// ---------------------------------------------------------------------------
// 3. Objects
// ---------------------------------------------------------------------------

#[test]
fn object_round_trip_preserves_fields() {
    let mut game = Game::default();
    let id = game.spawn(Box::new(Wall), |wall| {
        wall.name = "left wall".to_owned();
        wall.layer = 3;
        wall.with_tag("wall").with_tag(OBSTACLE_TAG);
        wall.transform.set_position(Vec2::new(5.0, 6.0));
        wall.modules
            .add(Box::new(RectangleCollider2d::new(Vec2::ZERO, Vec2::new(8.0, 9.0))));
        wall.modules.add(Box::new(ShapeRenderer::default()));
    });

    let entry = game.object(id).serialize_typed().unwrap();
    assert_eq!(entry.type_key, "Wall");

    let copy = spawn_entry(&mut game, &entry).unwrap();
    let (a, b) = (game.object(id), game.object(copy));
    assert_ne!(a.id(), b.id());
    assert_eq!(a.serialize(), b.serialize());
    assert!(b.behavior_as::<Wall>().is_some());
}

#[test]
fn one_bad_module_does_not_discard_the_object() {
    let mut game = Game::default();
    let entry = TypedDto::new(
        "GameObject",
        json!({
            "version": 1,
            "name": "mixed",
            "layer": 0,
            "tags": ["a"],
            "transform": [1.0, 1.0],
            "modules": [
                { "$type": "Size2d", "data": { "size": [1.0, 1.0] } },
                { "$type": "Nope" },
                { "$type": "CircleCollider2d", "data": { "radius": -1.0 } },
                { "$type": "CircleCollider2d", "data": { "radius": 2.0 } },
            ],
        }),
    );

    let failure = spawn_entry(&mut game, &entry).unwrap_err();
    assert!(failure.is_partial());
    assert_eq!(failure.errors.len(), 2);
    assert!(failure.errors[0].starts_with("module[1]: "));
    assert!(failure.errors[1].starts_with("module[2]: "));

    let object = game.object(failure.result.unwrap());
    assert_eq!(object.name, "mixed");
    assert!(object.has_tag("a"));
    assert!(object.modules.has::<Size2d>());
    assert_eq!(object.modules.iter_of::<CircleCollider2d>().count(), 1);
}

#[test]
fn schema_failure_spawns_nothing() {
    let mut game = Game::default();
    let entry = TypedDto::new("Wall", json!({ "version": 1, "tags": "not-a-list" }));
    let failure = spawn_entry(&mut game, &entry).unwrap_err();
    assert!(!failure.is_partial());
    assert!(failure.errors[0].starts_with("invalid object: "));
    assert!(game.scene().is_empty());
}

#[test]
fn incomplete_object_schema_fails_whole_object() {
    let mut game = Game::default();
    let minimal = json!({ "version": 1, "name": "x" });
    let failure =
        GameObject::deserialize_partial(&minimal, &mut game, Box::new(PlainObject)).unwrap_err();
    assert!(failure.result.is_none());
    assert!(failure.errors[0].starts_with("invalid object: "), "{}", failure.errors[0]);

    // Only the behavior payload may be left out.
    let complete = json!({
        "version": 1, "name": "x", "layer": 0, "tags": [], "transform": [0.0, 0.0], "modules": []
    });
    assert!(GameObject::deserialize_partial(&complete, &mut game, Box::new(PlainObject)).is_ok());
    assert_eq!(game.scene().len(), 1);
}
