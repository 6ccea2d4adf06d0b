//! Level object types and the entries the editor places.
//!
//! Each object type is an [`ObjectBehavior`] whose type key names the object
//! in level files. Most of them are markers; their behavior comes from the
//! modules they carry.

use ollie_core::math::Vec2;
use ollie_core::serializer::TypedDto;
use serde_json::Value;

use crate::events::GameEvent;
use crate::game::Game;
use crate::modules::bird::OBSTACLE_TAG;
use crate::modules::collider::{CircleCollider2d, RectangleCollider2d};
use crate::modules::shape_renderer::ShapeRenderer;
use crate::modules::spawner::{PlayerSpawner, PLAYER_TAG};
use crate::modules::trigger::GoalTrigger;
use crate::object::{GameObject, GameObjectDto, ObjectBehavior};
use crate::registry::{SerializableBehavior, SerializableModule};

pub const WALL_TAG: &str = "wall";
pub const GOAL_TAG: &str = "goal";
pub const GATE_TAG: &str = "gate";

/// Event emitted once per run when the player flies through a gate.
pub const GATE_PASSED: &str = "gatePassed";

// ---------------------------------------------------------------------------
// Object types
// ---------------------------------------------------------------------------

/// Static level geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wall;

impl ObjectBehavior for Wall {}

impl SerializableBehavior for Wall {
    const TYPE_KEY: &'static str = "Wall";

    fn from_data(_: &Value) -> Result<Self, String> {
        Ok(Wall)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Goal;

impl ObjectBehavior for Goal {}

impl SerializableBehavior for Goal {
    const TYPE_KEY: &'static str = "Goal";

    fn from_data(_: &Value) -> Result<Self, String> {
        Ok(Goal)
    }
}

/// Where the player appears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Spawn;

impl ObjectBehavior for Spawn {}

impl SerializableBehavior for Spawn {
    const TYPE_KEY: &'static str = "Spawn";

    fn from_data(_: &Value) -> Result<Self, String> {
        Ok(Spawn)
    }
}

/// A checkpoint the player flies through. Emits [`GATE_PASSED`] the first
/// time a player touches it after each `gameStart`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Gate {
    passed: bool,
}

impl Gate {
    pub fn is_passed(&self) -> bool {
        self.passed
    }
}

impl ObjectBehavior for Gate {
    fn initialize(&mut self, object: &mut GameObject, game: &mut Game) {
        object.on_game_event(game, "gameStart", |owner, _, _| {
            if let Some(gate) = owner.behavior_as_mut::<Gate>() {
                gate.passed = false;
            }
        });
    }

    fn after_update(&mut self, object: &mut GameObject, game: &mut Game) {
        if self.passed {
            return;
        }
        let crossed = game
            .scene()
            .find_by_tag(PLAYER_TAG)
            .any(|player| object.touches(player));
        if crossed {
            self.passed = true;
            tracing::debug!(gate = %object.id(), "gate passed");
            game.emit(GameEvent::Custom(GATE_PASSED.to_owned()));
        }
    }
}

impl SerializableBehavior for Gate {
    const TYPE_KEY: &'static str = "Gate";

    fn from_data(_: &Value) -> Result<Self, String> {
        Ok(Gate::default())
    }
}

// ---------------------------------------------------------------------------
// Level entries
// ---------------------------------------------------------------------------

fn module_entry<M: SerializableModule>(module: M) -> TypedDto {
    TypedDto::new(M::TYPE_KEY, module.to_data())
}

fn object_entry<B: SerializableBehavior>(dto: GameObjectDto) -> TypedDto {
    let data = serde_json::to_value(&dto).unwrap_or_else(|e| {
        tracing::warn!(error = %e, type_key = B::TYPE_KEY, "object entry serialization failed");
        Value::Null
    });
    TypedDto::new(B::TYPE_KEY, data)
}

/// A rectangular wall with its top-left corner at `position`.
pub fn wall_rect_entry(position: Vec2, size: Vec2) -> TypedDto {
    object_entry::<Wall>(
        GameObjectDto::new("Wall", position)
            .with_tags([WALL_TAG, OBSTACLE_TAG])
            .with_module(module_entry(RectangleCollider2d::new(Vec2::ZERO, size)))
            .with_module(module_entry(ShapeRenderer::default())),
    )
}

/// A round wall centered on `center`.
pub fn wall_circle_entry(center: Vec2, radius: f64) -> TypedDto {
    object_entry::<Wall>(
        GameObjectDto::new("Wall", center)
            .with_tags([WALL_TAG, OBSTACLE_TAG])
            .with_module(module_entry(CircleCollider2d::new(Vec2::ZERO, radius)))
            .with_module(module_entry(ShapeRenderer::default())),
    )
}

pub fn goal_entry(position: Vec2, size: Vec2) -> TypedDto {
    object_entry::<Goal>(
        GameObjectDto::new("Goal", position)
            .with_tags([GOAL_TAG])
            .with_layer(-1)
            .with_module(module_entry(RectangleCollider2d::new(Vec2::ZERO, size)))
            .with_module(module_entry(GoalTrigger::default()))
            .with_module(module_entry(ShapeRenderer::filled("#4caf50"))),
    )
}

pub fn gate_entry(position: Vec2, size: Vec2) -> TypedDto {
    object_entry::<Gate>(
        GameObjectDto::new("Gate", position)
            .with_tags([GATE_TAG])
            .with_layer(-1)
            .with_module(module_entry(RectangleCollider2d::new(Vec2::ZERO, size))),
    )
}

pub fn spawn_point_entry(position: Vec2) -> TypedDto {
    object_entry::<Spawn>(
        GameObjectDto::new("Spawn", position).with_module(module_entry(PlayerSpawner::default())),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;
    use crate::level::spawn_entry;
    use ollie_core::math::Rect2;
    use ollie_core::shape::ColliderShape;

    #[test]
    fn wall_entry_spawns_an_obstacle() {
        let mut game = Game::new(GameConfig::default());
        let id = spawn_entry(&mut game, &wall_rect_entry(Vec2::new(100.0, 40.0), Vec2::new(20.0, 60.0)))
            .unwrap();

        let wall = game.object(id);
        assert!(wall.behavior_as::<Wall>().is_some());
        assert_eq!(wall.type_key(), Some("Wall"));
        assert!(wall.has_tag(OBSTACLE_TAG));
        let shapes: Vec<_> = wall.world_shapes().collect();
        assert_eq!(
            shapes,
            vec![ColliderShape::rectangle(Rect2::new(100.0, 40.0, 20.0, 60.0))]
        );
    }

    #[test]
    fn gate_fires_once_per_run() {
        let mut game = Game::new(GameConfig::default());
        spawn_entry(&mut game, &gate_entry(Vec2::new(0.0, 0.0), Vec2::new(50.0, 50.0))).unwrap();

        let passes = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = passes.clone();
        game.on_global_event(GATE_PASSED, move |_, _| counter.set(counter.get() + 1));

        // A stand-in player without a controller stays inside the gate.
        game.spawn_plain(|p| {
            p.with_tag(PLAYER_TAG);
            p.transform.set_position(Vec2::new(25.0, 25.0));
            p.modules.add(Box::new(CircleCollider2d::new(Vec2::ZERO, 5.0)));
        });

        game.run_ticks(3);
        assert_eq!(passes.get(), 1);

        game.emit(GameEvent::GameStart);
        game.run_ticks(1);
        assert_eq!(passes.get(), 2);
    }
}
