//! Player spawn point.

use ollie_core::math::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::Game;
use crate::module::{Module, ModuleContext};
use crate::modules::bird::BirdController;
use crate::modules::collider::CircleCollider2d;
use crate::modules::shape_renderer::ShapeRenderer;
use crate::object::{ObjectId, LEVEL_OBJECT_TAG};
use crate::registry::{parse_data, require_non_negative, to_data, LoadContext, SerializableModule};

/// Tag of the controllable bird.
pub const PLAYER_TAG: &str = "player";

/// Players draw above level geometry.
pub const PLAYER_LAYER: i32 = 10;

/// Spawns a player at the owner's position on every `gameStart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSpawner {
    #[serde(default = "default_radius")]
    pub player_radius: f64,
}

fn default_radius() -> f64 {
    12.0
}

impl Default for PlayerSpawner {
    fn default() -> Self {
        Self {
            player_radius: default_radius(),
        }
    }
}

impl Module for PlayerSpawner {
    fn initialize(&mut self, ctx: &mut ModuleContext<'_>) {
        let module = ctx.module_id();
        ctx.on_game_event("gameStart", move |owner, game, _| {
            let Some(spawner) = owner
                .modules
                .by_id(module)
                .and_then(|m| m.downcast_ref::<PlayerSpawner>())
            else {
                return;
            };
            let id = spawn_player(game, owner.position(), spawner.player_radius);
            tracing::debug!(spawner = %owner.id(), player = %id, "player spawned");
        });
    }
}

/// Spawn a bird: tags `player` and `level-object`, a [`BirdController`], a
/// circle collider and a renderer.
pub fn spawn_player(game: &mut Game, position: Vec2, radius: f64) -> ObjectId {
    game.spawn_plain(|player| {
        player.name = "Player".to_owned();
        player.layer = PLAYER_LAYER;
        player.with_tag(PLAYER_TAG).with_tag(LEVEL_OBJECT_TAG);
        player.transform.set_position(position);
        player.modules.add(Box::new(BirdController::default()));
        player
            .modules
            .add(Box::new(CircleCollider2d::new(Vec2::ZERO, radius)));
        player.modules.add(Box::new(ShapeRenderer::filled("#f5c542")));
    })
}

impl SerializableModule for PlayerSpawner {
    const TYPE_KEY: &'static str = "PlayerSpawner";

    fn to_data(&self) -> Value {
        to_data(self)
    }

    fn from_data(data: &Value, _: &mut LoadContext) -> Result<Self, String> {
        let spawner: Self = parse_data(data)?;
        require_non_negative("player_radius", spawner.player_radius)?;
        Ok(spawner)
    }
}
