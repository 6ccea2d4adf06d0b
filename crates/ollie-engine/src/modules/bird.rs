//! The player's flight model.

use ollie_core::math::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::GameEvent;
use crate::module::{Module, ModuleContext};
use crate::registry::{parse_data, require_non_negative, to_data, LoadContext, SerializableModule};

/// Tag of objects that kill the player on contact.
pub const OBSTACLE_TAG: &str = "obstacle";

/// Flappy-bird physics: constant gravity, instant upward velocity on the
/// jump button, terminal fall speed.
///
/// Touching an `obstacle` or leaving the world vertically emits
/// `playerDied` and requests a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirdController {
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    #[serde(default = "default_flap_speed")]
    pub flap_speed: f64,
    #[serde(default = "default_max_fall_speed")]
    pub max_fall_speed: f64,
    /// Vertical velocity; positive is down.
    #[serde(default)]
    pub velocity: f64,
    #[serde(skip)]
    dead: bool,
}

fn default_gravity() -> f64 {
    0.5
}

fn default_flap_speed() -> f64 {
    8.0
}

fn default_max_fall_speed() -> f64 {
    12.0
}

impl Default for BirdController {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            flap_speed: default_flap_speed(),
            max_fall_speed: default_max_fall_speed(),
            velocity: 0.0,
            dead: false,
        }
    }
}

impl BirdController {
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// One integration step. Returns the vertical displacement.
    pub fn integrate(&mut self, flap: bool) -> f64 {
        if flap {
            self.velocity = -self.flap_speed;
        } else {
            self.velocity += self.gravity;
        }
        self.velocity = self.velocity.min(self.max_fall_speed);
        self.velocity
    }
}

impl Module for BirdController {
    fn update(&mut self, ctx: &mut ModuleContext<'_>) {
        if self.dead {
            return;
        }
        let flap = ctx.game.bindings().jump.is_pressed(ctx.game.input());
        let dy = self.integrate(flap);
        ctx.owner.transform.translate(Vec2::new(0.0, dy));
    }

    fn after_update(&mut self, ctx: &mut ModuleContext<'_>) {
        if self.dead {
            return;
        }
        let owner = &*ctx.owner;
        let y = owner.position().y;
        let out_of_world = y < 0.0 || y > ctx.game.world_size().y;
        let hit = ctx
            .game
            .scene()
            .find_by_tag(OBSTACLE_TAG)
            .any(|obstacle| owner.touches(obstacle));

        if hit || out_of_world {
            self.dead = true;
            tracing::info!(player = %owner.id(), hit, out_of_world, "player died");
            ctx.emit(GameEvent::PlayerDied);
            ctx.game.request_restart();
        }
    }
}

impl SerializableModule for BirdController {
    const TYPE_KEY: &'static str = "BirdController";

    fn to_data(&self) -> Value {
        to_data(self)
    }

    fn from_data(data: &Value, _: &mut LoadContext) -> Result<Self, String> {
        let bird: Self = parse_data(data)?;
        require_non_negative("gravity", bird.gravity)?;
        require_non_negative("flap_speed", bird.flap_speed)?;
        require_non_negative("max_fall_speed", bird.max_fall_speed)?;
        if !bird.velocity.is_finite() {
            return Err("velocity must be finite".into());
        }
        Ok(bird)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gravity_accumulates_up_to_terminal_speed() {
        let mut bird = BirdController {
            gravity: 5.0,
            max_fall_speed: 12.0,
            ..Default::default()
        };
        let steps: Vec<f64> = (0..4).map(|_| bird.integrate(false)).collect();
        assert_eq!(steps, vec![5.0, 10.0, 12.0, 12.0]);
    }

    #[test]
    fn flap_sets_upward_velocity() {
        let mut bird = BirdController::default();
        bird.integrate(false);
        assert_eq!(bird.integrate(true), -8.0);
        assert_eq!(bird.integrate(false), -7.5);
    }
}
