//! Patrolling movement.

use ollie_core::math::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::module::{Module, ModuleContext};
use crate::registry::{parse_data, require_non_negative, to_data, LoadContext, SerializableModule};

/// Moves the owner horizontally by `speed` per update, turning around after
/// `distance` units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkBackAndForthBehavior {
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default = "default_distance")]
    pub distance: f64,
    #[serde(default)]
    pub travelled: f64,
    /// `1.0` (right) or `-1.0` (left).
    #[serde(default = "default_direction")]
    pub direction: f64,
}

fn default_speed() -> f64 {
    1.0
}

fn default_distance() -> f64 {
    100.0
}

fn default_direction() -> f64 {
    1.0
}

impl Default for WalkBackAndForthBehavior {
    fn default() -> Self {
        Self::new(default_speed(), default_distance())
    }
}

impl WalkBackAndForthBehavior {
    pub fn new(speed: f64, distance: f64) -> Self {
        Self {
            speed,
            distance,
            travelled: 0.0,
            direction: 1.0,
        }
    }

    /// Horizontal displacement for the next update.
    fn step(&mut self) -> f64 {
        let remaining = (self.distance - self.travelled).max(0.0);
        let step = self.speed.min(remaining);
        self.travelled += step;
        let dx = step * self.direction;
        if self.travelled >= self.distance {
            self.travelled = 0.0;
            self.direction = -self.direction;
        }
        dx
    }
}

impl Module for WalkBackAndForthBehavior {
    fn update(&mut self, ctx: &mut ModuleContext<'_>) {
        let dx = self.step();
        if dx != 0.0 {
            ctx.owner.transform.translate(Vec2::new(dx, 0.0));
        }
    }
}

impl SerializableModule for WalkBackAndForthBehavior {
    const TYPE_KEY: &'static str = "WalkBackAndForthBehavior";

    fn to_data(&self) -> Value {
        to_data(self)
    }

    fn from_data(data: &Value, _: &mut LoadContext) -> Result<Self, String> {
        let walk: Self = parse_data(data)?;
        require_non_negative("speed", walk.speed)?;
        require_non_negative("distance", walk.distance)?;
        if walk.direction != 1.0 && walk.direction != -1.0 {
            return Err(format!("direction must be 1 or -1, got {}", walk.direction));
        }
        Ok(walk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_around_at_distance() {
        let mut walk = WalkBackAndForthBehavior::new(3.0, 7.0);
        let steps: Vec<f64> = (0..6).map(|_| walk.step()).collect();
        assert_eq!(steps, vec![3.0, 3.0, 1.0, -3.0, -3.0, -1.0]);
        assert_eq!(walk.direction, 1.0);
    }
}
