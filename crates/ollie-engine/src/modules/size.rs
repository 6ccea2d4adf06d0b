//! Nominal object size for objects without colliders.

use ollie_core::math::{Rect2, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::module::Module;
use crate::registry::{parse_data, require_non_negative, to_data, LoadContext, SerializableModule};

/// Width and height of an object, anchored at its position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size2d {
    pub size: Vec2,
}

impl Size2d {
    pub fn new(size: Vec2) -> Self {
        Self { size }
    }

    /// World-space rectangle for an object at `position`.
    pub fn rect_at(&self, position: Vec2) -> Rect2 {
        Rect2::new(position.x, position.y, self.size.x, self.size.y)
    }
}

impl Module for Size2d {}

impl SerializableModule for Size2d {
    const TYPE_KEY: &'static str = "Size2d";

    fn to_data(&self) -> Value {
        to_data(self)
    }

    fn from_data(data: &Value, _: &mut LoadContext) -> Result<Self, String> {
        let size: Size2d = parse_data(data)?;
        require_non_negative("size.x", size.size.x)?;
        require_non_negative("size.y", size.size.y)?;
        Ok(size)
    }
}
