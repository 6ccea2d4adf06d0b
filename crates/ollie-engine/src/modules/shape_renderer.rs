//! Draws an object's collider shapes.

use ollie_core::math::Rect2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::module::Module;
use crate::modules::size::Size2d;
use crate::registry::{parse_data, to_data, LoadContext, SerializableModule};
use crate::render::{Paint, RenderContext, Stroke};

/// Fills (and optionally outlines) every enabled collider of the owner.
/// Objects without colliders fall back to their [`Size2d`] rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRenderer {
    #[serde(default = "default_fill")]
    pub fill: Option<String>,
    #[serde(default)]
    pub stroke: Option<Stroke>,
}

fn default_fill() -> Option<String> {
    Some("#333333".to_owned())
}

impl Default for ShapeRenderer {
    fn default() -> Self {
        Self {
            fill: default_fill(),
            stroke: None,
        }
    }
}

impl ShapeRenderer {
    pub fn filled(color: impl Into<String>) -> Self {
        Self {
            fill: Some(color.into()),
            stroke: None,
        }
    }

    fn paint(&self) -> Paint {
        Paint {
            fill: self.fill.clone(),
            stroke: self.stroke.clone(),
        }
    }
}

impl Module for ShapeRenderer {
    fn render(&self, ctx: &mut RenderContext<'_>) {
        let paint = self.paint();
        if paint.is_invisible() {
            return;
        }
        let owner = ctx.owner;
        let mut drew = false;
        for shape in owner.world_shapes() {
            ctx.painter.shape(&shape, &paint);
            drew = true;
        }
        if !drew {
            if let Some(size) = owner.modules.get::<Size2d>() {
                let p = owner.position();
                ctx.painter
                    .rect(Rect2::new(p.x, p.y, size.size.x, size.size.y), &paint);
            }
        }
    }
}

impl SerializableModule for ShapeRenderer {
    const TYPE_KEY: &'static str = "ShapeRenderer";

    fn to_data(&self) -> Value {
        to_data(self)
    }

    fn from_data(data: &Value, _: &mut LoadContext) -> Result<Self, String> {
        parse_data(data)
    }
}
