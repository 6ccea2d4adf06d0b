//! Collider modules.
//!
//! Colliders store a local offset and shape parameters. The world-space
//! [`ColliderShape`] is built on demand from the owner's transform, never
//! cached.

use ollie_core::math::{Rect2, Vec2};
use ollie_core::shape::ColliderShape;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::module::Module;
use crate::modules::transform::Transform2d;
use crate::registry::{parse_data, require_non_negative, to_data, LoadContext, SerializableModule};
use crate::render::{Paint, RenderContext, Stroke};

// ---------------------------------------------------------------------------
// GizmoStyle
// ---------------------------------------------------------------------------

/// How a collider's debug outline is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GizmoStyle {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub line_width: f64,
    pub line_dash: Vec<f64>,
    pub visible: bool,
}

impl Default for GizmoStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: Some("#00ff00".to_owned()),
            line_width: 1.0,
            line_dash: vec![4.0, 2.0],
            visible: true,
        }
    }
}

impl GizmoStyle {
    pub fn paint(&self) -> Paint {
        Paint {
            fill: self.fill.clone(),
            stroke: self.stroke.clone().map(|color| Stroke {
                color,
                width: self.line_width,
                dash: self.line_dash.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Collider2d
// ---------------------------------------------------------------------------

/// Capability shared by every collider module.
pub trait Collider2d {
    /// Shape in world space for an owner at `transform`.
    fn world_shape(&self, transform: &Transform2d) -> ColliderShape;

    fn gizmo(&self) -> &GizmoStyle;
}

fn render_gizmo(collider: &dyn Collider2d, ctx: &mut RenderContext<'_>) {
    let style = collider.gizmo();
    if !style.visible {
        return;
    }
    let shape = collider.world_shape(&ctx.owner.transform);
    ctx.painter.shape(&shape, &style.paint());
}

// ---------------------------------------------------------------------------
// CircleCollider2d
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleCollider2d {
    #[serde(default)]
    pub offset: Vec2,
    pub radius: f64,
    #[serde(default)]
    pub gizmo: GizmoStyle,
}

impl CircleCollider2d {
    pub fn new(offset: Vec2, radius: f64) -> Self {
        Self {
            offset,
            radius,
            gizmo: GizmoStyle::default(),
        }
    }
}

impl Collider2d for CircleCollider2d {
    fn world_shape(&self, transform: &Transform2d) -> ColliderShape {
        ColliderShape::circle(transform.position() + self.offset, self.radius)
    }

    fn gizmo(&self) -> &GizmoStyle {
        &self.gizmo
    }
}

impl Module for CircleCollider2d {
    fn render_gizmos(&self, ctx: &mut RenderContext<'_>) {
        render_gizmo(self, ctx);
    }

    fn as_collider(&self) -> Option<&dyn Collider2d> {
        Some(self)
    }
}

impl SerializableModule for CircleCollider2d {
    const TYPE_KEY: &'static str = "CircleCollider2d";

    fn to_data(&self) -> Value {
        to_data(self)
    }

    fn from_data(data: &Value, _: &mut LoadContext) -> Result<Self, String> {
        let collider: Self = parse_data(data)?;
        require_non_negative("radius", collider.radius)?;
        Ok(collider)
    }
}

// ---------------------------------------------------------------------------
// RectangleCollider2d
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleCollider2d {
    #[serde(default)]
    pub offset: Vec2,
    pub size: Vec2,
    #[serde(default)]
    pub gizmo: GizmoStyle,
}

impl RectangleCollider2d {
    pub fn new(offset: Vec2, size: Vec2) -> Self {
        Self {
            offset,
            size,
            gizmo: GizmoStyle::default(),
        }
    }
}

impl Collider2d for RectangleCollider2d {
    fn world_shape(&self, transform: &Transform2d) -> ColliderShape {
        let origin = transform.position() + self.offset;
        ColliderShape::rectangle(Rect2::new(origin.x, origin.y, self.size.x, self.size.y))
    }

    fn gizmo(&self) -> &GizmoStyle {
        &self.gizmo
    }
}

impl Module for RectangleCollider2d {
    fn render_gizmos(&self, ctx: &mut RenderContext<'_>) {
        render_gizmo(self, ctx);
    }

    fn as_collider(&self) -> Option<&dyn Collider2d> {
        Some(self)
    }
}

impl SerializableModule for RectangleCollider2d {
    const TYPE_KEY: &'static str = "RectangleCollider2d";

    fn to_data(&self) -> Value {
        to_data(self)
    }

    fn from_data(data: &Value, _: &mut LoadContext) -> Result<Self, String> {
        let collider: Self = parse_data(data)?;
        require_non_negative("size.x", collider.size.x)?;
        require_non_negative("size.y", collider.size.y)?;
        Ok(collider)
    }
}

// ---------------------------------------------------------------------------
// RayCollider2d
// ---------------------------------------------------------------------------

/// A ray from the owner's position plus `offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayCollider2d {
    #[serde(default)]
    pub offset: Vec2,
    pub direction: Vec2,
    pub max_distance: f64,
    #[serde(default)]
    pub gizmo: GizmoStyle,
}

impl RayCollider2d {
    pub fn new(offset: Vec2, direction: Vec2, max_distance: f64) -> Self {
        Self {
            offset,
            direction,
            max_distance,
            gizmo: GizmoStyle::default(),
        }
    }
}

impl Collider2d for RayCollider2d {
    fn world_shape(&self, transform: &Transform2d) -> ColliderShape {
        ColliderShape::ray(
            transform.position() + self.offset,
            self.direction,
            self.max_distance,
        )
    }

    fn gizmo(&self) -> &GizmoStyle {
        &self.gizmo
    }
}

impl Module for RayCollider2d {
    fn render_gizmos(&self, ctx: &mut RenderContext<'_>) {
        render_gizmo(self, ctx);
    }

    fn as_collider(&self) -> Option<&dyn Collider2d> {
        Some(self)
    }
}

impl SerializableModule for RayCollider2d {
    const TYPE_KEY: &'static str = "RayCollider2d";

    fn to_data(&self) -> Value {
        to_data(self)
    }

    fn from_data(data: &Value, _: &mut LoadContext) -> Result<Self, String> {
        let collider: Self = parse_data(data)?;
        require_non_negative("max_distance", collider.max_distance)?;
        if collider.direction.length_squared() == 0.0 || !collider.direction.is_finite() {
            return Err("direction must be a non-zero finite vector".into());
        }
        Ok(collider)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> LoadContext {
        LoadContext::new(Vec2::new(800.0, 450.0))
    }

    #[test]
    fn world_shape_follows_transform() {
        let collider = RectangleCollider2d::new(Vec2::new(5.0, 0.0), Vec2::new(10.0, 20.0));
        let transform = Transform2d::new(Vec2::new(100.0, 50.0));
        assert_eq!(
            collider.world_shape(&transform),
            ColliderShape::rectangle(Rect2::new(105.0, 50.0, 10.0, 20.0))
        );
    }

    #[test]
    fn colliders_expose_capability() {
        let circle = CircleCollider2d::new(Vec2::ZERO, 1.0);
        assert!(circle.as_collider().is_some());
    }

    #[test]
    fn validation_rejects_bad_parameters() {
        assert!(CircleCollider2d::from_data(&json!({ "radius": -2.0 }), &mut ctx()).is_err());
        assert!(CircleCollider2d::from_data(&json!({}), &mut ctx()).is_err());
        assert!(RayCollider2d::from_data(
            &json!({ "direction": [0.0, 0.0], "max_distance": 5.0 }),
            &mut ctx()
        )
        .is_err());

        let rect = RectangleCollider2d::from_data(&json!({ "size": [3.0, 4.0] }), &mut ctx()).unwrap();
        assert_eq!(rect.offset, Vec2::ZERO);
        assert!(rect.gizmo.visible);
    }

    #[test]
    fn gizmo_paint_carries_dash() {
        let style = GizmoStyle::default();
        assert!(!style.paint().is_invisible());
        assert_eq!(style.paint().stroke.unwrap().dash, vec![4.0, 2.0]);
    }
}
