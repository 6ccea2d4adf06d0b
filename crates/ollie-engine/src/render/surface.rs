//! Drawing surfaces and the draw-command vocabulary.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ollie_core::math::{Mat3, Rect2, Vec2};
use ollie_core::shape::ColliderShape;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DrawCommand
// ---------------------------------------------------------------------------

/// Stroke style for outlines and lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
    /// Dash pattern; empty for a solid line.
    #[serde(default)]
    pub dash: Vec<f64>,
}

impl Stroke {
    pub fn solid(color: impl Into<String>, width: f64) -> Self {
        Self {
            color: color.into(),
            width,
            dash: Vec::new(),
        }
    }
}

/// Fill and/or stroke of a closed shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    pub fill: Option<String>,
    pub stroke: Option<Stroke>,
}

impl Paint {
    pub fn fill(color: impl Into<String>) -> Self {
        Self {
            fill: Some(color.into()),
            stroke: None,
        }
    }

    pub fn stroke(stroke: Stroke) -> Self {
        Self {
            fill: None,
            stroke: Some(stroke),
        }
    }

    /// Nothing would be drawn.
    pub fn is_invisible(&self) -> bool {
        self.fill.is_none() && self.stroke.is_none()
    }
}

/// One draw call. Coordinates are in world space after `SetTransform`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear { color: String },
    SetTransform { matrix: Mat3 },
    Rect { rect: Rect2, paint: Paint },
    Circle { center: Vec2, radius: f64, paint: Paint },
    Polygon { points: Vec<Vec2>, paint: Paint },
    Line { from: Vec2, to: Vec2, stroke: Stroke },
    Sprite { sheet: String, source: Rect2, dest: Rect2 },
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// A 2D drawing target, e.g. a browser canvas or an offscreen buffer.
pub trait Surface {
    /// Current size in physical pixels.
    fn size(&self) -> Vec2;

    fn submit(&mut self, command: DrawCommand);
}

// ---------------------------------------------------------------------------
// Painter
// ---------------------------------------------------------------------------

/// Convenience wrapper issuing draw commands to a surface.
pub struct Painter<'a> {
    surface: &'a mut dyn Surface,
}

impl<'a> Painter<'a> {
    pub fn new(surface: &'a mut dyn Surface) -> Self {
        Self { surface }
    }

    pub fn surface_size(&self) -> Vec2 {
        self.surface.size()
    }

    pub fn submit(&mut self, command: DrawCommand) {
        self.surface.submit(command);
    }

    pub fn clear(&mut self, color: &str) {
        self.submit(DrawCommand::Clear {
            color: color.to_owned(),
        });
    }

    pub fn set_transform(&mut self, matrix: Mat3) {
        self.submit(DrawCommand::SetTransform { matrix });
    }

    pub fn rect(&mut self, rect: Rect2, paint: &Paint) {
        self.submit(DrawCommand::Rect {
            rect,
            paint: paint.clone(),
        });
    }

    pub fn circle(&mut self, center: Vec2, radius: f64, paint: &Paint) {
        self.submit(DrawCommand::Circle {
            center,
            radius,
            paint: paint.clone(),
        });
    }

    pub fn polygon(&mut self, points: Vec<Vec2>, paint: &Paint) {
        self.submit(DrawCommand::Polygon {
            points,
            paint: paint.clone(),
        });
    }

    pub fn line(&mut self, from: Vec2, to: Vec2, stroke: &Stroke) {
        self.submit(DrawCommand::Line {
            from,
            to,
            stroke: stroke.clone(),
        });
    }

    pub fn sprite(&mut self, sheet: &str, source: Rect2, dest: Rect2) {
        self.submit(DrawCommand::Sprite {
            sheet: sheet.to_owned(),
            source,
            dest,
        });
    }

    /// Draw a collider shape. Rays are drawn as a line of their full length
    /// and points as a small disc.
    pub fn shape(&mut self, shape: &ColliderShape, paint: &Paint) {
        match shape {
            ColliderShape::Circle { center, radius } => self.circle(*center, *radius, paint),
            ColliderShape::Rectangle { rect } => self.rect(*rect, paint),
            ColliderShape::ConvexPolygon { vertices } => self.polygon(vertices.clone(), paint),
            ColliderShape::Point { position } => self.circle(*position, 2.0, paint),
            ColliderShape::Ray {
                origin,
                direction,
                max_distance,
            } => {
                let stroke = paint
                    .stroke
                    .clone()
                    .or_else(|| paint.fill.clone().map(|c| Stroke::solid(c, 1.0)));
                if let Some(stroke) = stroke {
                    self.line(*origin, *origin + *direction * *max_distance, &stroke);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingSurface
// ---------------------------------------------------------------------------

/// A surface that records every command. Clones share the same log and
/// size, so a test can keep one handle while the game owns another.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: Rc<Cell<Vec2>>,
    log: Rc<RefCell<Vec<DrawCommand>>>,
}

impl RecordingSurface {
    pub fn new(size: Vec2) -> Self {
        Self {
            size: Rc::new(Cell::new(size)),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Change the reported size. The game picks it up on the next resize
    /// request.
    pub fn set_size(&self, size: Vec2) {
        self.size.set(size);
    }

    /// Copy of everything recorded so far.
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.log.borrow().clone()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<DrawCommand> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> Vec2 {
        self.size.get()
    }

    fn submit(&mut self, command: DrawCommand) {
        self.log.borrow_mut().push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_log() {
        let surface = RecordingSurface::new(Vec2::new(10.0, 10.0));
        let mut handle = surface.clone();
        Painter::new(&mut handle).clear("#000");
        assert_eq!(surface.len(), 1);
        assert_eq!(surface.take().len(), 1);
        assert!(handle.is_empty());
    }

    #[test]
    fn ray_uses_stroke_or_fill() {
        let mut surface = RecordingSurface::new(Vec2::ONE);
        let ray = ColliderShape::ray(Vec2::ZERO, Vec2::RIGHT, 5.0);
        Painter::new(&mut surface).shape(&ray, &Paint::fill("red"));
        Painter::new(&mut surface).shape(&ray, &Paint::default());
        let log = surface.commands();
        assert_eq!(log.len(), 1);
        assert!(matches!(&log[0], DrawCommand::Line { to, .. } if *to == Vec2::new(5.0, 0.0)));
    }

    #[test]
    fn commands_serialize_with_op_tag() {
        let json = serde_json::to_value(DrawCommand::Clear { color: "#fff".into() }).unwrap();
        assert_eq!(json["op"], "clear");
    }
}
