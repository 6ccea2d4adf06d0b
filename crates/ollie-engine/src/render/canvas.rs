//! Canvases attached to a game and the world-to-canvas viewport.

use std::fmt;

use ollie_core::math::{Mat3, Vec2};

use super::surface::Surface;

/// Identifies a canvas attached with [`Game::add_canvas`](crate::game::Game::add_canvas).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanvasId(pub(crate) u64);

impl fmt::Debug for CanvasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanvasId({})", self.0)
    }
}

/// Transform that fits `world` into `canvas`, preserving aspect ratio and
/// centring the letterbox.
///
/// # Panics
///
/// Panics if `world` has a non-positive component.
pub fn viewport_transform(canvas: Vec2, world: Vec2) -> Mat3 {
    assert!(
        world.x > 0.0 && world.y > 0.0,
        "world size must be positive, got {:?}",
        world
    );
    let scale = (canvas.x / world.x).min(canvas.y / world.y).max(0.0);
    let offset = (canvas - world * scale) * 0.5;
    Mat3::translation(offset) * Mat3::scaling(Vec2::new(scale, scale))
}

pub(crate) struct AttachedCanvas {
    pub(crate) id: CanvasId,
    pub(crate) surface: Box<dyn Surface>,
    pub(crate) size: Vec2,
    pub(crate) transform: Mat3,
    pub(crate) resize_requested: bool,
}

impl AttachedCanvas {
    pub(crate) fn new(id: CanvasId, surface: Box<dyn Surface>, world: Vec2) -> Self {
        let mut canvas = Self {
            id,
            surface,
            size: Vec2::ZERO,
            transform: Mat3::IDENTITY,
            resize_requested: false,
        };
        canvas.refresh(world);
        canvas
    }

    /// Re-read the surface size and recompute the viewport.
    pub(crate) fn refresh(&mut self, world: Vec2) {
        self.size = self.surface.size();
        self.transform = viewport_transform(self.size, world);
        self.resize_requested = false;
    }

    /// Whether the surface changed size since the last refresh or a resize
    /// was requested.
    pub(crate) fn is_stale(&self) -> bool {
        self.resize_requested || self.surface.size() != self.size
    }

    /// Canvas pixels to world units. `None` for a degenerate viewport.
    pub(crate) fn unproject(&self, physical: Vec2) -> Option<Vec2> {
        Some(self.transform.inverse()?.transform_point(physical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn wide_canvas_letterboxes_horizontally() {
        let m = viewport_transform(Vec2::new(1600.0, 450.0), Vec2::new(800.0, 450.0));
        assert!(close(m.transform_point(Vec2::ZERO), Vec2::new(400.0, 0.0)));
        assert!(close(m.transform_point(Vec2::new(800.0, 450.0)), Vec2::new(1200.0, 450.0)));
    }

    #[test]
    fn scale_is_the_smaller_ratio() {
        let m = viewport_transform(Vec2::new(400.0, 450.0), Vec2::new(800.0, 450.0));
        assert!(close(m.transform_vector(Vec2::new(1.0, 1.0)), Vec2::new(0.5, 0.5)));
        assert!(close(m.transform_point(Vec2::ZERO), Vec2::new(0.0, 112.5)));
    }

    #[test]
    fn zero_sized_canvas_cannot_unproject() {
        let canvas = AttachedCanvas::new(
            CanvasId(0),
            Box::new(super::super::RecordingSurface::new(Vec2::ZERO)),
            Vec2::new(800.0, 450.0),
        );
        assert!(canvas.unproject(Vec2::new(1.0, 1.0)).is_none());
    }
}
