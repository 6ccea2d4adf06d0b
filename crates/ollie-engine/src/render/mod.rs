//! Abstract 2D rendering.
//!
//! The engine never talks to a graphics API. Every frame is a sequence of
//! [`DrawCommand`]s submitted to a [`Surface`]; hosts translate them to a
//! canvas, a GPU backend or, in tests, a [`RecordingSurface`].

pub mod canvas;
pub mod surface;

pub use canvas::{viewport_transform, CanvasId};
pub use surface::{DrawCommand, Paint, Painter, RecordingSurface, Stroke, Surface};

use crate::game::Game;
use crate::object::GameObject;

/// What a render hook sees: the object being drawn, the game (read-only)
/// and a painter for the current canvas.
pub struct RenderContext<'a> {
    pub owner: &'a GameObject,
    pub game: &'a Game,
    pub painter: Painter<'a>,
}

impl<'a> RenderContext<'a> {
    pub fn new(owner: &'a GameObject, game: &'a Game, surface: &'a mut dyn Surface) -> Self {
        Self {
            owner,
            game,
            painter: Painter::new(surface),
        }
    }
}
