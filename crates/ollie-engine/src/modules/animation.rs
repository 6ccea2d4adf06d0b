//! Sprite-sheet animation.

use ollie_core::math::Rect2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::module::{Module, ModuleContext};
use crate::registry::{parse_data, to_data, LoadContext, SerializableModule};
use crate::render::RenderContext;

/// Plays frames laid out left to right on one row of a sprite sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub sheet: String,
    pub frame_width: f64,
    pub frame_height: f64,
    pub frame_count: u32,
    /// Updates each frame stays on screen.
    #[serde(default = "default_ticks_per_frame")]
    pub ticks_per_frame: u32,
    #[serde(default = "default_looping")]
    pub looping: bool,
    #[serde(default)]
    frame: u32,
    #[serde(skip)]
    elapsed: u32,
}

fn default_ticks_per_frame() -> u32 {
    6
}

fn default_looping() -> bool {
    true
}

impl Animation {
    pub fn new(sheet: impl Into<String>, frame_width: f64, frame_height: f64, frame_count: u32) -> Self {
        Self {
            sheet: sheet.into(),
            frame_width,
            frame_height,
            frame_count,
            ticks_per_frame: default_ticks_per_frame(),
            looping: default_looping(),
            frame: 0,
            elapsed: 0,
        }
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Jump to frame `index` and restart its timer.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside `0..frame_count`.
    #[track_caller]
    pub fn set_frame(&mut self, index: u32) {
        assert!(
            index < self.frame_count,
            "animation frame {} out of range (frame_count = {})",
            index,
            self.frame_count
        );
        self.frame = index;
        self.elapsed = 0;
    }

    /// A non-looping animation resting on its last frame.
    pub fn is_finished(&self) -> bool {
        !self.looping && self.frame + 1 >= self.frame_count
    }

    /// Advance the timer by one update.
    pub fn advance(&mut self) {
        if self.frame_count == 0 {
            return;
        }
        self.elapsed += 1;
        if self.elapsed < self.ticks_per_frame.max(1) {
            return;
        }
        self.elapsed = 0;
        if self.frame + 1 < self.frame_count {
            self.frame += 1;
        } else if self.looping {
            self.frame = 0;
        }
    }

    /// Region of the sheet holding the current frame.
    pub fn source_rect(&self) -> Rect2 {
        Rect2::new(
            self.frame as f64 * self.frame_width,
            0.0,
            self.frame_width,
            self.frame_height,
        )
    }
}

impl Module for Animation {
    fn update(&mut self, _: &mut ModuleContext<'_>) {
        self.advance();
    }

    fn render(&self, ctx: &mut RenderContext<'_>) {
        if self.frame_count == 0 {
            return;
        }
        let position = ctx.owner.position();
        let dest = Rect2::new(position.x, position.y, self.frame_width, self.frame_height);
        ctx.painter.sprite(&self.sheet, self.source_rect(), dest);
    }
}

impl SerializableModule for Animation {
    const TYPE_KEY: &'static str = "Animation";

    fn to_data(&self) -> Value {
        to_data(self)
    }

    fn from_data(data: &Value, _: &mut LoadContext) -> Result<Self, String> {
        let animation: Self = parse_data(data)?;
        if !(animation.frame_width > 0.0 && animation.frame_height > 0.0) {
            return Err("frame size must be positive".into());
        }
        if animation.frame_count > 0 && animation.frame >= animation.frame_count {
            return Err(format!(
                "frame {} out of range (frame_count = {})",
                animation.frame, animation.frame_count
            ));
        }
        Ok(animation)
    }
}
