//! In-game level editor.
//!
//! The editor is a module on an object tagged `editor`. It toggles between
//! play and edit mode on the `editor_toggle` binding. In edit mode runtime
//! objects are cleared, gizmos are drawn and the pointer binding applies the
//! current [`EditorTool`] at the pointer's world position, snapped to the
//! grid.

use ollie_core::math::Vec2;
use ollie_core::serializer::TypedDto;
use ollie_core::shape::ColliderShape;
use serde::{Deserialize, Serialize};

use crate::game::Game;
use crate::level::{capture_level, spawn_entry};
use crate::module::{Module, ModuleContext};
use crate::modules::size::Size2d;
use crate::object::{GameObject, ObjectId, EDITOR_TAG, LEVEL_OBJECT_TAG};
use crate::prefabs::{goal_entry, spawn_point_entry, wall_rect_entry, Spawn};

/// What a pointer press does in edit mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorTool {
    /// Drag the object under the pointer.
    #[default]
    Select,
    PlaceWall,
    PlaceGoal,
    /// Destroy every object under the pointer.
    Erase,
    /// Move the level's single spawn point.
    SetSpawn,
}

/// Level editor state. Not serializable; never saved into a level.
#[derive(Debug, Clone)]
pub struct LevelEditor {
    pub tool: EditorTool,
    /// Grid step for placement and dragging.
    pub grid: f64,
    /// Size of placed walls and goals.
    pub place_size: Vec2,
    active: bool,
    /// Object being dragged and its offset from the pointer.
    dragging: Option<(ObjectId, Vec2)>,
    saved: Option<String>,
}

impl Default for LevelEditor {
    fn default() -> Self {
        Self {
            tool: EditorTool::Select,
            grid: 20.0,
            place_size: Vec2::new(40.0, 40.0),
            active: false,
            dragging: None,
            saved: None,
        }
    }
}

impl LevelEditor {
    /// Spawn an editor object.
    pub fn spawn(game: &mut Game) -> ObjectId {
        game.spawn_plain(|object| {
            object.name = "Editor".to_owned();
            object.with_tag(EDITOR_TAG);
            object.modules.add(Box::new(LevelEditor::default()));
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    /// Whether the level differs from the last [`mark_saved`](Self::mark_saved).
    /// A never-saved level is dirty.
    pub fn is_dirty(&self, game: &Game) -> bool {
        self.saved.as_deref() != Some(capture_level(game).fingerprint().as_str())
    }

    /// Record the fingerprint of the level as saved, e.g. the value returned
    /// by [`save_level`](crate::level::save_level).
    pub fn mark_saved(&mut self, fingerprint: impl Into<String>) {
        self.saved = Some(fingerprint.into());
    }

    /// Enter or leave edit mode.
    pub fn set_active(&mut self, active: bool, game: &mut Game) {
        if self.active == active {
            return;
        }
        self.active = active;
        self.dragging = None;
        if active {
            let cleared = game.destroy_some(|o| o.has_tag(LEVEL_OBJECT_TAG));
            game.set_render_gizmos(true);
            tracing::info!(cleared, "editor: edit mode");
        } else {
            game.set_render_gizmos(false);
            game.request_restart();
            tracing::info!("editor: play mode");
        }
    }

    fn apply_tool(&mut self, game: &mut Game) {
        let bindings = game.bindings().clone();
        let input = game.input();
        let pointer = input.pointer();
        let snapped = pointer.snapped(self.grid);
        let pressed = bindings.pointer.is_pressed(input);
        let down = bindings.pointer.is_down(input);

        match self.tool {
            EditorTool::Select => {
                if pressed {
                    self.dragging = pick(game, pointer)
                        .map(|id| (id, game.object(id).position() - pointer));
                }
                match self.dragging {
                    Some((id, offset)) if down => match game.scene_mut().get_mut(id) {
                        Some(object) => {
                            object.transform.set_position((pointer + offset).snapped(self.grid));
                        }
                        None => self.dragging = None,
                    },
                    _ => self.dragging = None,
                }
            }
            EditorTool::PlaceWall if pressed => place(game, wall_rect_entry(snapped, self.place_size)),
            EditorTool::PlaceGoal if pressed => place(game, goal_entry(snapped, self.place_size)),
            EditorTool::Erase if pressed => {
                let probe = ColliderShape::point(pointer);
                let erased = game.destroy_some(|o| is_editable(o) && hit(o, &probe));
                tracing::debug!(erased, "editor: erase");
            }
            EditorTool::SetSpawn if pressed => {
                game.destroy_some(|o| o.behavior_as::<Spawn>().is_some());
                place(game, spawn_point_entry(snapped));
            }
            _ => {}
        }
    }
}

fn place(game: &mut Game, entry: TypedDto) {
    match spawn_entry(game, &entry) {
        Ok(id) => tracing::debug!(object = %id, type_key = %entry.type_key, "editor: placed"),
        Err(failure) => tracing::warn!(error = %failure, "editor: placement failed"),
    }
}

/// Level content the editor may touch.
fn is_editable(object: &GameObject) -> bool {
    !object.has_tag(EDITOR_TAG) && !object.has_tag(LEVEL_OBJECT_TAG)
}

fn hit(object: &GameObject, probe: &ColliderShape) -> bool {
    if object.overlaps(probe) {
        return true;
    }
    let ColliderShape::Point { position } = probe else {
        return false;
    };
    object
        .modules
        .get::<Size2d>()
        .is_some_and(|size| size.rect_at(object.position()).contains_point(*position))
}

/// Topmost editable object under `point`.
fn pick(game: &Game, point: Vec2) -> Option<ObjectId> {
    let probe = ColliderShape::point(point);
    let scene = game.scene();
    scene.render_order().into_iter().rev().find(|id| {
        scene
            .get(*id)
            .is_some_and(|o| is_editable(o) && hit(o, &probe))
    })
}

impl Module for LevelEditor {
    fn update(&mut self, ctx: &mut ModuleContext<'_>) {
        let toggle = ctx.game.bindings().editor_toggle.is_pressed(ctx.game.input());
        if toggle {
            let active = !self.active;
            self.set_active(active, ctx.game);
        }
        if self.active {
            self.apply_tool(ctx.game);
        }
    }

    fn dispose(&mut self, ctx: &mut ModuleContext<'_>) {
        if self.active {
            ctx.game.set_render_gizmos(false);
        }
    }
}
