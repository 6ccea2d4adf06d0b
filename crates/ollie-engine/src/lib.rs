//! Ollie Engine -- game objects, modules, the fixed-step loop and levels.
//!
//! This crate builds on [`ollie_core`] to provide the simulation side of the
//! engine: a [`Game`](game::Game) owns a scene of
//! [`GameObject`](object::GameObject)s, each composed of swappable
//! [`Module`](module::Module)s, and drives them through update passes at a
//! fixed rate. Objects and modules serialize to JSON level files and back,
//! with bad data reported instead of aborting the load.
//!
//! # Quick Start
//!
//! ```
//! use ollie_engine::prelude::*;
//!
//! let mut game = Game::new(GameConfig::default());
//! let level = r#"{
//!     "obstacles": [
//!         { "type": "obstacle_rectangle", "x": 300, "y": 0, "width": 40, "height": 200 }
//!     ],
//!     "spawn": { "x": 60, "y": 200 }
//! }"#;
//!
//! let report = load_level(level, &mut game);
//! assert!(report.errors.is_empty());
//!
//! // Starting the game spawns the player at the spawn point.
//! game.start();
//! game.run_ticks(10);
//! assert_eq!(game.scene().find_by_tag(PLAYER_TAG).count(), 1);
//! ```

#![deny(unsafe_code)]

pub mod events;
pub mod game;
pub mod level;
pub mod module;
pub mod modules;
pub mod object;
pub mod prefabs;
pub mod registry;
pub mod render;
pub mod scene;

use ollie_core::CoreError;

use crate::object::ObjectId;

/// Re-export the core crate for convenience.
pub use ollie_core;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The id does not name a live, visible object.
    #[error("unknown object {id}")]
    UnknownObject { id: ObjectId },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use ollie_core::prelude::*;

    pub use crate::events::{EventSubscriptionId, GameEvent};
    pub use crate::game::{AbortSignal, Game, GameConfig, LoopState, TickDiagnostics};
    pub use crate::level::{
        capture_level, load_level, load_level_from_store, save_level, DirectoryLevelStore,
        LevelFile, LevelLoadReport, LevelStore, MemoryLevelStore,
    };
    pub use crate::module::{Module, ModuleCollection, ModuleContext, ModuleId, RenderPass, UpdatePass};
    pub use crate::modules::bird::OBSTACLE_TAG;
    pub use crate::modules::spawner::PLAYER_TAG;
    pub use crate::modules::*;
    pub use crate::object::{
        GameObject, GameObjectDto, ObjectBehavior, ObjectId, PlainObject, EDITOR_TAG,
        LEVEL_OBJECT_TAG,
    };
    pub use crate::prefabs::{Gate, Goal, Spawn, Wall};
    pub use crate::registry::{
        LoadContext, SerializableBehavior, SerializableModule, MODULE_SERIALIZER, OBJECT_SERIALIZER,
    };
    pub use crate::render::{
        CanvasId, DrawCommand, Paint, Painter, RecordingSurface, RenderContext, Stroke, Surface,
    };
    pub use crate::scene::Scene;
    pub use crate::EngineError;
}
