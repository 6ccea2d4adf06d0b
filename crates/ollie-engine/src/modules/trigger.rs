//! Level goal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::GameEvent;
use crate::module::{Module, ModuleContext};
use crate::modules::spawner::PLAYER_TAG;
use crate::registry::{parse_data, to_data, LoadContext, SerializableModule};

/// Emits `levelComplete` the first time a `player` object overlaps the
/// owner's colliders. Re-armed on every `gameStart`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalTrigger {
    #[serde(skip)]
    pub triggered: bool,
}

impl Module for GoalTrigger {
    fn initialize(&mut self, ctx: &mut ModuleContext<'_>) {
        let module = ctx.module_id();
        ctx.on_game_event("gameStart", move |owner, _, _| {
            if let Some(trigger) = owner
                .modules
                .by_id_mut(module)
                .and_then(|m| m.downcast_mut::<GoalTrigger>())
            {
                trigger.triggered = false;
            }
        });
    }

    fn after_update(&mut self, ctx: &mut ModuleContext<'_>) {
        if self.triggered {
            return;
        }
        let owner = &*ctx.owner;
        let reached = ctx
            .game
            .scene()
            .find_by_tag(PLAYER_TAG)
            .any(|player| owner.touches(player));
        if reached {
            self.triggered = true;
            tracing::info!(goal = %owner.id(), "level complete");
            ctx.emit(GameEvent::LevelComplete);
        }
    }
}

impl SerializableModule for GoalTrigger {
    const TYPE_KEY: &'static str = "GoalTrigger";

    fn to_data(&self) -> Value {
        to_data(self)
    }

    fn from_data(data: &Value, _: &mut LoadContext) -> Result<Self, String> {
        parse_data(data)
    }
}
