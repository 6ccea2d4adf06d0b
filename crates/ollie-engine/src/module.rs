//! Behavior modules and the per-object module collection.
//!
//! A [`Module`] is a fragment of data and behavior attached to one
//! [`GameObject`]. Modules never store a pointer to their owner; every hook
//! receives a [`ModuleContext`] carrying the owner and the game instead.
//!
//! While a module's hook runs, the module is checked out of its slot, so the
//! hook can freely mutate the owner (including its other modules) and the
//! game.

use std::fmt;

use ollie_core::input::InputState;
use ollie_core::serializer::Reflect;

use crate::events::{EventSubscriptionId, GameEvent};
use crate::game::Game;
use crate::modules::collider::Collider2d;
use crate::object::{GameObject, ObjectBehavior, ObjectId, Resource};
use crate::render::RenderContext;

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// The three update passes, run in this order over all objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdatePass {
    BeforeUpdate,
    Update,
    AfterUpdate,
}

impl UpdatePass {
    pub const ALL: [UpdatePass; 3] = [
        UpdatePass::BeforeUpdate,
        UpdatePass::Update,
        UpdatePass::AfterUpdate,
    ];
}

/// The render passes. Gizmo passes only run when gizmos are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPass {
    BeforeRender,
    Render,
    AfterRender,
    BeforeGizmos,
    Gizmos,
    AfterGizmos,
}

impl RenderPass {
    pub const MAIN: [RenderPass; 3] = [
        RenderPass::BeforeRender,
        RenderPass::Render,
        RenderPass::AfterRender,
    ];

    pub const GIZMOS: [RenderPass; 3] = [
        RenderPass::BeforeGizmos,
        RenderPass::Gizmos,
        RenderPass::AfterGizmos,
    ];
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

/// A behavior/data fragment owned by a single game object.
///
/// All hooks default to no-ops. `initialize` and `dispose` always run; the
/// update and render hooks are skipped while the module's slot is disabled.
#[allow(unused_variables)]
pub trait Module: Reflect {
    fn initialize(&mut self, ctx: &mut ModuleContext<'_>) {}

    fn before_update(&mut self, ctx: &mut ModuleContext<'_>) {}
    fn update(&mut self, ctx: &mut ModuleContext<'_>) {}
    fn after_update(&mut self, ctx: &mut ModuleContext<'_>) {}

    fn before_render(&self, ctx: &mut RenderContext<'_>) {}
    fn render(&self, ctx: &mut RenderContext<'_>) {}
    fn after_render(&self, ctx: &mut RenderContext<'_>) {}

    fn before_render_gizmos(&self, ctx: &mut RenderContext<'_>) {}
    fn render_gizmos(&self, ctx: &mut RenderContext<'_>) {}
    fn after_render_gizmos(&self, ctx: &mut RenderContext<'_>) {}

    fn dispose(&mut self, ctx: &mut ModuleContext<'_>) {}

    /// Collider capability. Collider modules return `Some(self)`.
    fn as_collider(&self) -> Option<&dyn Collider2d> {
        None
    }
}

impl dyn Module {
    /// Downcast to a concrete module type.
    pub fn downcast_ref<T: Module>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Module>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn is<T: Module>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub(crate) fn run_update(&mut self, pass: UpdatePass, ctx: &mut ModuleContext<'_>) {
        match pass {
            UpdatePass::BeforeUpdate => self.before_update(ctx),
            UpdatePass::Update => self.update(ctx),
            UpdatePass::AfterUpdate => self.after_update(ctx),
        }
    }

    pub(crate) fn run_render(&self, pass: RenderPass, ctx: &mut RenderContext<'_>) {
        match pass {
            RenderPass::BeforeRender => self.before_render(ctx),
            RenderPass::Render => self.render(ctx),
            RenderPass::AfterRender => self.after_render(ctx),
            RenderPass::BeforeGizmos => self.before_render_gizmos(ctx),
            RenderPass::Gizmos => self.render_gizmos(ctx),
            RenderPass::AfterGizmos => self.after_render_gizmos(ctx),
        }
    }
}

// ---------------------------------------------------------------------------
// ModuleId
// ---------------------------------------------------------------------------

/// Identifies a module slot within one object's collection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u64);

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ModuleCollection
// ---------------------------------------------------------------------------

struct ModuleSlot {
    id: ModuleId,
    enabled: bool,
    initialized: bool,
    /// `None` while the module's own hook is running.
    module: Option<Box<dyn Module>>,
}

/// Ordered module slots of one object.
///
/// Lookups only see modules that are currently in their slot; a module whose
/// hook is running is invisible to its own lookups.
#[derive(Default)]
pub struct ModuleCollection {
    slots: Vec<ModuleSlot>,
    next_id: u64,
}

impl ModuleCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module. Several modules of the same type may coexist.
    ///
    /// This does not initialize the module; see
    /// [`ModuleContext::add_module`] and [`Game::add_module`].
    pub fn add(&mut self, module: Box<dyn Module>) -> ModuleId {
        let id = ModuleId(self.next_id);
        self.next_id += 1;
        self.slots.push(ModuleSlot {
            id,
            enabled: true,
            initialized: false,
            module: Some(module),
        });
        id
    }

    /// First module of type `T`.
    pub fn get<T: Module>(&self) -> Option<&T> {
        self.iter_of::<T>().next()
    }

    pub fn get_mut<T: Module>(&mut self) -> Option<&mut T> {
        self.iter_of_mut::<T>().next()
    }

    /// All modules of type `T`, in slot order.
    ///
    /// The iterator is lazy; call again to re-evaluate against the current
    /// slots.
    pub fn iter_of<T: Module>(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots
            .iter()
            .filter_map(|s| s.module.as_deref()?.downcast_ref::<T>())
    }

    pub fn iter_of_mut<T: Module>(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.slots
            .iter_mut()
            .filter_map(|s| s.module.as_deref_mut()?.downcast_mut::<T>())
    }

    /// Whether any module of type `T` is present.
    pub fn has<T: Module>(&self) -> bool {
        self.get::<T>().is_some()
    }

    /// Enabled collider modules.
    pub fn colliders(&self) -> impl Iterator<Item = &dyn Collider2d> + '_ {
        self.slots
            .iter()
            .filter(|s| s.enabled)
            .filter_map(|s| s.module.as_deref()?.as_collider())
    }

    /// Module in slot `id`.
    pub fn by_id(&self, id: ModuleId) -> Option<&(dyn Module + 'static)> {
        self.slot(id)?.module.as_deref()
    }

    pub fn by_id_mut(&mut self, id: ModuleId) -> Option<&mut (dyn Module + 'static)> {
        self.slot_mut(id)?.module.as_deref_mut()
    }

    /// Slot id of the first module of type `T`.
    pub fn id_of<T: Module>(&self) -> Option<ModuleId> {
        self.slots
            .iter()
            .find(|s| s.module.as_deref().is_some_and(|m| m.is::<T>()))
            .map(|s| s.id)
    }

    /// All present modules with their slot id and enabled flag.
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, bool, &(dyn Module + 'static))> + '_ {
        self.slots
            .iter()
            .filter_map(|s| Some((s.id, s.enabled, s.module.as_deref()?)))
    }

    /// Remove slot `id` without disposing it. No-op (`None`) if absent.
    ///
    /// Removing a slot whose module is checked out also returns `None`; the
    /// module is disposed when its hook returns.
    pub fn remove(&mut self, id: ModuleId) -> Option<Box<dyn Module>> {
        let index = self.slots.iter().position(|s| s.id == id)?;
        self.slots.remove(index).module
    }

    /// Enable or disable slot `id`. Returns `false` if there is no such slot.
    pub fn set_enabled(&mut self, id: ModuleId, enabled: bool) -> bool {
        match self.slot_mut(id) {
            Some(slot) => {
                slot.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: ModuleId) -> bool {
        self.slot(id).is_some_and(|s| s.enabled)
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.slot(id).is_some()
    }

    /// Slot ids in order.
    pub fn ids(&self) -> Vec<ModuleId> {
        self.slots.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    // -- checkout ------------------------------------------------------------

    pub(crate) fn take(&mut self, id: ModuleId) -> Option<Box<dyn Module>> {
        self.slot_mut(id)?.module.take()
    }

    /// Return a checked-out module. Hands it back if its slot was removed
    /// meanwhile.
    pub(crate) fn restore(
        &mut self,
        id: ModuleId,
        module: Box<dyn Module>,
    ) -> Result<(), Box<dyn Module>> {
        match self.slot_mut(id) {
            Some(slot) if slot.module.is_none() => {
                slot.module = Some(module);
                Ok(())
            }
            _ => Err(module),
        }
    }

    pub(crate) fn next_uninitialized(&self) -> Option<ModuleId> {
        self.slots
            .iter()
            .find(|s| !s.initialized && s.module.is_some())
            .map(|s| s.id)
    }

    pub(crate) fn mark_initialized(&mut self, id: ModuleId) {
        if let Some(slot) = self.slot_mut(id) {
            slot.initialized = true;
        }
    }

    fn slot(&self, id: ModuleId) -> Option<&ModuleSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    fn slot_mut(&mut self, id: ModuleId) -> Option<&mut ModuleSlot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }
}

impl fmt::Debug for ModuleCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|s| {
                (
                    s.id,
                    s.enabled,
                    s.module.as_deref().map_or("<running>", |m| m.type_name()),
                )
            }))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ModuleContext
// ---------------------------------------------------------------------------

/// Everything a module hook may touch: its owner and the game.
pub struct ModuleContext<'a> {
    pub owner: &'a mut GameObject,
    pub game: &'a mut Game,
    module: ModuleId,
}

impl<'a> ModuleContext<'a> {
    pub(crate) fn new(owner: &'a mut GameObject, game: &'a mut Game, module: ModuleId) -> Self {
        Self {
            owner,
            game,
            module,
        }
    }

    /// Slot id of the module whose hook is running.
    pub fn module_id(&self) -> ModuleId {
        self.module
    }

    pub fn owner_id(&self) -> ObjectId {
        self.owner.id()
    }

    /// Add a module to the owner. If the owner has finished initializing, the
    /// new module is initialized before this returns.
    pub fn add_module<M: Module>(&mut self, module: M) -> ModuleId {
        self.owner.attach_module(Box::new(module), self.game)
    }

    /// Remove and dispose the running module once its hook returns.
    pub fn remove_self(&mut self) {
        self.owner.modules.remove(self.module);
    }

    /// Enable or disable the running module.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.owner.modules.set_enabled(self.module, enabled);
    }

    /// Destroy the owner. Disposal happens as soon as the owner's current
    /// hook returns.
    pub fn destroy_owner(&mut self) {
        let id = self.owner.id();
        self.game.destroy(id);
    }

    /// Subscribe the owner to a game event. The subscription is released
    /// when the owner is disposed.
    pub fn on_game_event(
        &mut self,
        event: &str,
        handler: impl FnMut(&mut GameObject, &mut Game, &GameEvent) + 'static,
    ) -> EventSubscriptionId {
        let id = self
            .game
            .events_mut()
            .subscribe_object(event, self.owner.id(), Box::new(handler));
        self.owner.push_resource(Resource::Subscription(id));
        id
    }

    /// Run `cleanup` when the owner is disposed.
    pub fn on_dispose(&mut self, cleanup: impl FnOnce(&mut Game) + 'static) {
        self.owner.push_resource(Resource::Cleanup(Box::new(cleanup)));
    }

    pub fn input(&self) -> &InputState {
        self.game.input()
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.game.emit(event);
    }

    /// Spawn a new object. See [`Game::spawn`].
    pub fn spawn(
        &mut self,
        behavior: Box<dyn ObjectBehavior>,
        setup: impl FnOnce(&mut GameObject),
    ) -> ObjectId {
        self.game.spawn(behavior, setup)
    }
}
