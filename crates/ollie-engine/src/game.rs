//! The game: object scene, fixed-rate loop, event delivery and rendering.
//!
//! Each [`tick`](Game::tick):
//!
//! 1. The input state is stepped: the last tick's state becomes "previous"
//!    and raw events recorded since become "current", so a press is seen as
//!    an edge on the first tick after it happened.
//! 2. `before_update` runs over every live object, then `update`, then
//!    `after_update` (passes are global, never interleaved per object).
//!    Each pass iterates a snapshot of the object ids taken when the pass
//!    starts; objects spawned during a pass join the next one.
//! 3. A restart requested during the tick is carried out.
//! 4. A render is queued; [`animation_frame`](Game::animation_frame) delivers
//!    it.
//!
//! Events emitted while any hook is running are queued and delivered as soon
//! as the outermost hook returns, in emission order.
//!
//! # Example
//!
//! ```
//! use ollie_engine::prelude::*;
//!
//! let mut game = Game::new(GameConfig::default());
//! let id = game.spawn_plain(|object| {
//!     object.transform.set_position(Vec2::new(10.0, 20.0));
//! });
//!
//! game.start();
//! game.run_ticks(3);
//! assert_eq!(game.tick_count(), 3);
//! assert_eq!(game.object(id).position(), Vec2::new(10.0, 20.0));
//!
//! game.stop();
//! assert!(game.scene().is_empty());
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ollie_core::input::{Bindings, InputState, MouseButton};
use ollie_core::math::{Mat3, Vec2};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::events::{EventBus, EventSubscriptionId, GameEvent, Handler};
use crate::module::{Module, ModuleId, RenderPass, UpdatePass};
use crate::object::{GameObject, ObjectBehavior, ObjectId, PlainObject, Resource, LEVEL_OBJECT_TAG};
use crate::render::canvas::AttachedCanvas;
use crate::render::{CanvasId, Painter, RenderContext, Surface};
use crate::scene::Scene;
use crate::EngineError;

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Game construction parameters. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// World width in world units. Must be positive and finite.
    pub width: f64,
    /// World height in world units. Must be positive and finite.
    pub height: f64,
    /// Fixed update rate. Must be positive and finite.
    pub updates_per_second: f64,
    pub render_gizmos: bool,
    /// CSS-style clear color.
    pub background: String,
    /// Seed for object ids and the gameplay RNG.
    pub seed: u64,
}

impl Default for GameConfig {
    /// 800x450 world at 60 Hz, gizmos off, sky-blue background.
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 450.0,
            updates_per_second: 60.0,
            render_gizmos: false,
            background: "#87ceeb".to_owned(),
            seed: 0,
        }
    }
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn world_size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Time between two ticks of [`Game::run`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.updates_per_second)
    }
}

// ---------------------------------------------------------------------------
// Loop state
// ---------------------------------------------------------------------------

/// `Idle -> start() -> Running -> stop() -> Stopped`. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Cross-thread stop request for [`Game::run`].
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per update pass, in execution order.
    pub pass_times: Vec<(UpdatePass, Duration)>,
    /// Total time for the tick (input step, passes, pending restart).
    pub total_time: Duration,
    /// Live objects when the tick finished.
    pub object_count: usize,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// Owns every object, the event bus, input and attached canvases.
pub struct Game {
    config: GameConfig,
    state: LoopState,
    scene: Scene,
    events: EventBus,
    input: InputState,
    bindings: Bindings,
    rng: Pcg64,
    id_rng: Pcg64,
    issued: HashSet<u64>,
    canvases: Vec<AttachedCanvas>,
    next_canvas: u64,
    world_size: Vec2,
    background: String,
    render_requested: bool,
    restart_requested: bool,
    abort: AbortSignal,
    tick_count: u64,
    diagnostics: TickDiagnostics,
    /// Number of object hooks currently on the stack.
    hook_depth: u32,
    /// Objects checked out of the scene, innermost last.
    checked_out: Vec<ObjectId>,
}

/// Hook bookkeeping captured before running code that may panic, see
/// [`Game::recover_from_panic`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct HookMark {
    depth: u32,
    checked_out: usize,
    dispatching: bool,
}

impl Game {
    /// Create an idle game.
    ///
    /// # Panics
    ///
    /// Panics if `updates_per_second`, `width` or `height` is not positive
    /// and finite.
    pub fn new(config: GameConfig) -> Self {
        assert!(
            config.updates_per_second > 0.0 && config.updates_per_second.is_finite(),
            "updates_per_second must be positive and finite, got {}",
            config.updates_per_second
        );
        let world_size = config.world_size();
        assert_valid_world(world_size);

        Self {
            state: LoopState::Idle,
            scene: Scene::new(),
            events: EventBus::new(),
            input: InputState::new(),
            bindings: Bindings::default(),
            rng: Pcg64::seed_from_u64(config.seed),
            id_rng: Pcg64::seed_from_u64(config.seed ^ 0x6f6c_6c69_6520_6964),
            issued: HashSet::new(),
            canvases: Vec::new(),
            next_canvas: 0,
            world_size,
            background: config.background.clone(),
            render_requested: false,
            restart_requested: false,
            abort: AbortSignal::new(),
            tick_count: 0,
            diagnostics: TickDiagnostics::default(),
            hook_depth: 0,
            checked_out: Vec::new(),
            config,
        }
    }

    // -- accessors -----------------------------------------------------------

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn diagnostics(&self) -> &TickDiagnostics {
        &self.diagnostics
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Raw device entry points (key, mouse, gamepad events).
    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn set_bindings(&mut self, bindings: Bindings) {
        self.bindings = bindings;
    }

    /// Seeded gameplay RNG.
    pub fn rng(&mut self) -> &mut Pcg64 {
        &mut self.rng
    }

    pub fn world_size(&self) -> Vec2 {
        self.world_size
    }

    /// Change the world size. Every canvas viewport is recomputed.
    ///
    /// # Panics
    ///
    /// Panics if either component is not positive and finite.
    pub fn set_world_size(&mut self, size: Vec2) {
        assert_valid_world(size);
        self.world_size = size;
        for canvas in &mut self.canvases {
            canvas.refresh(size);
        }
        self.queue_render();
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn set_background(&mut self, color: impl Into<String>) {
        self.background = color.into();
        self.queue_render();
    }

    pub fn set_render_gizmos(&mut self, enabled: bool) {
        self.config.render_gizmos = enabled;
        self.queue_render();
    }

    /// Live object `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a visible object.
    #[track_caller]
    pub fn object(&self, id: ObjectId) -> &GameObject {
        match self.scene.get(id) {
            Some(object) => object,
            None => panic!("{}", EngineError::UnknownObject { id }),
        }
    }

    #[track_caller]
    pub fn object_mut(&mut self, id: ObjectId) -> &mut GameObject {
        match self.scene.get_mut(id) {
            Some(object) => object,
            None => panic!("{}", EngineError::UnknownObject { id }),
        }
    }

    pub fn try_object(&self, id: ObjectId) -> Result<&GameObject, EngineError> {
        self.scene.get(id).ok_or(EngineError::UnknownObject { id })
    }

    // -- objects -------------------------------------------------------------

    pub(crate) fn next_object_id(&mut self) -> ObjectId {
        loop {
            let raw: u64 = self.id_rng.gen();
            if raw != 0 && self.issued.insert(raw) {
                return ObjectId::from_raw(raw);
            }
        }
    }

    /// Create an object, let `setup` configure it, insert it and run its
    /// initialize cascade.
    pub fn spawn(
        &mut self,
        behavior: Box<dyn ObjectBehavior>,
        setup: impl FnOnce(&mut GameObject),
    ) -> ObjectId {
        let mut object = GameObject::new(self.next_object_id(), behavior);
        setup(&mut object);
        self.spawn_object(object)
    }

    /// [`spawn`](Self::spawn) with no behavior of its own.
    pub fn spawn_plain(&mut self, setup: impl FnOnce(&mut GameObject)) -> ObjectId {
        self.spawn(Box::new(PlainObject), setup)
    }

    pub(crate) fn spawn_object(&mut self, object: GameObject) -> ObjectId {
        let id = object.id();
        tracing::trace!(object = %id, name = %object.name, "spawning object");
        self.scene.insert(Box::new(object));
        self.with_object(id, |object, game| object.run_initialize(game));
        id
    }

    /// Destroy an object and run its disposal cascade.
    ///
    /// An object destroyed from inside one of its own hooks is disposed when
    /// that hook returns. Returns `false` for unknown or already destroyed
    /// ids.
    pub fn destroy(&mut self, id: ObjectId) -> bool {
        if self.scene.is_checked_out(id) {
            return self.scene.mark_doomed(id);
        }
        let Some(mut object) = self.scene.remove(id) else {
            return false;
        };
        self.hooked(|game| object.dispose(game));
        true
    }

    /// Destroy every visible object matching `predicate`. Returns how many
    /// were destroyed.
    pub fn destroy_some(&mut self, predicate: impl Fn(&GameObject) -> bool) -> usize {
        let doomed: Vec<ObjectId> = self.scene.query(predicate).map(GameObject::id).collect();
        doomed.into_iter().filter(|id| self.destroy(*id)).count()
    }

    /// Append a module to an object, initializing it immediately if the
    /// object has finished initializing.
    ///
    /// # Panics
    ///
    /// Panics if `object` is not a visible object.
    #[track_caller]
    pub fn add_module<M: Module>(&mut self, object: ObjectId, module: M) -> ModuleId {
        match self.try_add_module(object, Box::new(module)) {
            Ok(id) => id,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_add_module(
        &mut self,
        object: ObjectId,
        module: Box<dyn Module>,
    ) -> Result<ModuleId, EngineError> {
        self.with_object(object, |owner, game| owner.attach_module(module, game))
            .ok_or(EngineError::UnknownObject { id: object })
    }

    /// Remove and dispose a module. No-op (`false`) if either is absent.
    pub fn remove_module(&mut self, object: ObjectId, module: ModuleId) -> bool {
        self.with_object(object, |owner, game| owner.detach_module(module, game))
            .unwrap_or(false)
    }

    // -- events --------------------------------------------------------------

    /// Subscribe an object to `event`. The subscription is released when the
    /// object is disposed.
    pub fn on_game_event(
        &mut self,
        object: ObjectId,
        event: &str,
        handler: impl FnMut(&mut GameObject, &mut Game, &GameEvent) + 'static,
    ) -> Result<EventSubscriptionId, EngineError> {
        if !self.scene.contains(object) {
            return Err(EngineError::UnknownObject { id: object });
        }
        let id = self.events.subscribe_object(event, object, Box::new(handler));
        self.object_mut(object).push_resource(Resource::Subscription(id));
        Ok(id)
    }

    /// Subscribe a handler that lives until unsubscribed or the game stops.
    pub fn on_global_event(
        &mut self,
        event: &str,
        handler: impl FnMut(&mut Game, &GameEvent) + 'static,
    ) -> EventSubscriptionId {
        self.events.subscribe_global(event, Box::new(handler))
    }

    pub fn unsubscribe(&mut self, id: EventSubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Publish an event. Delivered synchronously when no hook or handler is
    /// running, otherwise after the current one completes.
    pub fn emit(&mut self, event: GameEvent) {
        tracing::debug!(event = %event, depth = self.hook_depth, "emit");
        self.events.push(event);
        if self.hook_depth == 0 {
            self.flush_events();
        }
    }

    fn flush_events(&mut self) {
        if self.events.dispatching {
            return;
        }
        self.events.dispatching = true;
        while let Some(event) = self.events.pop() {
            for (sub, owner) in self.events.matching(event.name()) {
                let Some(handler) = self.events.take_handler(sub) else {
                    continue;
                };
                let handler = match handler {
                    Handler::Global(mut f) => {
                        f(self, &event);
                        Handler::Global(f)
                    }
                    Handler::Object(mut f) => {
                        if let Some(owner) = owner {
                            self.with_object(owner, |object, game| f(object, game, &event));
                        }
                        Handler::Object(f)
                    }
                };
                self.events.restore_handler(sub, handler);
            }
        }
        self.events.dispatching = false;
    }

    /// Run `f` with object `id` checked out of the scene. `None` if the
    /// object is not visible.
    pub(crate) fn with_object<R>(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut GameObject, &mut Game) -> R,
    ) -> Option<R> {
        let mut object = self.scene.take(id)?;
        self.checked_out.push(id);
        let out = self.hooked(|game| {
            let out = f(&mut object, game);
            game.checked_out.pop();
            if let Some(mut doomed) = game.scene.restore(id, object) {
                doomed.dispose(game);
            }
            out
        });
        Some(out)
    }

    pub(crate) fn hook_mark(&self) -> HookMark {
        HookMark {
            depth: self.hook_depth,
            checked_out: self.checked_out.len(),
            dispatching: self.events.dispatching,
        }
    }

    /// Restore hook bookkeeping to `mark` after a panic unwound through one
    /// or more hooks and was caught.
    ///
    /// Objects checked out since `mark` were dropped by the unwind: their
    /// slots and event subscriptions are removed. Their modules never see
    /// `dispose`. Handlers that were running when the panic hit are gone
    /// too, so their subscriptions are removed as well.
    pub(crate) fn recover_from_panic(&mut self, mark: HookMark) {
        let lost = self.checked_out.split_off(mark.checked_out.min(self.checked_out.len()));
        if self.hook_depth != mark.depth || !lost.is_empty() {
            tracing::warn!(
                depth = self.hook_depth,
                lost = lost.len(),
                "recovering from a panic inside a hook"
            );
        }
        for id in lost {
            self.scene.forget_checked_out(id);
            let released = self.events.unsubscribe_owner(id);
            tracing::debug!(object = %id, released, "dropped object lost to a panic");
        }
        if !mark.dispatching {
            let orphaned = self.events.remove_orphaned();
            if orphaned > 0 {
                tracing::debug!(orphaned, "dropped handlers lost to a panic");
            }
        }
        self.hook_depth = mark.depth;
        self.events.dispatching = mark.dispatching;
    }

    fn hooked<R>(&mut self, f: impl FnOnce(&mut Game) -> R) -> R {
        self.hook_depth += 1;
        let out = f(self);
        self.hook_depth -= 1;
        if self.hook_depth == 0 {
            self.flush_events();
        }
        out
    }

    // -- lifecycle -----------------------------------------------------------

    /// Enter `Running`, emit `gameStart` and queue a render.
    ///
    /// # Panics
    ///
    /// Panics if the game was stopped.
    pub fn start(&mut self) {
        match self.state {
            LoopState::Stopped => panic!("cannot start a stopped game"),
            LoopState::Running => {
                tracing::debug!("start() on a running game ignored");
                return;
            }
            LoopState::Idle => {}
        }
        self.state = LoopState::Running;
        tracing::info!(objects = self.scene.len(), "game started");
        self.emit(GameEvent::GameStart);
        self.queue_render();
    }

    /// Destroy every runtime (`level-object`) object and emit `gameStart`
    /// again. The loop state is unchanged.
    pub fn restart(&mut self) {
        let cleared = self.destroy_some(|o| o.has_tag(LEVEL_OBJECT_TAG));
        tracing::info!(cleared, "game restarted");
        self.emit(GameEvent::GameStart);
        self.queue_render();
    }

    /// Restart at the end of the current tick.
    pub fn request_restart(&mut self) {
        self.restart_requested = true;
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }

    /// Advance one fixed step. No-op once stopped.
    pub fn tick(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        let tick_start = Instant::now();
        let mut pass_times = Vec::with_capacity(UpdatePass::ALL.len());

        // Latch raw events so a press is an edge during this tick's passes.
        self.input.step();

        for pass in UpdatePass::ALL {
            let pass_start = Instant::now();
            for id in self.scene.ids() {
                self.with_object(id, |object, game| object.run_update(pass, game));
            }
            pass_times.push((pass, pass_start.elapsed()));
        }

        if std::mem::take(&mut self.restart_requested) {
            self.restart();
        }
        self.tick_count += 1;
        self.queue_render();

        self.diagnostics = TickDiagnostics {
            pass_times,
            total_time: tick_start.elapsed(),
            object_count: self.scene.len(),
        };
        tracing::trace!(
            tick = self.tick_count,
            objects = self.diagnostics.object_count,
            elapsed = ?self.diagnostics.total_time,
            "tick complete"
        );
    }

    pub fn run_ticks(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    /// Block, ticking at the configured rate until the abort signal fires,
    /// then stop. Starts the game first if it is idle.
    ///
    /// The next tick is scheduled a fixed interval after the previous one
    /// finished; slow ticks are not caught up.
    pub fn run(&mut self) {
        if self.state == LoopState::Idle {
            self.start();
        }
        let interval = self.config.tick_interval();
        tracing::info!(?interval, "game loop running");
        while self.state == LoopState::Running && !self.abort.is_aborted() {
            self.tick();
            self.animation_frame();
            std::thread::sleep(interval);
        }
        self.stop();
    }

    /// Signal usable from another thread to end [`run`](Self::run).
    pub fn stop_handle(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Stop for good: dispose every object, detach every canvas and drop all
    /// subscriptions. Idempotent.
    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.abort.abort();
        self.state = LoopState::Stopped;
        for id in self.scene.all_ids() {
            self.destroy(id);
        }
        self.canvases.clear();
        self.events.clear();
        self.render_requested = false;
        tracing::info!(ticks = self.tick_count, "game stopped");
    }

    // -- rendering -----------------------------------------------------------

    /// Ask for a render on the next animation frame. Requests coalesce.
    pub fn queue_render(&mut self) {
        self.render_requested = true;
    }

    pub fn render_requested(&self) -> bool {
        self.render_requested
    }

    /// Render if one was queued. Returns whether a render happened.
    pub fn animation_frame(&mut self) -> bool {
        if !std::mem::take(&mut self.render_requested) {
            return false;
        }
        self.render();
        true
    }

    /// Render every attached canvas now.
    pub fn render(&mut self) {
        if self.canvases.is_empty() {
            return;
        }
        let mut canvases = std::mem::take(&mut self.canvases);
        let order = self.scene.render_order();
        for canvas in &mut canvases {
            canvas.refresh(self.world_size);
            self.render_canvas(canvas, &order);
        }
        self.canvases = canvases;
    }

    fn render_canvas(&self, canvas: &mut AttachedCanvas, order: &[ObjectId]) {
        let transform = canvas.transform;
        let surface: &mut dyn Surface = canvas.surface.as_mut();
        {
            let mut painter = Painter::new(&mut *surface);
            painter.clear(&self.background);
            painter.set_transform(transform);
        }

        let mut passes = RenderPass::MAIN.to_vec();
        if self.config.render_gizmos {
            passes.extend(RenderPass::GIZMOS);
        }
        for pass in passes {
            for id in order {
                let Some(object) = self.scene.get(*id) else {
                    continue;
                };
                let mut ctx = RenderContext::new(object, self, &mut *surface);
                object.run_render(pass, &mut ctx);
            }
        }
    }

    // -- canvases ------------------------------------------------------------

    /// Attach a drawing surface. Its viewport is computed immediately.
    pub fn add_canvas(&mut self, surface: Box<dyn Surface>) -> CanvasId {
        let id = CanvasId(self.next_canvas);
        self.next_canvas += 1;
        let canvas = AttachedCanvas::new(id, surface, self.world_size);
        tracing::debug!(canvas = ?id, size = ?canvas.size, "canvas attached");
        self.canvases.push(canvas);
        self.queue_render();
        id
    }

    /// Queue a render after the canvas changed size. The viewport itself is
    /// recomputed from the surface's current size on every render.
    pub fn request_resize(&mut self, id: CanvasId) -> bool {
        match self.canvas_mut(id) {
            Some(canvas) => {
                canvas.resize_requested = true;
                self.queue_render();
                true
            }
            None => false,
        }
    }

    /// Detach a canvas. It receives no further renders and its pointer
    /// events are ignored.
    pub fn remove_canvas(&mut self, id: CanvasId) -> Option<Box<dyn Surface>> {
        let index = self.canvases.iter().position(|c| c.id == id)?;
        tracing::debug!(canvas = ?id, "canvas detached");
        Some(self.canvases.remove(index).surface)
    }

    pub fn canvas_ids(&self) -> Vec<CanvasId> {
        self.canvases.iter().map(|c| c.id).collect()
    }

    /// World-to-canvas matrix used by the last viewport computation.
    pub fn canvas_transform(&self, id: CanvasId) -> Option<Mat3> {
        self.canvas(id).map(|c| c.transform)
    }

    /// Pointer moved to `physical` canvas pixels. Returns `false` if the
    /// canvas is unknown or its viewport is degenerate.
    pub fn pointer_moved(&mut self, id: CanvasId, physical: Vec2) -> bool {
        let world_size = self.world_size;
        let Some(canvas) = self.canvas_mut(id) else {
            return false;
        };
        if canvas.is_stale() {
            canvas.refresh(world_size);
        }
        let Some(world) = canvas.unproject(physical) else {
            return false;
        };
        self.input.move_to(world);
        true
    }

    /// Pointer button change over canvas `id`.
    pub fn pointer_button(&mut self, id: CanvasId, button: MouseButton, down: bool) -> bool {
        if self.canvas(id).is_none() {
            return false;
        }
        if down {
            self.input.button_down(button);
        } else {
            self.input.button_up(button);
        }
        true
    }

    fn canvas(&self, id: CanvasId) -> Option<&AttachedCanvas> {
        self.canvases.iter().find(|c| c.id == id)
    }

    fn canvas_mut(&mut self, id: CanvasId) -> Option<&mut AttachedCanvas> {
        self.canvases.iter_mut().find(|c| c.id == id)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("state", &self.state)
            .field("tick_count", &self.tick_count)
            .field("scene", &self.scene)
            .field("events", &self.events)
            .field("canvases", &self.canvases.len())
            .finish()
    }
}

fn assert_valid_world(size: Vec2) {
    assert!(
        size.x > 0.0 && size.y > 0.0 && size.is_finite(),
        "world size must be positive and finite, got {:?}",
        size
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleContext;
    use crate::render::{DrawCommand, RecordingSurface};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every hook it receives.
    struct Probe {
        name: &'static str,
        log: Log,
    }

    impl Probe {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
            }
        }

        fn record(&self, hook: &str) {
            self.log.borrow_mut().push(format!("{}.{hook}", self.name));
        }
    }

    impl Module for Probe {
        fn initialize(&mut self, _: &mut ModuleContext<'_>) {
            self.record("init");
        }
        fn before_update(&mut self, _: &mut ModuleContext<'_>) {
            self.record("before");
        }
        fn update(&mut self, _: &mut ModuleContext<'_>) {
            self.record("update");
        }
        fn after_update(&mut self, _: &mut ModuleContext<'_>) {
            self.record("after");
        }
        fn dispose(&mut self, _: &mut ModuleContext<'_>) {
            self.record("dispose");
        }
    }

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn take(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    // -- 1. configuration -----------------------------------------------------

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config = GameConfig::from_json_str(r#"{ "width": 320, "seed": 9 }"#).unwrap();
        assert_eq!(config.width, 320.0);
        assert_eq!(config.height, 450.0);
        assert_eq!(config.updates_per_second, 60.0);
        assert_eq!(config.seed, 9);
        assert!(GameConfig::from_json_str("[").is_err());
    }

    #[test]
    #[should_panic(expected = "updates_per_second must be positive and finite")]
    fn zero_rate_panics() {
        Game::new(GameConfig {
            updates_per_second: 0.0,
            ..Default::default()
        });
    }

    // -- 2. lifecycle ----------------------------------------------------------

    #[test]
    fn passes_are_global_not_per_object() {
        let log = log();
        let mut game = Game::default();
        for name in ["a", "b"] {
            let probe = Probe::new(name, &log);
            game.spawn_plain(move |o| {
                o.modules.add(Box::new(probe));
            });
        }
        assert_eq!(take(&log), vec!["a.init", "b.init"]);

        game.tick();
        assert_eq!(
            take(&log),
            vec!["a.before", "b.before", "a.update", "b.update", "a.after", "b.after"]
        );
    }

    #[test]
    fn disabled_modules_skip_updates() {
        let log = log();
        let mut game = Game::default();
        let probe = Probe::new("p", &log);
        let id = game.spawn_plain(move |o| {
            o.modules.add(Box::new(probe));
        });
        let module = game.object(id).modules.ids()[0];
        game.object_mut(id).modules.set_enabled(module, false);
        take(&log);

        game.tick();
        assert!(take(&log).is_empty());

        game.destroy(id);
        assert_eq!(take(&log), vec!["p.dispose"]);
    }

    #[test]
    fn late_added_module_initializes_immediately() {
        let log = log();
        let mut game = Game::default();
        let id = game.spawn_plain(|_| {});
        game.add_module(id, Probe::new("late", &log));
        assert_eq!(take(&log), vec!["late.init"]);
    }

    #[test]
    fn remove_module_disposes_synchronously() {
        let log = log();
        let mut game = Game::default();
        let id = game.spawn_plain(|_| {});
        let module = game.add_module(id, Probe::new("m", &log));
        take(&log);

        assert!(game.remove_module(id, module));
        assert_eq!(take(&log), vec!["m.dispose"]);
        assert!(!game.remove_module(id, module));
    }

    #[test]
    fn disposal_is_lifo_and_runs_once() {
        let log = log();
        let mut game = Game::default();
        let (a, b) = (Probe::new("a", &log), Probe::new("b", &log));
        let id = game.spawn_plain(move |o| {
            o.modules.add(Box::new(a));
            o.modules.add(Box::new(b));
        });
        let cleanup_log = log.clone();
        game.with_object(id, |object, _| {
            object.push_resource(Resource::Cleanup(Box::new(move |_| {
                cleanup_log.borrow_mut().push("cleanup".into());
            })));
        });
        take(&log);

        assert!(game.destroy(id));
        assert!(!game.destroy(id));
        assert_eq!(take(&log), vec!["b.dispose", "a.dispose", "cleanup"]);
        assert!(game.scene().get(id).is_none());
    }

    struct SelfDestruct {
        log: Log,
    }

    impl Module for SelfDestruct {
        fn update(&mut self, ctx: &mut ModuleContext<'_>) {
            ctx.destroy_owner();
            self.log.borrow_mut().push(format!("visible={}", ctx.game.scene().contains(ctx.owner_id())));
        }
        fn dispose(&mut self, _: &mut ModuleContext<'_>) {
            self.log.borrow_mut().push("disposed".into());
        }
    }

    #[test]
    fn self_destroy_disposes_after_hook_returns() {
        let log = log();
        let mut game = Game::default();
        let hook_log = log.clone();
        let after = Probe::new("after", &log);
        let id = game.spawn_plain(move |o| {
            o.modules.add(Box::new(SelfDestruct { log: hook_log }));
            o.modules.add(Box::new(after));
        });
        take(&log);

        game.tick();
        // The later module's update is skipped once the owner is doomed.
        assert_eq!(
            take(&log),
            vec!["after.before", "visible=false", "after.dispose", "disposed"]
        );
        assert!(game.scene().get(id).is_none());
        assert!(game.scene().is_empty());
    }

    #[test]
    #[should_panic(expected = "cannot start a stopped game")]
    fn start_after_stop_panics() {
        let mut game = Game::default();
        game.start();
        game.stop();
        game.start();
    }

    #[test]
    fn stop_is_idempotent_and_clears_everything() {
        let log = log();
        let mut game = Game::default();
        let probe = Probe::new("p", &log);
        game.spawn_plain(move |o| {
            o.modules.add(Box::new(probe));
        });
        game.add_canvas(Box::new(RecordingSurface::new(Vec2::new(800.0, 450.0))));
        game.start();
        take(&log);

        game.stop();
        game.stop();
        assert_eq!(take(&log), vec!["p.dispose"]);
        assert_eq!(game.state(), LoopState::Stopped);
        assert!(game.canvas_ids().is_empty());
        assert!(game.stop_handle().is_aborted());

        game.tick();
        assert_eq!(game.tick_count(), 0);
    }

    #[test]
    fn run_exits_on_abort_from_another_thread() {
        let mut game = Game::new(GameConfig {
            updates_per_second: 200.0,
            ..Default::default()
        });
        let handle = game.stop_handle();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            handle.abort();
        });
        game.run();
        stopper.join().unwrap();
        assert_eq!(game.state(), LoopState::Stopped);
    }

    // -- 3. events -------------------------------------------------------------

    #[test]
    fn emits_inside_handlers_are_delivered_after() {
        let log = log();
        let mut game = Game::default();
        let l = log.clone();
        game.on_global_event("gameStart", move |game, _| {
            l.borrow_mut().push("start:begin".into());
            game.emit(GameEvent::LevelStart);
            l.borrow_mut().push("start:end".into());
        });
        let l = log.clone();
        game.on_global_event("levelStart", move |_, _| l.borrow_mut().push("level".into()));

        game.start();
        assert_eq!(take(&log), vec!["start:begin", "start:end", "level"]);
    }

    #[test]
    fn object_subscriptions_end_with_object() {
        let mut game = Game::default();
        let id = game.spawn_plain(|_| {});
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        game.on_game_event(id, "playerDied", move |object, _, _| {
            object.layer += 1;
            *h.borrow_mut() += 1;
        })
        .unwrap();

        game.emit(GameEvent::PlayerDied);
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(game.object(id).layer, 1);

        game.destroy(id);
        assert_eq!(game.events().count_for("playerDied"), 0);
        game.emit(GameEvent::PlayerDied);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn restart_clears_level_objects_only() {
        let mut game = Game::default();
        let keep = game.spawn_plain(|_| {});
        let runtime = game.spawn_plain(|o| {
            o.with_tag(LEVEL_OBJECT_TAG);
        });
        let starts = Rc::new(RefCell::new(0));
        let s = starts.clone();
        game.on_global_event("gameStart", move |_, _| *s.borrow_mut() += 1);

        game.start();
        game.request_restart();
        assert!(game.scene().contains(runtime));
        game.tick();
        assert!(!game.scene().contains(runtime));
        assert!(game.scene().contains(keep));
        assert_eq!(*starts.borrow(), 2);
        assert_eq!(game.state(), LoopState::Running);
    }

    // -- 4. rendering and canvases ---------------------------------------------

    #[test]
    fn render_requests_coalesce() {
        let surface = RecordingSurface::new(Vec2::new(800.0, 450.0));
        let mut game = Game::default();
        game.add_canvas(Box::new(surface.clone()));
        game.queue_render();
        game.queue_render();
        assert!(game.animation_frame());
        assert!(!game.animation_frame());

        let log = surface.take();
        assert_eq!(log.len(), 2);
        assert!(matches!(&log[0], DrawCommand::Clear { color } if color == "#87ceeb"));
        assert!(matches!(&log[1], DrawCommand::SetTransform { .. }));
    }

    #[test]
    fn pointer_is_unprojected_into_world_space() {
        let surface = RecordingSurface::new(Vec2::new(1600.0, 900.0));
        let mut game = Game::default();
        let canvas = game.add_canvas(Box::new(surface.clone()));

        assert!(game.pointer_moved(canvas, Vec2::new(800.0, 450.0)));
        game.tick();
        assert_eq!(game.input().pointer(), Vec2::new(400.0, 225.0));

        surface.set_size(Vec2::new(800.0, 450.0));
        game.request_resize(canvas);
        game.render();
        assert_eq!(game.canvas_transform(canvas), Some(Mat3::IDENTITY));

        assert!(game.remove_canvas(canvas).is_some());
        assert!(!game.pointer_moved(canvas, Vec2::ZERO));
        assert!(!game.pointer_button(canvas, MouseButton::Left, true));
    }

    #[test]
    fn viewport_follows_surface_size_without_resize_request() {
        let surface = RecordingSurface::new(Vec2::new(800.0, 450.0));
        let mut game = Game::default();
        let canvas = game.add_canvas(Box::new(surface.clone()));
        game.render();
        surface.take();

        surface.set_size(Vec2::new(400.0, 225.0));
        game.render();
        let expected = crate::render::viewport_transform(Vec2::new(400.0, 225.0), game.world_size());
        let transforms: Vec<Mat3> = surface
            .take()
            .into_iter()
            .filter_map(|c| match c {
                DrawCommand::SetTransform { matrix } => Some(matrix),
                _ => None,
            })
            .collect();
        assert_eq!(transforms, vec![expected]);
        assert_eq!(expected.a, 0.5);
        assert_eq!(expected.d, 0.5);
        assert_eq!(game.canvas_transform(canvas), Some(expected));

        // Pointer events re-read the size too.
        surface.set_size(Vec2::new(1600.0, 900.0));
        assert!(game.pointer_moved(canvas, Vec2::new(800.0, 450.0)));
        game.tick();
        assert_eq!(game.input().pointer(), Vec2::new(400.0, 225.0));
    }
}
