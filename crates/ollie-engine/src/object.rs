//! Game objects: identity, tags, transform, modules and lifecycle.
//!
//! A [`GameObject`] is owned by the [`Game`]'s scene. Lifecycle hooks run
//! with the object checked out of the scene, so a hook holds `&mut
//! GameObject` and `&mut Game` at the same time without aliasing.
//!
//! # Lifecycle
//!
//! 1. `Game::spawn` inserts the object and runs the initialize cascade: the
//!    object behavior first, then every module in slot order (modules added
//!    during the cascade are picked up by the same cascade).
//! 2. Each tick the object takes part in the three update passes.
//! 3. `Game::destroy` disposes it: modules in reverse order, then the
//!    behavior, then the resource stack in reverse order. Exactly once.

use std::collections::BTreeSet;
use std::fmt;

use ollie_core::fallible::PartialFailure;
use ollie_core::math::Vec2;
use ollie_core::serializer::{Reflect, TypedDto};
use ollie_core::shape::ColliderShape;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::{EventSubscriptionId, GameEvent};
use crate::game::Game;
use crate::module::{Module, ModuleCollection, ModuleContext, ModuleId, RenderPass, UpdatePass};
use crate::modules::transform::Transform2d;
use crate::registry::{LoadContext, MODULE_SERIALIZER, OBJECT_SERIALIZER};
use crate::render::RenderContext;
use crate::EngineError;

/// Tag carried by runtime objects (the player, projectiles) that `restart`
/// clears and level capture skips.
pub const LEVEL_OBJECT_TAG: &str = "level-object";

/// Tag carried by editor tooling objects. Never captured into a level.
pub const EDITOR_TAG: &str = "editor";

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// Unique, non-zero identifier of a game object within one game.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        debug_assert!(raw != 0, "object ids are never zero");
        Self(raw)
    }

    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:016x})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ObjectBehavior
// ---------------------------------------------------------------------------

/// An object's own lifecycle overrides.
///
/// The behavior's concrete type is the object's type key in level files
/// ("Wall", "Goal", ...). Hooks run before the object's modules in every
/// pass.
#[allow(unused_variables)]
pub trait ObjectBehavior: Reflect {
    fn initialize(&mut self, object: &mut GameObject, game: &mut Game) {}

    fn before_update(&mut self, object: &mut GameObject, game: &mut Game) {}
    fn update(&mut self, object: &mut GameObject, game: &mut Game) {}
    fn after_update(&mut self, object: &mut GameObject, game: &mut Game) {}

    fn before_render(&self, ctx: &mut RenderContext<'_>) {}
    fn render(&self, ctx: &mut RenderContext<'_>) {}
    fn after_render(&self, ctx: &mut RenderContext<'_>) {}

    fn before_render_gizmos(&self, ctx: &mut RenderContext<'_>) {}
    fn render_gizmos(&self, ctx: &mut RenderContext<'_>) {}
    fn after_render_gizmos(&self, ctx: &mut RenderContext<'_>) {}

    fn dispose(&mut self, object: &mut GameObject, game: &mut Game) {}
}

impl dyn ObjectBehavior {
    pub fn downcast_ref<T: ObjectBehavior>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: ObjectBehavior>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    fn run_update(&mut self, pass: UpdatePass, object: &mut GameObject, game: &mut Game) {
        match pass {
            UpdatePass::BeforeUpdate => self.before_update(object, game),
            UpdatePass::Update => self.update(object, game),
            UpdatePass::AfterUpdate => self.after_update(object, game),
        }
    }

    fn run_render(&self, pass: RenderPass, ctx: &mut RenderContext<'_>) {
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

/// Behavior of an object with no overrides of its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainObject;

impl ObjectBehavior for PlainObject {}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Something released when the owning object is disposed.
pub(crate) enum Resource {
    Subscription(EventSubscriptionId),
    Cleanup(Box<dyn FnOnce(&mut Game)>),
}

// ---------------------------------------------------------------------------
// GameObject
// ---------------------------------------------------------------------------

/// An entity in the scene.
pub struct GameObject {
    id: ObjectId,
    pub name: String,
    /// Render ordering key; lower layers draw first.
    pub layer: i32,
    pub tags: BTreeSet<String>,
    pub transform: Transform2d,
    pub modules: ModuleCollection,
    /// `None` only while one of the behavior's own hooks runs.
    behavior: Option<Box<dyn ObjectBehavior>>,
    resources: Vec<Resource>,
    behavior_initialized: bool,
    initialized: bool,
    disposed: bool,
}

impl GameObject {
    pub(crate) fn new(id: ObjectId, behavior: Box<dyn ObjectBehavior>) -> Self {
        let name = OBJECT_SERIALIZER
            .key_for_instance(behavior.as_ref())
            .unwrap_or("GameObject")
            .to_owned();
        Self {
            id,
            name,
            layer: 0,
            tags: BTreeSet::new(),
            transform: Transform2d::default(),
            modules: ModuleCollection::new(),
            behavior: Some(behavior),
            resources: Vec::new(),
            behavior_initialized: false,
            initialized: false,
            disposed: false,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Whether the initialize cascade has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Builder-style tag insertion for spawn closures.
    pub fn with_tag(&mut self, tag: &str) -> &mut Self {
        self.tags.insert(tag.to_owned());
        self
    }

    pub fn position(&self) -> Vec2 {
        self.transform.position()
    }

    pub fn behavior(&self) -> Option<&(dyn ObjectBehavior + 'static)> {
        self.behavior.as_deref()
    }

    pub fn behavior_as<T: ObjectBehavior>(&self) -> Option<&T> {
        self.behavior.as_deref()?.downcast_ref::<T>()
    }

    pub fn behavior_as_mut<T: ObjectBehavior>(&mut self) -> Option<&mut T> {
        self.behavior.as_deref_mut()?.downcast_mut::<T>()
    }

    /// Type key of the object's behavior, if registered.
    pub fn type_key(&self) -> Option<&'static str> {
        let behavior = self.behavior.as_deref()?;
        OBJECT_SERIALIZER.key_for_instance(behavior)
    }

    // -- collision -----------------------------------------------------------

    /// World-space shapes of all enabled collider modules.
    pub fn world_shapes(&self) -> impl Iterator<Item = ColliderShape> + '_ {
        self.modules
            .colliders()
            .map(move |c| c.world_shape(&self.transform))
    }

    /// Whether any enabled collider collides with `shape`.
    ///
    /// # Panics
    ///
    /// Panics if a collider's shape has no intersection test with `shape`.
    pub fn collides_with(&self, shape: &ColliderShape) -> bool {
        self.world_shapes().any(|own| own.check_collision(shape))
    }

    /// Like [`collides_with`](Self::collides_with), returning an error for
    /// unsupported shape pairs instead of panicking.
    pub fn try_collides_with(&self, shape: &ColliderShape) -> Result<bool, EngineError> {
        for own in self.world_shapes() {
            if own.try_check_collision(shape)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Like [`collides_with`](Self::collides_with), treating unsupported
    /// shape pairs as misses.
    pub fn overlaps(&self, shape: &ColliderShape) -> bool {
        self.world_shapes()
            .any(|own| own.try_check_collision(shape).unwrap_or(false))
    }

    /// Predicate for scene queries: objects colliding with `shape`.
    pub fn colliding_with(shape: &ColliderShape) -> impl Fn(&GameObject) -> bool + '_ {
        move |object| object.collides_with(shape)
    }

    /// Whether any collider of `self` collides with any collider of `other`.
    pub fn touches(&self, other: &GameObject) -> bool {
        other.world_shapes().any(|shape| self.overlaps(&shape))
    }

    // -- lifecycle -----------------------------------------------------------

    pub(crate) fn push_resource(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    /// Subscribe this object to a game event from inside one of its own
    /// hooks. The subscription is released when the object is disposed.
    pub fn on_game_event(
        &mut self,
        game: &mut Game,
        event: &str,
        handler: impl FnMut(&mut GameObject, &mut Game, &GameEvent) + 'static,
    ) -> EventSubscriptionId {
        let id = game
            .events_mut()
            .subscribe_object(event, self.id, Box::new(handler));
        self.push_resource(Resource::Subscription(id));
        id
    }

    /// Add a module and, if the object is already initialized, initialize it
    /// right away.
    pub(crate) fn attach_module(&mut self, module: Box<dyn Module>, game: &mut Game) -> ModuleId {
        let id = self.modules.add(module);
        if self.initialized {
            self.initialize_module(id, game);
        }
        id
    }

    /// Remove and dispose a module. Returns `false` if there is no such slot.
    pub(crate) fn detach_module(&mut self, id: ModuleId, game: &mut Game) -> bool {
        if !self.modules.contains(id) {
            return false;
        }
        match self.modules.take(id) {
            Some(mut module) => {
                {
                    let mut ctx = ModuleContext::new(self, game, id);
                    module.dispose(&mut ctx);
                }
                self.modules.remove(id);
            }
            // Checked out: disposed when its hook returns.
            None => {
                self.modules.remove(id);
            }
        }
        true
    }

    /// Behavior first, then every not-yet-initialized module in slot order.
    pub(crate) fn run_initialize(&mut self, game: &mut Game) {
        if !self.behavior_initialized {
            self.behavior_initialized = true;
            if let Some(mut behavior) = self.behavior.take() {
                behavior.initialize(self, game);
                self.behavior = Some(behavior);
            }
        }
        while let Some(id) = self.modules.next_uninitialized() {
            if game.scene().is_doomed(self.id) {
                break;
            }
            self.initialize_module(id, game);
        }
        self.initialized = true;
    }

    fn initialize_module(&mut self, id: ModuleId, game: &mut Game) {
        self.modules.mark_initialized(id);
        let Some(mut module) = self.modules.take(id) else {
            return;
        };
        {
            let mut ctx = ModuleContext::new(self, game, id);
            module.initialize(&mut ctx);
        }
        self.return_module(id, module, game);
    }

    /// Put a checked-out module back, disposing it if its slot was removed
    /// while it ran.
    fn return_module(&mut self, id: ModuleId, module: Box<dyn Module>, game: &mut Game) {
        if let Err(mut orphan) = self.modules.restore(id, module) {
            tracing::trace!(object = %self.id, ?id, "module removed during its own hook");
            let mut ctx = ModuleContext::new(self, game, id);
            orphan.dispose(&mut ctx);
        }
    }

    pub(crate) fn run_update(&mut self, pass: UpdatePass, game: &mut Game) {
        self.run_initialize(game);

        if let Some(mut behavior) = self.behavior.take() {
            behavior.run_update(pass, self, game);
            self.behavior = Some(behavior);
        }

        for id in self.modules.ids() {
            if game.scene().is_doomed(self.id) {
                break;
            }
            if !self.modules.is_enabled(id) {
                continue;
            }
            let Some(mut module) = self.modules.take(id) else {
                continue;
            };
            {
                let mut ctx = ModuleContext::new(self, game, id);
                module.run_update(pass, &mut ctx);
            }
            self.return_module(id, module, game);
        }
    }

    pub(crate) fn run_render(&self, pass: RenderPass, ctx: &mut RenderContext<'_>) {
        if let Some(behavior) = self.behavior.as_deref() {
            behavior.run_render(pass, ctx);
        }
        for (_, enabled, module) in self.modules.iter() {
            if enabled {
                module.run_render(pass, ctx);
            }
        }
    }

    /// Dispose modules (reverse order), the behavior, then resources
    /// (reverse order). Runs at most once.
    pub(crate) fn dispose(&mut self, game: &mut Game) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        tracing::trace!(object = %self.id, name = %self.name, "disposing object");

        for id in self.modules.ids().into_iter().rev() {
            if let Some(mut module) = self.modules.take(id) {
                let mut ctx = ModuleContext::new(self, game, id);
                module.dispose(&mut ctx);
            }
            self.modules.remove(id);
        }

        if let Some(mut behavior) = self.behavior.take() {
            behavior.dispose(self, game);
            self.behavior = Some(behavior);
        }

        while let Some(resource) = self.resources.pop() {
            match resource {
                Resource::Subscription(id) => {
                    game.events_mut().unsubscribe(id);
                }
                Resource::Cleanup(cleanup) => cleanup(game),
            }
        }
    }

    // -- serialization -------------------------------------------------------

    /// Snapshot of this object. Modules whose type is not registered are
    /// skipped.
    pub fn serialize(&self) -> GameObjectDto {
        let modules = self
            .modules
            .iter()
            .filter_map(|(_, _, module)| match MODULE_SERIALIZER.try_serialize(module) {
                Ok(dto) => Some(dto.to_value()),
                Err(e) => {
                    tracing::trace!(object = %self.id, error = %e, "skipping module");
                    None
                }
            })
            .collect();

        let behavior = self
            .behavior
            .as_deref()
            .and_then(|b| OBJECT_SERIALIZER.try_serialize(b).ok())
            .map(|dto| dto.data)
            .unwrap_or(Value::Null);

        GameObjectDto {
            version: GameObjectDto::VERSION,
            name: self.name.clone(),
            layer: self.layer,
            tags: self.tags.clone(),
            transform: self.transform.position(),
            modules,
            behavior,
        }
    }

    /// Snapshot keyed by the object's type, as stored in level files.
    /// `None` if the behavior type is not registered.
    pub fn serialize_typed(&self) -> Option<TypedDto> {
        let key = self.type_key()?;
        let data = serde_json::to_value(self.serialize()).ok()?;
        Some(TypedDto::new(key, data))
    }

    /// Rebuild an object from a [`GameObjectDto`] payload and spawn it.
    ///
    /// Schema problems fail the whole object. A module that fails to load is
    /// skipped and reported as `module[i]: <message>`; the object is still
    /// spawned and its id is returned inside the partial failure.
    pub fn deserialize_partial(
        data: &Value,
        game: &mut Game,
        behavior: Box<dyn ObjectBehavior>,
    ) -> Result<ObjectId, PartialFailure<ObjectId>> {
        let dto: GameObjectDto = serde_json::from_value(data.clone())
            .map_err(|e| PartialFailure::failed(format!("invalid object: {e}")))?;
        if dto.version != GameObjectDto::VERSION {
            return Err(PartialFailure::failed(format!(
                "unsupported object version {} (expected {})",
                dto.version,
                GameObjectDto::VERSION
            )));
        }
        if !dto.transform.is_finite() {
            return Err(PartialFailure::failed("object transform is not finite"));
        }

        let mut ctx = LoadContext::new(game.world_size());
        let mut object = GameObject::new(game.next_object_id(), behavior);
        object.name = dto.name;
        object.layer = dto.layer;
        object.tags = dto.tags;
        object.transform.set_position(dto.transform);

        let mut errors = Vec::new();
        for (i, entry) in dto.modules.iter().enumerate() {
            match MODULE_SERIALIZER.deserialize(entry, &mut ctx) {
                Ok(module) => match module.downcast_ref::<Transform2d>() {
                    Some(transform) => {
                        object.transform.set_position(transform.position());
                    }
                    None => {
                        object.modules.add(module);
                    }
                },
                Err(e) => {
                    tracing::warn!(object = %object.name, index = i, error = %e, "module failed to load");
                    errors.push(format!("module[{i}]: {e}"));
                }
            }
        }

        let id = game.spawn_object(object);
        if errors.is_empty() {
            Ok(id)
        } else {
            Err(PartialFailure::partial(id, errors))
        }
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("layer", &self.layer)
            .field("tags", &self.tags)
            .field("position", &self.transform.position())
            .field("modules", &self.modules)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// GameObjectDto
// ---------------------------------------------------------------------------

/// Serialized form of a game object. Every field except `behavior` is
/// required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObjectDto {
    pub version: u32,
    pub name: String,
    pub layer: i32,
    pub tags: BTreeSet<String>,
    /// Position as `[x, y]`.
    pub transform: Vec2,
    /// Module envelopes (`{"$type", "data"}`), validated one by one.
    pub modules: Vec<Value>,
    /// Data of the object's own behavior, if it has any.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub behavior: Value,
}

impl GameObjectDto {
    pub const VERSION: u32 = 1;

    pub fn new(name: impl Into<String>, transform: Vec2) -> Self {
        Self {
            version: Self::VERSION,
            name: name.into(),
            layer: 0,
            tags: BTreeSet::new(),
            transform,
            modules: Vec::new(),
            behavior: Value::Null,
        }
    }

    pub fn with_tags<'a>(mut self, tags: impl IntoIterator<Item = &'a str>) -> Self {
        self.tags.extend(tags.into_iter().map(str::to_owned));
        self
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_module(mut self, module: TypedDto) -> Self {
        self.modules.push(module.to_value());
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;
    use crate::modules::collider::{CircleCollider2d, RectangleCollider2d};
    use ollie_core::math::Rect2;
    use serde_json::json;

    fn game() -> Game {
        Game::new(GameConfig::default())
    }

    // -- 1. ids -------------------------------------------------------------

    #[test]
    fn ids_are_unique_and_nonzero() {
        let mut game = game();
        let mut seen = BTreeSet::new();
        for _ in 0..200 {
            let id = game.spawn_plain(|_| {});
            assert_ne!(id.to_raw(), 0);
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn ids_are_deterministic_per_seed() {
        let mut a = game();
        let mut b = game();
        let ids_a: Vec<_> = (0..5).map(|_| a.spawn_plain(|_| {})).collect();
        let ids_b: Vec<_> = (0..5).map(|_| b.spawn_plain(|_| {})).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(ids_a[0].to_string().len(), 16);
    }

    // -- 2. colliders -------------------------------------------------------

    #[test]
    fn colliding_with_uses_world_shapes() {
        let mut game = game();
        let id = game.spawn_plain(|o| {
            o.transform.set_position(Vec2::new(100.0, 100.0));
            o.modules.add(Box::new(CircleCollider2d::new(Vec2::ZERO, 10.0)));
        });
        let near = ColliderShape::point(Vec2::new(105.0, 100.0));
        let far = ColliderShape::point(Vec2::new(5.0, 0.0));
        let object = game.object(id);
        assert!(GameObject::colliding_with(&near)(object));
        assert!(!GameObject::colliding_with(&far)(object));
    }

    #[test]
    fn disabled_colliders_are_ignored() {
        let mut game = game();
        let id = game.spawn_plain(|o| {
            o.modules
                .add(Box::new(RectangleCollider2d::new(Vec2::ZERO, Vec2::new(10.0, 10.0))));
        });
        let probe = ColliderShape::rectangle(Rect2::new(2.0, 2.0, 1.0, 1.0));
        assert!(game.object(id).collides_with(&probe));

        let module = game.object(id).modules.ids()[0];
        game.object_mut(id).modules.set_enabled(module, false);
        assert!(!game.object(id).collides_with(&probe));
    }

    // -- 3. serialization ---------------------------------------------------

    #[test]
    fn serialize_then_deserialize_restores_object() {
        let mut game = game();
        let id = game.spawn_plain(|o| {
            o.name = "Box".into();
            o.layer = 3;
            o.with_tag("crate");
            o.transform.set_position(Vec2::new(4.0, 5.0));
            o.modules.add(Box::new(CircleCollider2d::new(Vec2::new(1.0, 0.0), 6.0)));
        });
        let dto = game.object(id).serialize();
        assert_eq!(dto.version, 1);
        assert_eq!(dto.modules.len(), 1);

        let data = serde_json::to_value(&dto).unwrap();
        let copy = GameObject::deserialize_partial(&data, &mut game, Box::new(PlainObject)).unwrap();
        let restored = game.object(copy);
        assert_eq!(restored.name, "Box");
        assert_eq!(restored.layer, 3);
        assert!(restored.has_tag("crate"));
        assert_eq!(restored.position(), Vec2::new(4.0, 5.0));
        let collider = restored.modules.get::<CircleCollider2d>().unwrap();
        assert_eq!(collider.radius, 6.0);
    }

    #[test]
    fn bad_module_is_reported_and_object_still_spawned() {
        let mut game = game();
        let data = json!({
            "version": 1,
            "name": "Mixed",
            "layer": 0,
            "tags": [],
            "transform": [0.0, 0.0],
            "modules": [
                { "$type": "CircleCollider2d", "data": { "offset": [0.0, 0.0], "radius": 3.0 } },
                { "$type": "NoSuchModule", "data": {} }
            ]
        });
        let err = GameObject::deserialize_partial(&data, &mut game, Box::new(PlainObject)).unwrap_err();
        assert!(err.is_partial());
        assert_eq!(err.errors.len(), 1);
        assert!(err.errors[0].starts_with("module[1]: "), "{}", err.errors[0]);

        let id = err.result.unwrap();
        assert_eq!(game.object(id).modules.len(), 1);
    }

    #[test]
    fn schema_errors_fail_whole_object() {
        let mut game = game();
        let err = GameObject::deserialize_partial(&json!({ "name": 4 }), &mut game, Box::new(PlainObject))
            .unwrap_err();
        assert!(err.result.is_none());
        assert_eq!(game.scene().len(), 0);

        let err = GameObject::deserialize_partial(
            &json!({
                "version": 2, "name": "Future", "layer": 0, "tags": [],
                "transform": [0.0, 0.0], "modules": []
            }),
            &mut game,
            Box::new(PlainObject),
        )
        .unwrap_err();
        assert!(err.errors[0].contains("version 2"));
    }

    #[test]
    fn transform_entry_applies_to_object_transform() {
        let mut game = game();
        let data = json!({
            "version": 1,
            "name": "Moved",
            "layer": 0,
            "tags": [],
            "transform": [0.0, 0.0],
            "modules": [{ "$type": "Transform2d", "data": { "position": [7.0, 8.0] } }]
        });
        let id = GameObject::deserialize_partial(&data, &mut game, Box::new(PlainObject)).unwrap();
        let object = game.object(id);
        assert_eq!(object.position(), Vec2::new(7.0, 8.0));
        assert!(object.modules.is_empty());
    }
}
