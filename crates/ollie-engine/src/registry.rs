//! Process-wide serializer registries for modules and object types.
//!
//! Registration happens once, on first access. Both registries are
//! append-only and map each type key to exactly one Rust type.

use std::sync::LazyLock;

use ollie_core::math::Vec2;
use ollie_core::serializer::Serializer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::module::Module;
use crate::modules::animation::Animation;
use crate::modules::behavior::WalkBackAndForthBehavior;
use crate::modules::bird::BirdController;
use crate::modules::collider::{CircleCollider2d, RayCollider2d, RectangleCollider2d};
use crate::modules::shape_renderer::ShapeRenderer;
use crate::modules::size::Size2d;
use crate::modules::spawner::PlayerSpawner;
use crate::modules::transform::Transform2d;
use crate::modules::trigger::GoalTrigger;
use crate::object::{ObjectBehavior, PlainObject};
use crate::prefabs::{Gate, Goal, Spawn, Wall};

// ---------------------------------------------------------------------------
// LoadContext
// ---------------------------------------------------------------------------

/// Context handed to module deserializers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadContext {
    /// Size of the world the module is loaded into.
    pub world_size: Vec2,
}

impl LoadContext {
    pub fn new(world_size: Vec2) -> Self {
        Self { world_size }
    }
}

// ---------------------------------------------------------------------------
// Serializable traits
// ---------------------------------------------------------------------------

/// A module with a stable type key and a JSON payload.
pub trait SerializableModule: Module + Sized {
    const TYPE_KEY: &'static str;

    fn to_data(&self) -> Value;

    /// Validate and rebuild from a payload. Never panics on bad data.
    fn from_data(data: &Value, ctx: &mut LoadContext) -> Result<Self, String>;
}

/// An object behavior with a stable type key.
pub trait SerializableBehavior: ObjectBehavior + Sized {
    const TYPE_KEY: &'static str;

    fn to_data(&self) -> Value {
        Value::Null
    }

    fn from_data(data: &Value) -> Result<Self, String>;
}

// ---------------------------------------------------------------------------
// Registries
// ---------------------------------------------------------------------------

/// Every serializable module type.
pub static MODULE_SERIALIZER: LazyLock<Serializer<dyn Module, LoadContext>> = LazyLock::new(|| {
    let mut s = Serializer::new("module");
    register_module::<Transform2d>(&mut s);
    register_module::<Size2d>(&mut s);
    register_module::<CircleCollider2d>(&mut s);
    register_module::<RectangleCollider2d>(&mut s);
    register_module::<RayCollider2d>(&mut s);
    register_module::<Animation>(&mut s);
    register_module::<PlayerSpawner>(&mut s);
    register_module::<WalkBackAndForthBehavior>(&mut s);
    register_module::<GoalTrigger>(&mut s);
    register_module::<ShapeRenderer>(&mut s);
    register_module::<BirdController>(&mut s);
    tracing::debug!(types = s.len(), "module serializer ready");
    s
});

/// Every top-level object type that may appear in a level file.
pub static OBJECT_SERIALIZER: LazyLock<Serializer<dyn ObjectBehavior, ()>> = LazyLock::new(|| {
    let mut s = Serializer::new("object");
    register_behavior::<PlainObject>(&mut s);
    register_behavior::<Wall>(&mut s);
    register_behavior::<Goal>(&mut s);
    register_behavior::<Gate>(&mut s);
    register_behavior::<Spawn>(&mut s);
    tracing::debug!(types = s.len(), "object serializer ready");
    s
});

fn register_module<M: SerializableModule>(s: &mut Serializer<dyn Module, LoadContext>) {
    s.register_type::<M>(M::TYPE_KEY, M::to_data, deserialize_module::<M>);
}

fn deserialize_module<M: SerializableModule>(
    data: &Value,
    ctx: &mut LoadContext,
) -> Result<Box<dyn Module>, String> {
    Ok(Box::new(M::from_data(data, ctx)?))
}

fn register_behavior<B: SerializableBehavior>(s: &mut Serializer<dyn ObjectBehavior, ()>) {
    s.register_type::<B>(B::TYPE_KEY, B::to_data, deserialize_behavior::<B>);
}

fn deserialize_behavior<B: SerializableBehavior>(
    data: &Value,
    _: &mut (),
) -> Result<Box<dyn ObjectBehavior>, String> {
    Ok(Box::new(B::from_data(data)?))
}

impl SerializableBehavior for PlainObject {
    const TYPE_KEY: &'static str = "GameObject";

    fn from_data(_: &Value) -> Result<Self, String> {
        Ok(PlainObject)
    }
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// Serialize a payload struct. Failures are logged and yield `null`.
pub(crate) fn to_data<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, type_name = std::any::type_name::<T>(), "payload serialization failed");
        Value::Null
    })
}

/// Parse a payload struct; a missing payload reads as `{}`.
pub(crate) fn parse_data<T: DeserializeOwned>(data: &Value) -> Result<T, String> {
    let data = match data {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(data).map_err(|e| e.to_string())
}

/// Reject non-finite or negative numbers in validated fields.
pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(format!("{field} must be a non-negative finite number, got {value}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ollie_core::serializer::TypedDto;
    use serde_json::json;

    #[test]
    fn every_module_type_is_registered() {
        assert_eq!(
            MODULE_SERIALIZER.keys(),
            vec![
                "Animation",
                "BirdController",
                "CircleCollider2d",
                "GoalTrigger",
                "PlayerSpawner",
                "RayCollider2d",
                "RectangleCollider2d",
                "ShapeRenderer",
                "Size2d",
                "Transform2d",
                "WalkBackAndForthBehavior",
            ]
        );
        assert_eq!(
            OBJECT_SERIALIZER.keys(),
            vec!["GameObject", "Gate", "Goal", "Spawn", "Wall"]
        );
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut s: Serializer<dyn Module, LoadContext> = Serializer::new("module");
        register_module::<Size2d>(&mut s);
        register_module::<Size2d>(&mut s);
    }

    #[test]
    fn unknown_key_is_an_error_not_a_panic() {
        let mut ctx = LoadContext::new(Vec2::new(800.0, 450.0));
        let err = MODULE_SERIALIZER
            .deserialize_dto(&TypedDto::new("Teleporter", json!({})), &mut ctx)
            .err()
            .unwrap();
        assert!(err.contains("Teleporter"));
    }

    #[test]
    fn null_payload_reads_as_empty_object() {
        #[derive(serde::Deserialize)]
        struct Opt {
            #[serde(default)]
            n: u32,
        }
        let parsed: Opt = parse_data(&Value::Null).unwrap();
        assert_eq!(parsed.n, 0);
        assert!(require_non_negative("radius", -1.0).is_err());
        assert!(require_non_negative("radius", f64::NAN).is_err());
    }
}
