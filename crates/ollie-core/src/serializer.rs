//! Type-keyed serialization registry.
//!
//! A [`Serializer<T, C>`] maps string type keys to a pair of functions that
//! turn a concrete implementor of `T` (usually a trait object such as
//! `dyn Module`) into a [`TypedDto`] and back. Deserialization receives a
//! caller-supplied context `C` so that constructors can reach the world they
//! are being loaded into.
//!
//! Registrations are one-to-one and append-only: a key maps to exactly one
//! Rust type and a type to exactly one key. Registering either twice is a
//! programming error and panics.
//!
//! ```
//! use ollie_core::serializer::{Serializer, TypedDto};
//! use serde_json::json;
//!
//! #[derive(Debug, PartialEq)]
//! struct Coin { value: u32 }
//!
//! let mut s: Serializer<dyn std::any::Any, ()> = Serializer::new("items");
//! s.register_type::<Coin>(
//!     "Coin",
//!     |c| json!({ "value": c.value }),
//!     |data, _| {
//!         let value = data["value"].as_u64().ok_or("missing value")? as u32;
//!         Ok(Box::new(Coin { value }))
//!     },
//! );
//!
//! let dto = s.serialize(&Coin { value: 3 } as &dyn std::any::Any);
//! assert_eq!(dto.type_key, "Coin");
//! let back = s.deserialize(&serde_json::to_value(&dto).unwrap(), &mut ()).unwrap();
//! assert_eq!(back.downcast_ref::<Coin>(), Some(&Coin { value: 3 }));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;

// ---------------------------------------------------------------------------
// Reflect
// ---------------------------------------------------------------------------

/// Runtime type access for trait objects.
///
/// Implemented for every sized `'static` type. Traits that should be
/// serializable through a [`Serializer`] declare `Reflect` as a supertrait so
/// that `&dyn Trait` can report its concrete type.
///
/// Call these methods on `&dyn Trait`, not on `Box<dyn Trait>`: the box
/// itself is also `'static` and would answer for itself.
pub trait Reflect: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Concrete type name, for diagnostics only.
    fn type_name(&self) -> &'static str;
}

impl<T: Any> Reflect for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// `dyn Any` is its own reflection.
impl Reflect for dyn Any {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "dyn Any"
    }
}

// ---------------------------------------------------------------------------
// TypedDto
// ---------------------------------------------------------------------------

/// The `{ "$type": key, "data": ... }` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedDto {
    #[serde(rename = "$type")]
    pub type_key: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl TypedDto {
    pub fn new(type_key: impl Into<String>, data: Value) -> Self {
        Self {
            type_key: type_key.into(),
            data,
        }
    }

    /// Parse an envelope from raw JSON.
    ///
    /// Besides the canonical `{ "$type", "data" }` form this also accepts the
    /// flattened `{ "$type", ...fields }` form, in which every field other
    /// than `$type` becomes the payload.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let Value::Object(obj) = value else {
            return Err(format!("expected an object with \"$type\", got {}", kind_of(value)));
        };
        let type_key = match obj.get("$type") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(format!("\"$type\" must be a string, got {}", kind_of(other)))
            }
            None => return Err("missing \"$type\"".to_owned()),
        };
        let data = if let Some(data) = obj.get("data") {
            data.clone()
        } else {
            let rest: Map<String, Value> = obj
                .iter()
                .filter(|(k, _)| k.as_str() != "$type")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if rest.is_empty() {
                Value::Null
            } else {
                Value::Object(rest)
            }
        };
        Ok(Self { type_key, data })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("$type".to_owned(), Value::String(self.type_key.clone()));
        if !self.data.is_null() {
            obj.insert("data".to_owned(), self.data.clone());
        }
        Value::Object(obj)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Serializer
// ---------------------------------------------------------------------------

/// Builds the payload for one registered type.
pub type SerializeFn<T> = Box<dyn Fn(&T) -> Option<Value> + Send + Sync>;

/// Rebuilds a registered type from its payload.
pub type DeserializeFn<T, C> = fn(&Value, &mut C) -> Result<Box<T>, String>;

struct Entry<T: ?Sized, C> {
    type_name: &'static str,
    serialize: SerializeFn<T>,
    deserialize: DeserializeFn<T, C>,
}

/// A registry of serializable implementors of `T`, deserialized with
/// context `C`.
pub struct Serializer<T: ?Sized, C> {
    name: String,
    by_key: HashMap<String, Entry<T, C>>,
    by_type: HashMap<TypeId, String>,
    _marker: PhantomData<fn(&T, &mut C)>,
}

impl<T: ?Sized + Reflect, C> Serializer<T, C> {
    /// Create an empty registry. `name` appears in error messages.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            by_key: HashMap::new(),
            by_type: HashMap::new(),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register concrete type `S` under `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already taken or `S` is already registered.
    pub fn register_type<S: Any>(
        &mut self,
        key: &str,
        serialize: fn(&S) -> Value,
        deserialize: DeserializeFn<T, C>,
    ) {
        if self.by_key.contains_key(key) {
            panic!(
                "{} serializer: type key '{}' is already registered",
                self.name, key
            );
        }
        let type_id = TypeId::of::<S>();
        if let Some(existing) = self.by_type.get(&type_id) {
            panic!(
                "{} serializer: type {} is already registered as '{}'",
                self.name,
                std::any::type_name::<S>(),
                existing
            );
        }

        self.by_type.insert(type_id, key.to_owned());
        self.by_key.insert(
            key.to_owned(),
            Entry {
                type_name: std::any::type_name::<S>(),
                serialize: Box::new(move |value: &T| {
                    value.as_any().downcast_ref::<S>().map(serialize)
                }),
                deserialize,
            },
        );
        tracing::trace!(serializer = %self.name, type_key = %key, "registered type");
    }

    /// Key registered for `S`.
    ///
    /// # Panics
    ///
    /// Panics if `S` was never registered.
    #[track_caller]
    pub fn key_for<S: Any>(&self) -> &str {
        match self.try_key_for::<S>() {
            Some(key) => key,
            None => panic!(
                "{} serializer: type {} is not registered",
                self.name,
                std::any::type_name::<S>()
            ),
        }
    }

    pub fn try_key_for<S: Any>(&self) -> Option<&str> {
        self.by_type.get(&TypeId::of::<S>()).map(String::as_str)
    }

    /// Key registered for the concrete type behind `value`.
    pub fn key_for_instance(&self, value: &T) -> Option<&str> {
        self.by_type
            .get(&value.as_any().type_id())
            .map(String::as_str)
    }

    /// Serialize `value` into its envelope.
    ///
    /// # Panics
    ///
    /// Panics if the concrete type of `value` is not registered.
    #[track_caller]
    pub fn serialize(&self, value: &T) -> TypedDto {
        match self.try_serialize(value) {
            Ok(dto) => dto,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_serialize(&self, value: &T) -> Result<TypedDto, CoreError> {
        let unregistered = || CoreError::UnregisteredType {
            serializer: self.name.clone(),
            type_name: value.type_name(),
        };
        let key = self.key_for_instance(value).ok_or_else(unregistered)?;
        let entry = self.by_key.get(key).ok_or_else(unregistered)?;
        let data = (entry.serialize)(value).ok_or_else(unregistered)?;
        Ok(TypedDto::new(key, data))
    }

    /// Rebuild a value from raw JSON.
    ///
    /// Envelope problems, unknown keys and the type's own validation failures
    /// are all reported as `Err`; this never panics on bad data.
    pub fn deserialize(&self, value: &Value, ctx: &mut C) -> Result<Box<T>, String> {
        let dto = TypedDto::from_value(value)
            .map_err(|e| format!("invalid {} entry: {e}", self.name))?;
        self.deserialize_dto(&dto, ctx)
    }

    /// Rebuild a value from an already-parsed envelope.
    pub fn deserialize_dto(&self, dto: &TypedDto, ctx: &mut C) -> Result<Box<T>, String> {
        let entry = self.by_key.get(&dto.type_key).ok_or_else(|| {
            format!("unknown {} type '{}'", self.name, dto.type_key)
        })?;
        (entry.deserialize)(&dto.data, ctx).map_err(|e| format!("{}: {e}", dto.type_key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.by_key.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl<T: ?Sized, C> fmt::Debug for Serializer<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<(&str, &str)> = self
            .by_key
            .iter()
            .map(|(k, e)| (k.as_str(), e.type_name))
            .collect();
        entries.sort_unstable();
        f.debug_struct("Serializer")
            .field("name", &self.name)
            .field("types", &entries)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
