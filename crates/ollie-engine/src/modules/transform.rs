//! Object position.

use ollie_core::math::Vec2;
use ollie_core::observable::{Observable, SubscriptionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::module::Module;
use crate::registry::{parse_data, to_data, LoadContext, SerializableModule};

/// World-space position of an object. Every object carries exactly one, in
/// [`GameObject::transform`](crate::object::GameObject::transform).
///
/// Position changes are observable.
#[derive(Debug, Clone, Default)]
pub struct Transform2d {
    position: Observable<Vec2>,
}

#[derive(Serialize, Deserialize)]
struct TransformData {
    #[serde(default)]
    position: Vec2,
}

impl Transform2d {
    pub fn new(position: Vec2) -> Self {
        Self {
            position: Observable::new(position),
        }
    }

    pub fn position(&self) -> Vec2 {
        *self.position.get()
    }

    /// Returns whether the position changed.
    pub fn set_position(&mut self, position: Vec2) -> bool {
        self.position.set(position)
    }

    pub fn translate(&mut self, offset: Vec2) -> bool {
        self.position.update(|p| *p + offset)
    }

    /// Call `listener(old, new)` on every position change.
    pub fn subscribe(&mut self, listener: impl FnMut(&Vec2, &Vec2) + 'static) -> SubscriptionId {
        self.position.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.position.unsubscribe(id)
    }
}

impl Module for Transform2d {}

impl SerializableModule for Transform2d {
    const TYPE_KEY: &'static str = "Transform2d";

    fn to_data(&self) -> Value {
        to_data(&TransformData {
            position: self.position(),
        })
    }

    fn from_data(data: &Value, _: &mut LoadContext) -> Result<Self, String> {
        let data: TransformData = parse_data(data)?;
        if !data.position.is_finite() {
            return Err("position must be finite".into());
        }
        Ok(Self::new(data.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn translate_notifies_subscribers() {
        let mut t = Transform2d::new(Vec2::new(1.0, 1.0));
        let moves = Rc::new(Cell::new(0));
        let m = moves.clone();
        t.subscribe(move |_, _| m.set(m.get() + 1));
        assert!(t.translate(Vec2::new(2.0, 0.0)));
        assert!(!t.translate(Vec2::ZERO));
        assert_eq!(t.position(), Vec2::new(3.0, 1.0));
        assert_eq!(moves.get(), 1);
    }

    #[test]
    fn rejects_non_finite_position() {
        let mut ctx = LoadContext::new(Vec2::new(10.0, 10.0));
        let data = serde_json::json!({ "position": [1.0, 2.0] });
        assert_eq!(Transform2d::from_data(&data, &mut ctx).unwrap().position(), Vec2::new(1.0, 2.0));
        assert!(Transform2d::from_data(&serde_json::json!({ "position": "up" }), &mut ctx).is_err());
    }
}
