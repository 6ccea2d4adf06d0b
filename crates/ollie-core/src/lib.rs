//! Ollie Core -- math, collision, serialization and input primitives.
//!
//! This crate holds the engine-independent building blocks of the Ollie
//! engine: 2D value types, the collider-shape intersection system, the
//! type-keyed serializer registry, the input descriptor layer and the
//! error-handling helpers used throughout deserialization.
//!
//! # Quick Start
//!
//! ```
//! use ollie_core::prelude::*;
//!
//! let a = ColliderShape::circle(Vec2::new(0.0, 0.0), 10.0);
//! let b = ColliderShape::circle(Vec2::new(20.0, 0.0), 10.0);
//!
//! // Touching counts as colliding.
//! assert!(a.check_collision(&b));
//! assert!(b.check_collision(&a));
//!
//! let mut input = InputState::new();
//! let jump = Button::key("Space");
//! input.key_down("Space");
//! input.step();
//! assert!(jump.is_pressed(&input));
//! ```

#![deny(unsafe_code)]

pub mod fallible;
pub mod input;
pub mod math;
pub mod observable;
pub mod serializer;
pub mod shape;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by core operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// No intersection test exists for this pair of collider shapes.
    #[error("Unsupported collider shape pair: {a} vs {b}")]
    UnsupportedShapePair { a: &'static str, b: &'static str },

    /// A value's concrete type was never registered with a serializer.
    #[error("{serializer} serializer: type {type_name} is not registered")]
    UnregisteredType {
        serializer: String,
        type_name: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::fallible::{
        attempt, attempt_async, AsyncOption, AsyncResult, ErrorReport, OptionExt,
        PartialFailure, ResultExt, UnknownError,
    };
    pub use crate::input::{
        Axis, Bindings, Button, DeviceSnapshot, HalfAxis, InputState, MouseButton,
    };
    pub use crate::math::{Mat3, Modulo, Rect2, Vec2};
    pub use crate::observable::{Observable, SubscriptionId};
    pub use crate::serializer::{Reflect, Serializer, TypedDto};
    pub use crate::shape::{ColliderShape, Collision};
    pub use crate::CoreError;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_pair_message() {
        let err = CoreError::UnsupportedShapePair {
            a: "Ray",
            b: "Point",
        };
        assert_eq!(err.to_string(), "Unsupported collider shape pair: Ray vs Point");
    }

    #[test]
    fn errors_report_through_fallible() {
        let err = CoreError::UnregisteredType {
            serializer: "module".into(),
            type_name: "Widget",
        };
        let report = fallible::ErrorReport::from_error(&err);
        assert_eq!(report.message, "module serializer: type Widget is not registered");
        assert!(report.cause.is_empty());
    }
}
