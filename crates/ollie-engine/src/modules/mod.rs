//! Built-in modules: spatial data, colliders, rendering, gameplay and the
//! level editor.

pub mod animation;
pub mod behavior;
pub mod bird;
pub mod collider;
pub mod editor;
pub mod shape_renderer;
pub mod size;
pub mod spawner;
pub mod transform;
pub mod trigger;

pub use animation::Animation;
pub use behavior::WalkBackAndForthBehavior;
pub use bird::BirdController;
pub use collider::{CircleCollider2d, Collider2d, GizmoStyle, RayCollider2d, RectangleCollider2d};
pub use editor::{EditorTool, LevelEditor};
pub use shape_renderer::ShapeRenderer;
pub use size::Size2d;
pub use spawner::PlayerSpawner;
pub use transform::Transform2d;
pub use trigger::GoalTrigger;
