//! Collider shapes and pairwise intersection tests.
//!
//! Every shape variant has a fixed [`precedence`](ColliderShape::precedence).
//! A test between two shapes is always evaluated in the arm of the shape with
//! the higher precedence: when `self` ranks lower, the call is delegated to
//! `other` with the roles swapped. Each unordered pair of variants therefore
//! has exactly one implementation, and `a.check_collision(b)` equals
//! `b.check_collision(a)` by construction.
//!
//! | Shape          | Precedence |
//! |----------------|------------|
//! | Circle         | 1          |
//! | Rectangle      | 2          |
//! | Ray            | 3          |
//! | Point          | 4          |
//! | ConvexPolygon  | 4          |
//!
//! Pairs with no implementation (Ray-Point, Ray-Polygon) are programming
//! errors: [`ColliderShape::check_collision`] panics and
//! [`ColliderShape::try_check_collision`] returns
//! [`CoreError::UnsupportedShapePair`].
//!
//! All tests are boundary-inclusive: touching shapes collide.

use crate::math::{Rect2, Vec2};
use crate::CoreError;

/// Determinant magnitude below which two rays are treated as parallel.
const PARALLEL_EPSILON: f64 = 1e-10;

// ---------------------------------------------------------------------------
// ColliderShape
// ---------------------------------------------------------------------------

/// A world-space geometric primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Circle {
        center: Vec2,
        radius: f64,
    },
    Rectangle {
        rect: Rect2,
    },
    /// A ray segment from `origin` along `direction` (unit length) for at most
    /// `max_distance` units.
    Ray {
        origin: Vec2,
        direction: Vec2,
        max_distance: f64,
    },
    Point {
        position: Vec2,
    },
    /// A convex polygon. Vertex winding may be either direction.
    ConvexPolygon {
        vertices: Vec<Vec2>,
    },
}

/// Result of [`ColliderShape::get_collision`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// Minimum translation that moves the receiving shape out of the other.
    pub displacement: Vec2,
}

impl Collision {
    /// Penetration depth.
    pub fn depth(&self) -> f64 {
        self.displacement.length()
    }
}

impl ColliderShape {
    pub fn circle(center: Vec2, radius: f64) -> Self {
        Self::Circle { center, radius }
    }

    pub fn rectangle(rect: Rect2) -> Self {
        Self::Rectangle { rect }
    }

    /// Build a ray. `direction` is normalized here.
    pub fn ray(origin: Vec2, direction: Vec2, max_distance: f64) -> Self {
        Self::Ray {
            origin,
            direction: direction.normalized(),
            max_distance,
        }
    }

    pub fn point(position: Vec2) -> Self {
        Self::Point { position }
    }

    pub fn polygon(vertices: Vec<Vec2>) -> Self {
        Self::ConvexPolygon { vertices }
    }

    /// Dispatch rank; see the module docs.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Circle { .. } => 1,
            Self::Rectangle { .. } => 2,
            Self::Ray { .. } => 3,
            Self::Point { .. } | Self::ConvexPolygon { .. } => 4,
        }
    }

    /// Variant name, used in error messages and gizmo labels.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Circle { .. } => "Circle",
            Self::Rectangle { .. } => "Rectangle",
            Self::Ray { .. } => "Ray",
            Self::Point { .. } => "Point",
            Self::ConvexPolygon { .. } => "ConvexPolygon",
        }
    }

    /// Whether the two shapes overlap or touch.
    ///
    /// # Panics
    ///
    /// Panics with "Unsupported collider shape" for pairs that have no
    /// implementation.
    #[track_caller]
    pub fn check_collision(&self, other: &ColliderShape) -> bool {
        match self.try_check_collision(other) {
            Ok(hit) => hit,
            Err(e) => panic!("{e}"),
        }
    }

    /// Like [`check_collision`](Self::check_collision) but reports unsupported
    /// pairs as an error.
    pub fn try_check_collision(&self, other: &ColliderShape) -> Result<bool, CoreError> {
        if self.precedence() < other.precedence() {
            return other.try_check_collision(self);
        }

        use ColliderShape::*;
        let hit = match (self, other) {
            (Circle { center: c1, radius: r1 }, Circle { center: c2, radius: r2 }) => {
                let reach = r1 + r2;
                c1.distance_squared(*c2) <= reach * reach
            }

            (Rectangle { rect }, Circle { center, radius }) => {
                rect.clamp_point(*center).distance_squared(*center) <= radius * radius
            }
            (Rectangle { rect: a }, Rectangle { rect: b }) => a.intersects(b),

            (
                Ray {
                    origin,
                    direction,
                    max_distance,
                },
                Circle { center, radius },
            ) => {
                let t = (*center - *origin).dot(*direction).clamp(0.0, *max_distance);
                let closest = *origin + *direction * t;
                closest.distance_squared(*center) <= radius * radius
            }
            (
                Ray {
                    origin,
                    direction,
                    max_distance,
                },
                Rectangle { rect },
            ) => ray_hits_rect(*origin, *direction, *max_distance, rect),
            (
                Ray {
                    origin: p,
                    direction: d1,
                    max_distance: max1,
                },
                Ray {
                    origin: q,
                    direction: d2,
                    max_distance: max2,
                },
            ) => rays_intersect(*p, *d1, *max1, *q, *d2, *max2),

            (Point { position }, Circle { center, radius }) => {
                position.distance_squared(*center) <= radius * radius
            }
            (Point { position }, Rectangle { rect }) => rect.contains_point(*position),
            (Point { position: a }, Point { position: b }) => a == b,
            (Point { position }, ConvexPolygon { vertices })
            | (ConvexPolygon { vertices }, Point { position }) => {
                sat(&Convex::Poly(vertices), &Convex::Poly(std::slice::from_ref(position)))
                    .is_some()
            }

            (ConvexPolygon { vertices }, Circle { center, radius }) => {
                sat(&Convex::Poly(vertices), &Convex::Disc(*center, *radius)).is_some()
            }
            (ConvexPolygon { vertices }, Rectangle { rect }) => {
                sat(&Convex::Poly(vertices), &Convex::Poly(&rect.corners())).is_some()
            }
            (ConvexPolygon { vertices: a }, ConvexPolygon { vertices: b }) => {
                sat(&Convex::Poly(a), &Convex::Poly(b)).is_some()
            }

            (a, b) => {
                return Err(CoreError::UnsupportedShapePair {
                    a: a.kind_name(),
                    b: b.kind_name(),
                })
            }
        };
        Ok(hit)
    }

    /// Minimum translation vector that moves `self` out of `other`.
    ///
    /// Supported for Circle, Rectangle and ConvexPolygon pairs; other pairs
    /// return `None`. Touching shapes yield a zero displacement.
    pub fn get_collision(&self, other: &ColliderShape) -> Option<Collision> {
        if self.precedence() < other.precedence() {
            return other.get_collision(self).map(|c| Collision {
                displacement: -c.displacement,
            });
        }

        use ColliderShape::*;
        let displacement = match (self, other) {
            (Circle { center: c1, radius: r1 }, Circle { center: c2, radius: r2 }) => {
                let offset = *c1 - *c2;
                let dist = offset.length();
                let overlap = r1 + r2 - dist;
                if overlap < 0.0 {
                    return None;
                }
                let dir = if dist == 0.0 {
                    Vec2::new(0.0, -1.0)
                } else {
                    offset / dist
                };
                dir * overlap
            }
            (Rectangle { rect }, Circle { center, radius }) => {
                -circle_out_of_rect(*center, *radius, rect)?
            }
            (Rectangle { rect: a }, Rectangle { rect: b }) => {
                let overlap_x = a.right().min(b.right()) - a.left().max(b.left());
                let overlap_y = a.bottom().min(b.bottom()) - a.top().max(b.top());
                if overlap_x < 0.0 || overlap_y < 0.0 {
                    return None;
                }
                let delta = a.center() - b.center();
                if overlap_x < overlap_y {
                    Vec2::new(if delta.x < 0.0 { -overlap_x } else { overlap_x }, 0.0)
                } else {
                    Vec2::new(0.0, if delta.y < 0.0 { -overlap_y } else { overlap_y })
                }
            }
            (ConvexPolygon { vertices }, Circle { center, radius }) => {
                let (depth, axis) = sat(&Convex::Poly(vertices), &Convex::Disc(*center, *radius))?;
                axis * depth
            }
            (ConvexPolygon { vertices }, Rectangle { rect }) => {
                let (depth, axis) = sat(&Convex::Poly(vertices), &Convex::Poly(&rect.corners()))?;
                axis * depth
            }
            (ConvexPolygon { vertices: a }, ConvexPolygon { vertices: b }) => {
                let (depth, axis) = sat(&Convex::Poly(a), &Convex::Poly(b))?;
                axis * depth
            }
            _ => return None,
        };
        Some(Collision { displacement })
    }

    /// Axis-aligned bounds. `None` only for a polygon without vertices.
    pub fn bounds(&self) -> Option<Rect2> {
        match self {
            Self::Circle { center, radius } => Some(Rect2::from_center(
                *center,
                Vec2::new(radius * 2.0, radius * 2.0),
            )),
            Self::Rectangle { rect } => Some(*rect),
            Self::Ray {
                origin,
                direction,
                max_distance,
            } => Some(Rect2::from_points(
                *origin,
                *origin + *direction * *max_distance,
            )),
            Self::Point { position } => Some(Rect2::new(position.x, position.y, 0.0, 0.0)),
            Self::ConvexPolygon { vertices } => {
                let (first, rest) = vertices.split_first()?;
                let (min, max) = rest
                    .iter()
                    .fold((*first, *first), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
                Some(Rect2::from_points(min, max))
            }
        }
    }

    /// The same shape moved by `offset`.
    pub fn translated(&self, offset: Vec2) -> ColliderShape {
        match self {
            Self::Circle { center, radius } => Self::Circle {
                center: *center + offset,
                radius: *radius,
            },
            Self::Rectangle { rect } => Self::Rectangle {
                rect: rect.translated(offset),
            },
            Self::Ray {
                origin,
                direction,
                max_distance,
            } => Self::Ray {
                origin: *origin + offset,
                direction: *direction,
                max_distance: *max_distance,
            },
            Self::Point { position } => Self::Point {
                position: *position + offset,
            },
            Self::ConvexPolygon { vertices } => Self::ConvexPolygon {
                vertices: vertices.iter().map(|v| *v + offset).collect(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Pairwise helpers
// ---------------------------------------------------------------------------

/// Slab test. When the origin is inside the box the exit distance is used.
fn ray_hits_rect(origin: Vec2, direction: Vec2, max_distance: f64, rect: &Rect2) -> bool {
    let mut tmin = f64::NEG_INFINITY;
    let mut tmax = f64::INFINITY;

    for (o, d, lo, hi) in [
        (origin.x, direction.x, rect.left(), rect.right()),
        (origin.y, direction.y, rect.top(), rect.bottom()),
    ] {
        if d == 0.0 {
            if o < lo || o > hi {
                return false;
            }
        } else {
            let t1 = (lo - o) / d;
            let t2 = (hi - o) / d;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }
    }

    if tmax < 0.0 || tmin > tmax {
        return false;
    }
    let t = if tmin < 0.0 { tmax } else { tmin };
    t <= max_distance
}

/// Solve `p + u*d1 = q + v*d2`.
fn rays_intersect(p: Vec2, d1: Vec2, max1: f64, q: Vec2, d2: Vec2, max2: f64) -> bool {
    let det = d1.cross(d2);
    if det.abs() < PARALLEL_EPSILON {
        return false;
    }
    let w = q - p;
    let u = w.cross(d2) / det;
    let v = w.cross(d1) / det;
    (0.0..=max1).contains(&u) && (0.0..=max2).contains(&v)
}

/// Displacement pushing a circle out of a rectangle.
fn circle_out_of_rect(center: Vec2, radius: f64, rect: &Rect2) -> Option<Vec2> {
    let closest = rect.clamp_point(center);
    let offset = center - closest;
    let dist = offset.length();
    if dist > 0.0 {
        if dist > radius {
            return None;
        }
        return Some(offset / dist * (radius - dist));
    }

    // Centre inside the rectangle: leave through the nearest edge.
    let exits = [
        (center.x - rect.left(), Vec2::new(-1.0, 0.0)),
        (rect.right() - center.x, Vec2::new(1.0, 0.0)),
        (center.y - rect.top(), Vec2::new(0.0, -1.0)),
        (rect.bottom() - center.y, Vec2::new(0.0, 1.0)),
    ];
    let (edge, dir) = exits
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))?;
    Some(dir * (edge + radius))
}

// ---------------------------------------------------------------------------
// Separating axis theorem
// ---------------------------------------------------------------------------

enum Convex<'a> {
    Poly(&'a [Vec2]),
    Disc(Vec2, f64),
}

impl Convex<'_> {
    fn center(&self) -> Vec2 {
        match self {
            Convex::Poly(vs) if !vs.is_empty() => {
                vs.iter().fold(Vec2::ZERO, |acc, v| acc + *v) / vs.len() as f64
            }
            Convex::Poly(_) => Vec2::ZERO,
            Convex::Disc(c, _) => *c,
        }
    }

    fn project(&self, axis: Vec2) -> (f64, f64) {
        match self {
            Convex::Poly(vs) => vs.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                let p = v.dot(axis);
                (lo.min(p), hi.max(p))
            }),
            Convex::Disc(c, r) => {
                let p = c.dot(axis);
                (p - r, p + r)
            }
        }
    }

    /// Unit edge normals for polygons, plus the vertex-to-centre axis against
    /// a disc.
    fn axes(&self, other: &Convex<'_>, out: &mut Vec<Vec2>) {
        let Convex::Poly(vs) = self else { return };
        let n = vs.len();
        if n >= 2 {
            for i in 0..n {
                let edge = vs[(i + 1) % n] - vs[i];
                let axis = edge.perpendicular().normalized();
                if axis != Vec2::ZERO {
                    out.push(axis);
                }
            }
        }
        if let Convex::Disc(c, _) = other {
            let nearest = vs
                .iter()
                .min_by(|a, b| a.distance_squared(*c).total_cmp(&b.distance_squared(*c)));
            if let Some(v) = nearest {
                let axis = (*c - *v).normalized();
                if axis != Vec2::ZERO {
                    out.push(axis);
                }
            }
        }
    }
}

/// Returns the smallest overlap and its axis oriented from `b` towards `a`,
/// or `None` when a separating axis exists.
fn sat(a: &Convex<'_>, b: &Convex<'_>) -> Option<(f64, Vec2)> {
    if matches!(a, Convex::Poly(vs) if vs.is_empty()) || matches!(b, Convex::Poly(vs) if vs.is_empty())
    {
        return None;
    }

    let mut axes = Vec::new();
    a.axes(b, &mut axes);
    b.axes(a, &mut axes);

    if axes.is_empty() {
        // Two single points: overlap only when coincident.
        return (a.center() == b.center()).then_some((0.0, Vec2::ZERO));
    }

    let mut best: Option<(f64, Vec2)> = None;
    for axis in axes {
        let (a_min, a_max) = a.project(axis);
        let (b_min, b_max) = b.project(axis);
        if a_max < b_min || b_max < a_min {
            return None;
        }
        let overlap = a_max.min(b_max) - a_min.max(b_min);
        if best.map_or(true, |(d, _)| overlap < d) {
            best = Some((overlap, axis));
        }
    }

    best.map(|(depth, axis)| {
        if (a.center() - b.center()).dot(axis) < 0.0 {
            (depth, -axis)
        } else {
            (depth, axis)
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
