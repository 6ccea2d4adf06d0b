//! 2D math value types: [`Vec2`], [`Rect2`], [`Mat3`] and [`Modulo`].
//!
//! All coordinates are `f64` in world units. The y-axis points down (canvas
//! convention), so a [`Rect2`] is anchored at its top-left corner.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Vec2
// ---------------------------------------------------------------------------

/// A 2D vector or point.
///
/// Serializes as a two-element array `[x, y]`, which is the shape used by
/// object transforms in level files.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component (down is positive).
    pub y: f64,
}

impl Vec2 {
    /// `(0, 0)`.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    /// `(1, 1)`.
    pub const ONE: Vec2 = Vec2 { x: 1.0, y: 1.0 };
    /// Unit vector along +x.
    pub const RIGHT: Vec2 = Vec2 { x: 1.0, y: 0.0 };
    /// Unit vector along +y (screen down).
    pub const DOWN: Vec2 = Vec2 { x: 0.0, y: 1.0 };

    /// Construct a vector.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing at `angle` radians (clockwise from +x on screen).
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross product).
    #[inline]
    pub fn cross(self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len == 0.0 {
            Vec2::ZERO
        } else {
            self / len
        }
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }

    pub fn distance_squared(self, other: Vec2) -> f64 {
        (self - other).length_squared()
    }

    /// Rotate by `angle` radians around the origin.
    pub fn rotated(self, angle: f64) -> Vec2 {
        let (sin, cos) = angle.sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Perpendicular vector `(-y, x)`.
    #[inline]
    pub fn perpendicular(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    /// Angle of the vector in radians, in `(-PI, PI]`.
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Linear interpolation; `t = 0` yields `self`, `t = 1` yields `other`.
    pub fn lerp(self, other: Vec2, t: f64) -> Vec2 {
        self + (other - self) * t
    }

    /// Component-wise minimum.
    pub fn min(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum.
    pub fn max(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Snap both components to the nearest multiple of `step`.
    pub fn snapped(self, step: f64) -> Vec2 {
        if step <= 0.0 {
            return self;
        }
        Vec2::new((self.x / step).round() * step, (self.y / step).round() * step)
    }

    /// Whether both components are finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Debug for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec2({}, {})", self.x, self.y)
    }
}

impl From<[f64; 2]> for Vec2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Vec2::new(x, y)
    }
}

impl From<Vec2> for [f64; 2] {
    fn from(v: Vec2) -> Self {
        [v.x, v.y]
    }
}

impl From<(f64, f64)> for Vec2 {
    fn from((x, y): (f64, f64)) -> Self {
        Vec2::new(x, y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl MulAssign<f64> for Vec2 {
    fn mul_assign(&mut self, rhs: f64) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

// ---------------------------------------------------------------------------
// Rect2
// ---------------------------------------------------------------------------

/// An axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect2 {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Extent along x. May be zero.
    pub width: f64,
    /// Extent along y. May be zero.
    pub height: f64,
}

impl Rect2 {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build the smallest rectangle containing both corners, in any order.
    pub fn from_points(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Rectangle of `size` centred on `center`.
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self::new(
            center.x - size.x / 2.0,
            center.y - size.y / 2.0,
            size.x,
            size.y,
        )
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn min(&self) -> Vec2 {
        self.position()
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.right(), self.bottom())
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The four corners in clockwise order starting at the top-left.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.left(), self.top()),
            Vec2::new(self.right(), self.top()),
            Vec2::new(self.right(), self.bottom()),
            Vec2::new(self.left(), self.bottom()),
        ]
    }

    /// Inclusive point containment: points on the edge are inside.
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Inclusive overlap test: rectangles that share an edge intersect.
    pub fn intersects(&self, other: &Rect2) -> bool {
        self.left() <= other.right()
            && self.right() >= other.left()
            && self.top() <= other.bottom()
            && self.bottom() >= other.top()
    }

    /// Clamp a point into the rectangle.
    pub fn clamp_point(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(self.left(), self.right()),
            point.y.clamp(self.top(), self.bottom()),
        )
    }

    pub fn translated(&self, offset: Vec2) -> Rect2 {
        Rect2::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Grow by `margin` on every side. Negative margins shrink.
    pub fn expanded(&self, margin: f64) -> Rect2 {
        Rect2::new(
            self.x - margin,
            self.y - margin,
            self.width + margin * 2.0,
            self.height + margin * 2.0,
        )
    }

    pub fn union(&self, other: &Rect2) -> Rect2 {
        Rect2::from_points(self.min().min(other.min()), self.max().max(other.max()))
    }
}

// ---------------------------------------------------------------------------
// Mat3
// ---------------------------------------------------------------------------

/// A 2D affine transform in canvas order.
///
/// Represents the matrix
///
/// ```text
/// | a c e |
/// | b d f |
/// | 0 0 1 |
/// ```
///
/// which is the layout used by `CanvasRenderingContext2D.setTransform`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat3 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3 {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translation(offset: Vec2) -> Mat3 {
        Mat3 {
            e: offset.x,
            f: offset.y,
            ..Mat3::IDENTITY
        }
    }

    pub fn scaling(scale: Vec2) -> Mat3 {
        Mat3 {
            a: scale.x,
            d: scale.y,
            ..Mat3::IDENTITY
        }
    }

    pub fn rotation(angle: f64) -> Mat3 {
        let (sin, cos) = angle.sin_cos();
        Mat3 {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self * other`: applying the result equals applying `other` first,
    /// then `self`.
    pub fn multiply(&self, other: &Mat3) -> Mat3 {
        Mat3 {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// The inverse transform, or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Mat3> {
        let det = self.determinant();
        if det.abs() < 1e-12 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Mat3 {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            e: (self.c * self.f - self.d * self.e) * inv,
            f: (self.b * self.e - self.a * self.f) * inv,
        })
    }

    /// Transform a point (translation applies).
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Transform a direction (translation ignored).
    pub fn transform_vector(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.a * v.x + self.c * v.y, self.b * v.x + self.d * v.y)
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Mat3::IDENTITY
    }
}

impl Mul for Mat3 {
    type Output = Mat3;
    fn mul(self, rhs: Mat3) -> Mat3 {
        self.multiply(&rhs)
    }
}

// ---------------------------------------------------------------------------
// Modulo
// ---------------------------------------------------------------------------

/// Modular arithmetic helpers for wrapping quantities such as angles.
pub struct Modulo;

impl Modulo {
    /// Wrap `value` into `[0, m)`.
    ///
    /// `m` must be positive.
    pub fn normalize(value: f64, m: f64) -> f64 {
        let r = value % m;
        let r = if r < 0.0 { r + m } else { r };
        // `r + m` can round up to exactly `m` for tiny negative remainders.
        if r >= m {
            0.0
        } else {
            r
        }
    }

    /// Signed shortest difference `a - b` on a circle of size `m`, in
    /// `[-m/2, m/2)`.
    pub fn difference(a: f64, b: f64, m: f64) -> f64 {
        let d = Self::normalize(a - b, m);
        if d >= m / 2.0 {
            d - m
        } else {
            d
        }
    }

    /// Interpolate from `a` towards `b` along the shortest arc.
    pub fn lerp(a: f64, b: f64, t: f64, m: f64) -> f64 {
        Self::normalize(a + Self::difference(b, a, m) * t, m)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{PI, TAU};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn vec2_serializes_as_array() {
        let json = serde_json::to_value(Vec2::new(3.0, -4.5)).unwrap();
        assert_eq!(json, serde_json::json!([3.0, -4.5]));
        let back: Vec2 = serde_json::from_value(json).unwrap();
        assert_eq!(back, Vec2::new(3.0, -4.5));
    }

    #[test]
    fn normalized_zero_stays_zero() {
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
        let n = Vec2::new(3.0, 4.0).normalized();
        assert!(approx(n.length(), 1.0));
    }

    #[test]
    fn rotate_quarter_turn() {
        let r = Vec2::RIGHT.rotated(PI / 2.0);
        assert!(approx(r.x, 0.0));
        assert!(approx(r.y, 1.0));
    }

    #[test]
    fn rect_edges_are_inclusive() {
        let r = Rect2::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains_point(Vec2::new(10.0, 10.0)));
        assert!(r.intersects(&Rect2::new(10.0, 0.0, 5.0, 5.0)));
        assert!(!r.intersects(&Rect2::new(10.1, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn rect_from_points_any_order() {
        let r = Rect2::from_points(Vec2::new(5.0, 1.0), Vec2::new(1.0, 5.0));
        assert_eq!(r, Rect2::new(1.0, 1.0, 4.0, 4.0));
    }

    #[test]
    fn mat3_inverse_roundtrip() {
        let m = Mat3::translation(Vec2::new(10.0, 20.0))
            * Mat3::scaling(Vec2::new(2.0, 2.0))
            * Mat3::rotation(0.3);
        let inv = m.inverse().unwrap();
        let p = Vec2::new(7.0, -3.0);
        let back = inv.transform_point(m.transform_point(p));
        assert!(approx(back.x, p.x));
        assert!(approx(back.y, p.y));
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        assert!(Mat3::scaling(Vec2::new(0.0, 1.0)).inverse().is_none());
    }

    #[test]
    fn modulo_normalize_negative() {
        assert!(approx(Modulo::normalize(-1.0, 360.0), 359.0));
        assert!(approx(Modulo::normalize(725.0, 360.0), 5.0));
        assert_eq!(Modulo::normalize(-1e-18, 1.0), 0.0);
    }

    #[test]
    fn modulo_difference_shortest_arc() {
        assert!(approx(Modulo::difference(10.0, 350.0, 360.0), 20.0));
        assert!(approx(Modulo::difference(350.0, 10.0, 360.0), -20.0));
        // Exactly half way maps to the negative end of the range.
        assert!(approx(Modulo::difference(180.0, 0.0, 360.0), -180.0));
    }

    #[test]
    fn modulo_lerp_wraps() {
        let mid = Modulo::lerp(TAU - 0.1, 0.1, 0.5, TAU);
        assert!(mid < 1e-9 || (TAU - mid) < 1e-9);
    }
}
