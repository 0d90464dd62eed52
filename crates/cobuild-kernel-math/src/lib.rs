#![warn(missing_docs)]

//! Math types for the cobuild kernel.
//!
//! Thin wrappers around nalgebra providing the point, vector and transform
//! types shared by the mesh splitter, slicer and chunker, plus the rounding
//! and tolerance rules used whenever floating point coordinates are compared
//! topologically.

pub mod bbox;

pub use bbox::Aabb3;

use nalgebra::{Matrix4, Unit, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in a 2D projection plane.
pub type Point2 = nalgebra::Point2<f64>;

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a normal vector (inverse transpose of the upper-left 3x3).
    ///
    /// The result is renormalized; a singular transform leaves `n` unchanged.
    pub fn apply_normal(&self, n: &Vec3) -> Vec3 {
        let m3 = self.matrix.fixed_view::<3, 3>(0, 0);
        match m3.try_inverse() {
            Some(inv) => {
                let out = inv.transpose() * n;
                let len = out.norm();
                if len > 1e-12 {
                    out / len
                } else {
                    *n
                }
            }
            None => *n,
        }
    }
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in mm.
    pub linear: f64,
    /// Decimal places kept when snapping coordinates for topological matching.
    pub round_places: u32,
}

impl Tolerance {
    /// Default tolerances: 1e-9 mm snapping to a plane, 3 decimal places for
    /// endpoint matching.
    pub const DEFAULT: Self = Self {
        linear: 1e-9,
        round_places: 3,
    };

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }

    /// Integer key of a point after rounding, usable in hash and ordered maps.
    pub fn key(&self, p: &Point3) -> PointKey {
        point_key(p, self.round_places)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Exact lattice key of a rounded point.
pub type PointKey = [i64; 3];

/// Round `x` to `places` decimal places (half away from zero).
pub fn round_to(x: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (x * scale).round() / scale
}

/// Round every coordinate of `p` to `places` decimal places.
pub fn round_point(p: &Point3, places: u32) -> Point3 {
    Point3::new(
        round_to(p.x, places),
        round_to(p.y, places),
        round_to(p.z, places),
    )
}

/// Lattice key of `p` at `places` decimal places.
///
/// Two points share a key exactly when their rounded coordinates are equal,
/// which avoids hashing floats directly.
pub fn point_key(p: &Point3, places: u32) -> PointKey {
    let scale = 10f64.powi(places as i32);
    [
        (p.x * scale).round() as i64,
        (p.y * scale).round() as i64,
        (p.z * scale).round() as i64,
    ]
}

/// Linear interpolation from `a` toward `b` by `t` in `[0, 1]`.
pub fn lerp(a: &Point3, b: &Point3, t: f64) -> Point3 {
    a + (b - a) * t
}
