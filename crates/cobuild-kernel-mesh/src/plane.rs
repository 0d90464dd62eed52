//! Oriented cutting planes.

use cobuild_kernel_math::{Point3, Vec3};

/// A plane `normal · p = d` with a unit normal.
///
/// Points with a negative signed distance are on the "back" side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vec3,
    /// Signed distance from the origin along `normal`.
    pub d: f64,
}

impl Plane {
    /// Plane from a (not necessarily unit) normal and a distance measured
    /// along that normal's direction.
    pub fn new(normal: Vec3, d: f64) -> Self {
        Self {
            normal: unit_or_z(&normal),
            d,
        }
    }

    /// Plane through `point` with normal `normal`. The normal is normalized,
    /// so sloped normals such as `(0, 1, tan θ)` can be passed directly.
    pub fn from_point_normal(point: &Point3, normal: &Vec3) -> Self {
        let n = unit_or_z(normal);
        Self {
            normal: n,
            d: n.dot(&point.coords),
        }
    }

    /// Horizontal plane at height `z` facing up.
    pub fn horizontal(z: f64) -> Self {
        Self {
            normal: Vec3::z(),
            d: z,
        }
    }

    /// `normal · p − d`.
    #[inline]
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.coords) - self.d
    }

    /// Point of the plane closest to the origin.
    pub fn origin(&self) -> Point3 {
        Point3::from(self.normal * self.d)
    }

    /// Same plane facing the opposite way.
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            d: -self.d,
        }
    }

    /// Orthonormal in-plane basis `(u, v)` with `u × v = normal`.
    pub fn basis(&self) -> (Vec3, Vec3) {
        let helper = if self.normal.x.abs() < 0.9 {
            Vec3::x()
        } else {
            Vec3::y()
        };
        let u = self.normal.cross(&helper).normalize();
        let v = self.normal.cross(&u);
        (u, v)
    }
}

fn unit_or_z(v: &Vec3) -> Vec3 {
    v.try_normalize(1e-12).unwrap_or_else(Vec3::z)
}
