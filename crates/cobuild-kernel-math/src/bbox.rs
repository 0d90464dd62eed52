//! Axis-aligned bounding boxes.

use serde::{Deserialize, Serialize};

use crate::{Point3, Vec3};

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// True until at least one point has been included.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Aabb3) -> Aabb3 {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let mut out = *self;
        out.include_point(&other.min);
        out.include_point(&other.max);
        out
    }

    /// Extent along each axis; zero for an empty box.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::zeros();
        }
        self.max - self.min
    }

    /// Box centre.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Height along Z.
    pub fn height(&self) -> f64 {
        self.size().z
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}
