//! Triangle soup with an incrementally maintained bounding box.

use cobuild_kernel_math::{Aabb3, Point3, Transform, Vec3};

use crate::triangle::Triangle;

/// A triangle mesh owned by value.
///
/// Cloning produces an independent copy; splitting always builds fresh
/// meshes, so no two chunks ever share triangle storage.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    triangles: Vec<Triangle>,
    bounds: Aabb3,
}

impl TriangleMesh {
    /// Empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mesh from a list of triangles.
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let mut mesh = Self {
            triangles: Vec::with_capacity(triangles.len()),
            bounds: Aabb3::empty(),
        };
        for t in triangles {
            mesh.push(t);
        }
        mesh
    }

    /// Mesh from indexed geometry; out-of-range indices are skipped.
    pub fn from_indexed(vertices: &[[f64; 3]], indices: &[u32]) -> Self {
        let mut mesh = Self::new();
        for tri in indices.chunks_exact(3) {
            let fetch = |i: u32| vertices.get(i as usize).map(|v| Point3::new(v[0], v[1], v[2]));
            if let (Some(a), Some(b), Some(c)) = (fetch(tri[0]), fetch(tri[1]), fetch(tri[2])) {
                mesh.push(Triangle::new(a, b, c));
            }
        }
        mesh
    }

    /// Append a triangle, growing the bounding box.
    pub fn push(&mut self, triangle: Triangle) {
        for v in &triangle.vertices {
            self.bounds.include_point(v);
        }
        self.triangles.push(triangle);
    }

    /// Append every triangle of `other`.
    pub fn merge(&mut self, other: &TriangleMesh) {
        self.triangles.reserve(other.triangles.len());
        for t in &other.triangles {
            self.push(*t);
        }
    }

    /// Triangles in insertion order.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Axis-aligned bounds of every vertex pushed so far.
    pub fn bounds(&self) -> Aabb3 {
        self.bounds
    }

    /// Extent along each axis.
    pub fn size(&self) -> Vec3 {
        self.bounds.size()
    }

    /// Bounding box centre.
    pub fn center(&self) -> Point3 {
        self.bounds.center()
    }

    /// Apply `transform` to every vertex and normal.
    pub fn transform(&mut self, transform: &Transform) {
        let mut bounds = Aabb3::empty();
        for t in &mut self.triangles {
            for v in &mut t.vertices {
                *v = transform.apply_point(v);
                bounds.include_point(v);
            }
            t.normal = transform.apply_normal(&t.normal);
        }
        self.bounds = bounds;
    }

    /// Translate by `offset`.
    pub fn translate(&mut self, offset: &Vec3) {
        self.transform(&Transform::translation(offset.x, offset.y, offset.z));
    }

    /// Move the bounding-box centre to the origin in X and Y, leaving Z
    /// alone. Returns the applied offset.
    pub fn center_xy(&mut self) -> Vec3 {
        if self.is_empty() {
            return Vec3::zeros();
        }
        let c = self.center();
        let offset = Vec3::new(-c.x, -c.y, 0.0);
        self.translate(&offset);
        offset
    }

    /// Move the bounding-box centre to the origin. Returns the applied offset.
    pub fn normalize(&mut self) -> Vec3 {
        if self.is_empty() {
            return Vec3::zeros();
        }
        let offset = -self.center().coords;
        self.translate(&offset);
        offset
    }

    /// Signed volume via the divergence theorem; positive for a closed mesh
    /// with outward normals.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.vertices;
                a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
            })
            .sum()
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        self.triangles.iter().map(Triangle::area).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::cuboid;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounds_grow_incrementally() {
        let mut mesh = TriangleMesh::new();
        assert!(mesh.bounds().is_empty());
        mesh.push(Triangle::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ));
        assert_relative_eq!(mesh.size().x, 1.0);
        mesh.push(Triangle::new(
            Point3::new(0.0, 0.0, 3.0),
            Point3::new(1.0, 0.0, 3.0),
            Point3::new(0.0, -2.0, 3.0),
        ));
        let s = mesh.size();
        assert_relative_eq!(s.y, 3.0);
        assert_relative_eq!(s.z, 3.0);
    }

    #[test]
    fn test_cube_volume_and_area() {
        let mesh = cuboid(Point3::origin(), Point3::new(2.0, 3.0, 4.0));
        assert_eq!(mesh.triangle_count(), 12);
        assert_relative_eq!(mesh.signed_volume(), 24.0, epsilon = 1e-9);
        assert_relative_eq!(mesh.surface_area(), 52.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normalize_recenters() {
        let mut mesh = cuboid(Point3::new(10.0, 10.0, 10.0), Point3::new(12.0, 14.0, 16.0));
        let offset = mesh.normalize();
        assert_relative_eq!(offset.x, -11.0);
        assert_relative_eq!(mesh.center().coords.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_center_xy_keeps_z() {
        let mut mesh = cuboid(Point3::new(10.0, 10.0, 5.0), Point3::new(12.0, 14.0, 6.0));
        mesh.center_xy();
        assert_relative_eq!(mesh.bounds().min.z, 5.0);
        assert_relative_eq!(mesh.center().x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_indexed_skips_bad_indices() {
        let verts = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let mesh = TriangleMesh::from_indexed(&verts, &[0, 1, 2, 0, 1, 9]);
        assert_eq!(mesh.triangle_count(), 1);
    }
}
