//! Ray casting against triangle meshes.
//!
//! Triangles are bucketed into a 2D grid over their XY bounding boxes, so the
//! vertical casts used for occupancy sampling only test the handful of
//! triangles above or below the query point.

use std::collections::HashMap;

use cobuild_kernel_math::{Aabb3, Dir3, Point3, Vec3};

use crate::mesh::TriangleMesh;
use crate::triangle::Triangle;

/// A ray with a unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Dir3,
}

impl Ray {
    /// Create a new ray; `direction` is normalized.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: Dir3::new_normalize(direction),
        }
    }

    /// `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction.as_ref()
    }

    fn is_vertical(&self) -> bool {
        self.direction.x.abs() < 1e-12 && self.direction.y.abs() < 1e-12
    }
}

/// Nearest intersection of a ray with a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Ray parameter of the hit.
    pub t: f64,
    /// Hit position.
    pub point: Point3,
    /// Normal of the triangle that was hit.
    pub normal: Vec3,
    /// Index of that triangle in the source mesh.
    pub triangle: usize,
}

/// Grid-accelerated ray caster over a snapshot of a mesh.
pub struct MeshRaycaster {
    triangles: Vec<Triangle>,
    bounds: Aabb3,
    cell_size: f64,
    origin_xy: [f64; 2],
    grid_nx: usize,
    grid_ny: usize,
    cells: HashMap<(usize, usize), Vec<usize>>,
}

impl MeshRaycaster {
    /// Build the grid with square cells of `cell_size`.
    pub fn new(mesh: &TriangleMesh, cell_size: f64) -> Self {
        let bounds = mesh.bounds();
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        let triangles = mesh.triangles().to_vec();

        if triangles.is_empty() {
            return Self {
                triangles,
                bounds,
                cell_size,
                origin_xy: [0.0, 0.0],
                grid_nx: 0,
                grid_ny: 0,
                cells: HashMap::new(),
            };
        }

        let padding = cell_size * 0.1;
        let min_x = bounds.min.x - padding;
        let min_y = bounds.min.y - padding;
        let max_x = bounds.max.x + padding;
        let max_y = bounds.max.y + padding;

        let grid_nx = ((max_x - min_x) / cell_size).ceil() as usize + 1;
        let grid_ny = ((max_y - min_y) / cell_size).ceil() as usize + 1;

        let mut cells: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (idx, tri) in triangles.iter().enumerate() {
            let [a, b, c] = tri.vertices;
            let x0 = ((a.x.min(b.x).min(c.x) - min_x) / cell_size).floor() as usize;
            let y0 = ((a.y.min(b.y).min(c.y) - min_y) / cell_size).floor() as usize;
            let x1 = ((a.x.max(b.x).max(c.x) - min_x) / cell_size).floor() as usize;
            let y1 = ((a.y.max(b.y).max(c.y) - min_y) / cell_size).floor() as usize;

            for iy in y0..=y1.min(grid_ny - 1) {
                for ix in x0..=x1.min(grid_nx - 1) {
                    cells.entry((ix, iy)).or_default().push(idx);
                }
            }
        }

        tracing::debug!(
            triangles = triangles.len(),
            grid_nx,
            grid_ny,
            occupied = cells.len(),
            "built ray-cast grid"
        );

        Self {
            triangles,
            bounds,
            cell_size,
            origin_xy: [min_x, min_y],
            grid_nx,
            grid_ny,
            cells,
        }
    }

    /// Bounds of the mesh the caster was built from.
    pub fn bounds(&self) -> Aabb3 {
        self.bounds
    }

    /// Nearest hit with `t > 0`, if any.
    pub fn raycast(&self, ray: &Ray) -> Option<RayHit> {
        if ray.is_vertical() {
            let candidates = self.cell(ray.origin.x, ray.origin.y)?;
            self.nearest(ray, candidates.iter().copied())
        } else {
            self.nearest(ray, 0..self.triangles.len())
        }
    }

    /// Cast straight up from below the mesh, or straight down from above it.
    ///
    /// Upward casts return the lowest surface over `(x, y)`, downward casts
    /// the highest.
    pub fn cast_vertical(&self, x: f64, y: f64, upward: bool) -> Option<RayHit> {
        if self.triangles.is_empty() {
            return None;
        }
        let (z, dz) = if upward {
            (self.bounds.min.z - 1.0, 1.0)
        } else {
            (self.bounds.max.z + 1.0, -1.0)
        };
        self.raycast(&Ray::new(Point3::new(x, y, z), Vec3::new(0.0, 0.0, dz)))
    }

    fn cell(&self, x: f64, y: f64) -> Option<&Vec<usize>> {
        let fx = ((x - self.origin_xy[0]) / self.cell_size).floor();
        let fy = ((y - self.origin_xy[1]) / self.cell_size).floor();
        if fx < 0.0 || fy < 0.0 {
            return None;
        }
        let (ix, iy) = (fx as usize, fy as usize);
        if ix >= self.grid_nx || iy >= self.grid_ny {
            return None;
        }
        self.cells.get(&(ix, iy))
    }

    fn nearest(&self, ray: &Ray, candidates: impl Iterator<Item = usize>) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for idx in candidates {
            let tri = &self.triangles[idx];
            if let Some(t) = intersect_triangle(ray, tri) {
                if best.map_or(true, |b| t < b.t) {
                    best = Some(RayHit {
                        t,
                        point: ray.at(t),
                        normal: tri.normal,
                        triangle: idx,
                    });
                }
            }
        }
        best
    }
}

/// Möller-Trumbore intersection; edges count as hits so rays through a shared
/// edge are never lost.
fn intersect_triangle(ray: &Ray, tri: &Triangle) -> Option<f64> {
    const EPS: f64 = 1e-12;
    let [v0, v1, v2] = tri.vertices;
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let p = ray.direction.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < EPS {
        return None;
    }
    let inv = 1.0 / det;
    let s = ray.origin - v0;
    let u = s.dot(&p) * inv;
    if !(-1e-9..=1.0 + 1e-9).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = ray.direction.dot(&q) * inv;
    if v < -1e-9 || u + v > 1.0 + 1e-9 {
        return None;
    }
    let t = e2.dot(&q) * inv;
    (t > EPS).then_some(t)
}
