//! Plane bisection of closed meshes.
//!
//! Every triangle is clipped against both half-spaces, and the cut is closed
//! on each side with a cap rebuilt from the chained cut edges.

use cobuild_kernel_math::{Point2, Point3, Tolerance};

use crate::cap::{chain_loops, triangulate_nested};
use crate::mesh::TriangleMesh;
use crate::plane::Plane;
use crate::triangle::Triangle;

/// Decimal places used to chain cut edges; crossings on shared edges are
/// computed identically, so only float noise needs absorbing.
const CHAIN_PLACES: u32 = 9;

/// The two halves of a split.
#[derive(Debug, Clone, Default)]
pub struct SplitResult {
    /// Part behind the plane (negative signed distance).
    pub negative: TriangleMesh,
    /// Part in front of the plane.
    pub positive: TriangleMesh,
}

impl SplitResult {
    /// `(negative, positive)`.
    pub fn into_pair(self) -> (TriangleMesh, TriangleMesh) {
        (self.negative, self.positive)
    }
}

/// Split `mesh` by `plane` with the default tolerance.
pub fn split(mesh: &TriangleMesh, plane: &Plane) -> SplitResult {
    split_with_tolerance(mesh, plane, &Tolerance::DEFAULT)
}

/// Split `mesh` by `plane`, snapping distances below `tol.linear` onto it.
///
/// Either half may come back empty. The input is left untouched.
pub fn split_with_tolerance(mesh: &TriangleMesh, plane: &Plane, tol: &Tolerance) -> SplitResult {
    let mut negative = TriangleMesh::new();
    let mut positive = TriangleMesh::new();
    let mut coplanar: Vec<Triangle> = Vec::new();
    let mut cut: Vec<(Point3, Point3)> = Vec::new();

    for tri in mesh.triangles() {
        let d = tri.vertices.map(|v| {
            let s = plane.signed_distance(&v);
            if tol.is_zero(s) {
                0.0
            } else {
                s
            }
        });

        if d.iter().all(|&x| x == 0.0) {
            coplanar.push(*tri);
            continue;
        }
        if d.iter().any(|&x| x < 0.0) {
            if let Some(edge) = cut_edge(tri, &d) {
                cut.push(edge);
            }
        }
        if d.iter().all(|&x| x <= 0.0) {
            negative.push(*tri);
            continue;
        }
        if d.iter().all(|&x| x >= 0.0) {
            positive.push(*tri);
            continue;
        }

        for t in clip(tri, &d, -1.0) {
            negative.push(t);
        }
        for t in clip(tri, &d, 1.0) {
            positive.push(t);
        }
    }

    if !coplanar.is_empty() {
        // With nothing on one side there is no cut to cap, so faces lying in
        // the plane stay with the other half.
        if negative.is_empty() {
            coplanar.into_iter().for_each(|t| positive.push(t));
        } else if positive.is_empty() {
            coplanar.into_iter().for_each(|t| negative.push(t));
        } else {
            tracing::debug!(count = coplanar.len(), "dropped faces lying in the cut plane");
        }
    }

    let cap = build_cap(&cut, plane, tol);
    if !cap.is_empty() {
        if !negative.is_empty() {
            cap.iter().for_each(|t| negative.push(*t));
        }
        if !positive.is_empty() {
            cap.iter().for_each(|t| positive.push(t.flipped()));
        }
    }

    tracing::debug!(
        input = mesh.triangle_count(),
        negative = negative.triangle_count(),
        positive = positive.triangle_count(),
        cap = cap.len(),
        "split mesh"
    );

    SplitResult { negative, positive }
}

/// Zero crossing of edge `(p, q)`, evaluated from the lexicographically
/// smaller endpoint so both triangles sharing the edge agree bit for bit.
fn crossing(p: &Point3, dp: f64, q: &Point3, dq: f64) -> Point3 {
    let (a, da, b, db) = if lex_less(p, q) {
        (p, dp, q, dq)
    } else {
        (q, dq, p, dp)
    };
    let s = da / (da - db);
    a + (b - a) * s
}

fn lex_less(p: &Point3, q: &Point3) -> bool {
    (p.x, p.y, p.z) < (q.x, q.y, q.z)
}

/// The segment where `tri` meets the plane, when exactly two distinct points
/// lie on it.
fn cut_edge(tri: &Triangle, d: &[f64; 3]) -> Option<(Point3, Point3)> {
    let mut points: Vec<Point3> = Vec::with_capacity(3);
    for i in 0..3 {
        let j = (i + 1) % 3;
        if d[i] == 0.0 {
            points.push(tri.vertices[i]);
        }
        if (d[i] < 0.0 && d[j] > 0.0) || (d[i] > 0.0 && d[j] < 0.0) {
            points.push(crossing(&tri.vertices[i], d[i], &tri.vertices[j], d[j]));
        }
    }
    match points.as_slice() {
        [p, q] if p != q => Some((*p, *q)),
        _ => None,
    }
}

/// Sutherland-Hodgman against one half-space, fan-triangulated.
/// `side` is −1 to keep the back, +1 to keep the front.
fn clip(tri: &Triangle, d: &[f64; 3], side: f64) -> Vec<Triangle> {
    let mut poly: Vec<Point3> = Vec::with_capacity(4);
    for i in 0..3 {
        let j = (i + 1) % 3;
        if side * d[i] >= 0.0 {
            poly.push(tri.vertices[i]);
        }
        if (d[i] < 0.0 && d[j] > 0.0) || (d[i] > 0.0 && d[j] < 0.0) {
            poly.push(crossing(&tri.vertices[i], d[i], &tri.vertices[j], d[j]));
        }
    }

    let mut out = Vec::with_capacity(2);
    for k in 1..poly.len().saturating_sub(1) {
        let t = Triangle::with_normal([poly[0], poly[k], poly[k + 1]], tri.normal);
        if t.area() > 0.0 {
            out.push(t);
        }
    }
    out
}

/// Cap triangles facing `+normal`, which closes the negative half.
fn build_cap(cut: &[(Point3, Point3)], plane: &Plane, tol: &Tolerance) -> Vec<Triangle> {
    if cut.len() < 3 {
        return Vec::new();
    }
    let fine = Tolerance {
        linear: tol.linear,
        round_places: CHAIN_PLACES,
    };
    let loops = chain_loops(cut, &fine);
    if loops.is_empty() {
        tracing::warn!(segments = cut.len(), "cut edges did not close into loops");
        return Vec::new();
    }

    let origin = plane.origin();
    let (u, v) = plane.basis();
    let projected: Vec<Vec<Point2>> = loops
        .iter()
        .map(|l| {
            l.iter()
                .map(|p| {
                    let w = p - origin;
                    Point2::new(w.dot(&u), w.dot(&v))
                })
                .collect()
        })
        .collect();

    triangulate_nested(&projected)
        .into_iter()
        .map(|corners| {
            let [a, b, c] = corners.map(|(l, i)| loops[l][i]);
            Triangle::with_normal([a, b, c], plane.normal)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{circle, cuboid, prism};
    use approx::assert_relative_eq;
    use cobuild_kernel_math::Vec3;

    #[test]
    fn test_cube_halves() {
        let cube = cuboid(Point3::origin(), Point3::new(2.0, 2.0, 2.0));
        let result = split(&cube, &Plane::horizontal(0.5));

        assert_relative_eq!(result.negative.signed_volume(), 4.0 * 0.5, epsilon = 1e-9);
        assert_relative_eq!(result.positive.signed_volume(), 4.0 * 1.5, epsilon = 1e-9);
        assert_relative_eq!(result.negative.bounds().max.z, 0.5, epsilon = 1e-12);
        assert_relative_eq!(result.positive.bounds().min.z, 0.5, epsilon = 1e-12);

        let merged = result.negative.bounds().union(&result.positive.bounds());
        assert_eq!(merged, cube.bounds());
        assert_eq!(cube.triangle_count(), 12);
    }

    #[test]
    fn test_cap_normals_point_out_of_each_half() {
        let cube = cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let (neg, pos) = split(&cube, &Plane::horizontal(0.25)).into_pair();
        let on_cut = |t: &&Triangle| t.vertices.iter().all(|v| (v.z - 0.25).abs() < 1e-12);

        let neg_cap: Vec<&Triangle> = neg.triangles().iter().filter(on_cut).collect();
        assert!(neg_cap.len() >= 2);
        assert!(neg_cap.iter().all(|t| t.normal.z > 0.99));

        let pos_cap: Vec<&Triangle> = pos.triangles().iter().filter(on_cut).collect();
        assert_eq!(pos_cap.len(), neg_cap.len());
        assert!(pos_cap.iter().all(|t| t.normal.z < -0.99));
    }

    #[test]
    fn test_sloped_plane_preserves_volume() {
        let cube = cuboid(Point3::new(-5.0, -5.0, 0.0), Point3::new(5.0, 5.0, 10.0));
        let plane = Plane::from_point_normal(&Point3::new(0.0, 1.0, 0.0), &Vec3::new(0.0, 1.0, 0.36));
        let result = split(&cube, &plane);
        let total = result.negative.signed_volume() + result.positive.signed_volume();
        assert_relative_eq!(total, 1000.0, epsilon = 1e-6);
        assert!(result.negative.signed_volume() > 0.0);
        assert!(result.positive.signed_volume() > 0.0);
    }

    #[test]
    fn test_hole_survives_split() {
        let outer = [
            Point2::new(-3.0, -3.0),
            Point2::new(3.0, -3.0),
            Point2::new(3.0, 3.0),
            Point2::new(-3.0, 3.0),
        ];
        let hole = circle(Point2::origin(), 1.0, 24);
        let hole_area = crate::cap::signed_area(&hole);
        let solid = prism(&outer, &[hole], 0.0, 4.0);

        let result = split(&solid, &Plane::horizontal(1.0));
        assert_relative_eq!(result.negative.signed_volume(), 36.0 - hole_area, epsilon = 1e-6);
        assert_relative_eq!(result.positive.signed_volume(), (36.0 - hole_area) * 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_plane_missing_mesh_gives_empty_half() {
        let cube = cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let result = split(&cube, &Plane::horizontal(-3.0));
        assert!(result.negative.is_empty());
        assert_eq!(result.positive.triangle_count(), 12);
    }

    #[test]
    fn test_plane_through_face_keeps_face() {
        let cube = cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let result = split(&cube, &Plane::horizontal(0.0));
        assert!(result.negative.is_empty());
        assert_relative_eq!(result.positive.signed_volume(), 1.0, epsilon = 1e-12);
    }
}
