//! Closed primitive meshes: boxes, cones and extruded outlines.

use std::f64::consts::TAU;

use cobuild_kernel_math::{Point2, Point3, Vec3};

use crate::cap::triangulate_polygon;
use crate::mesh::TriangleMesh;
use crate::triangle::Triangle;

/// Axis-aligned box spanning `min` to `max`, outward normals.
pub fn cuboid(min: Point3, max: Point3) -> TriangleMesh {
    let v = [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];
    #[rustfmt::skip]
    let indices: [[usize; 3]; 12] = [
        [0, 2, 1], [0, 3, 2],
        [4, 5, 6], [4, 6, 7],
        [0, 1, 5], [0, 5, 4],
        [2, 3, 7], [2, 7, 6],
        [0, 4, 7], [0, 7, 3],
        [1, 2, 6], [1, 6, 5],
    ];
    TriangleMesh::from_triangles(
        indices
            .iter()
            .map(|[a, b, c]| Triangle::new(v[*a], v[*b], v[*c]))
            .collect(),
    )
}

/// Right circular cone standing on `base_center`, apex `height` above it.
pub fn cone(base_center: Point3, radius: f64, height: f64, segments: usize) -> TriangleMesh {
    let segments = segments.max(3);
    let apex = base_center + Vec3::new(0.0, 0.0, height);
    let rim: Vec<Point3> = (0..segments)
        .map(|i| {
            let a = TAU * i as f64 / segments as f64;
            Point3::new(
                base_center.x + radius * a.cos(),
                base_center.y + radius * a.sin(),
                base_center.z,
            )
        })
        .collect();

    let mut mesh = TriangleMesh::new();
    for i in 0..segments {
        let (p, q) = (rim[i], rim[(i + 1) % segments]);
        mesh.push(Triangle::new(p, q, apex));
        mesh.push(Triangle::new(base_center, q, p));
    }
    mesh
}

/// Extrude a planar outline with holes between `z0` and `z1`.
///
/// Loop orientation does not matter; outer walls face away from the solid
/// and hole walls face into the hole.
pub fn prism(outer: &[Point2], holes: &[Vec<Point2>], z0: f64, z1: f64) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    let outer_ccw = oriented(outer, true);
    add_walls(&mut mesh, &outer_ccw, z0, z1);
    for hole in holes {
        add_walls(&mut mesh, &oriented(hole, false), z0, z1);
    }

    let hole_refs: Vec<&[Point2]> = holes.iter().map(Vec::as_slice).collect();
    let all: Vec<Point2> = outer
        .iter()
        .chain(holes.iter().flatten())
        .copied()
        .collect();
    for [a, b, c] in triangulate_polygon(outer, &hole_refs) {
        let lift = |p: Point2, z: f64| Point3::new(p.x, p.y, z);
        mesh.push(Triangle::new(lift(all[a], z1), lift(all[b], z1), lift(all[c], z1)));
        mesh.push(Triangle::new(lift(all[a], z0), lift(all[c], z0), lift(all[b], z0)));
    }
    mesh
}

/// Regular polygon approximating a circle, counter-clockwise.
pub fn circle(center: Point2, radius: f64, segments: usize) -> Vec<Point2> {
    (0..segments.max(3))
        .map(|i| {
            let a = TAU * i as f64 / segments.max(3) as f64;
            Point2::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

fn add_walls(mesh: &mut TriangleMesh, ring: &[Point2], z0: f64, z1: f64) {
    let n = ring.len();
    for i in 0..n {
        let (p, q) = (ring[i], ring[(i + 1) % n]);
        let p0 = Point3::new(p.x, p.y, z0);
        let q0 = Point3::new(q.x, q.y, z0);
        let q1 = Point3::new(q.x, q.y, z1);
        let p1 = Point3::new(p.x, p.y, z1);
        mesh.push(Triangle::new(p0, q0, q1));
        mesh.push(Triangle::new(p0, q1, p1));
    }
}

fn oriented(ring: &[Point2], ccw: bool) -> Vec<Point2> {
    let mut out = ring.to_vec();
    if (crate::cap::signed_area(ring) > 0.0) != ccw {
        out.reverse();
    }
    out
}
