//! Triangles and triangle/plane intersection.

use cobuild_kernel_math::{Point3, Vec3};

use crate::plane::Plane;
use crate::segment::LineSegment;

/// A triangle with an outward unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Vertex positions, counter-clockwise seen from outside.
    pub vertices: [Point3; 3],
    /// Outward unit normal.
    pub normal: Vec3,
}

/// Result of intersecting a triangle with a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaneIntersection {
    /// All three vertices are strictly behind the plane.
    Back,
    /// All three vertices are on or in front of the plane.
    Front,
    /// The plane cuts the triangle along this segment.
    Segment(LineSegment),
    /// The triangle straddles the plane but does not yield two distinct
    /// points (touching at one vertex, or malformed input).
    Degenerate,
}

impl Triangle {
    /// Triangle with its normal computed from the winding of `v0, v1, v2`.
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Self {
        let n = (v1 - v0).cross(&(v2 - v0));
        let normal = n.try_normalize(1e-15).unwrap_or_else(Vec3::z);
        Self {
            vertices: [v0, v1, v2],
            normal,
        }
    }

    /// Triangle with an explicit normal (as read from STL).
    pub fn with_normal(vertices: [Point3; 3], normal: Vec3) -> Self {
        Self { vertices, normal }
    }

    /// Reverse the winding and the normal.
    pub fn flipped(&self) -> Self {
        Self {
            vertices: [self.vertices[0], self.vertices[2], self.vertices[1]],
            normal: -self.normal,
        }
    }

    /// Triangle area.
    pub fn area(&self) -> f64 {
        let [a, b, c] = self.vertices;
        (b - a).cross(&(c - a)).norm() * 0.5
    }

    /// Minimum and maximum Z of the vertices.
    pub fn z_range(&self) -> (f64, f64) {
        let zs = self.vertices.map(|v| v.z);
        (
            zs[0].min(zs[1]).min(zs[2]),
            zs[0].max(zs[1]).max(zs[2]),
        )
    }

    /// Intersect with `plane`.
    ///
    /// Vertices with a non-negative signed distance count as front. When the
    /// vertices are split between sides, each edge whose endpoints have
    /// opposite signs contributes its interpolated zero crossing, and an
    /// endpoint lying exactly on the plane is accepted as-is, up to two points.
    pub fn intersect_plane(&self, plane: &Plane) -> PlaneIntersection {
        let d = self.vertices.map(|v| plane.signed_distance(&v));
        let back = d.iter().filter(|&&x| x < 0.0).count();
        if back == 3 {
            return PlaneIntersection::Back;
        }
        if back == 0 {
            return PlaneIntersection::Front;
        }

        let mut points: Vec<Point3> = Vec::with_capacity(2);
        for (i, j) in [(0, 1), (1, 2), (2, 0)] {
            let (da, db) = (d[i], d[j]);
            let (a, b) = (self.vertices[i], self.vertices[j]);
            if da * db < 0.0 {
                let s = da / (da - db);
                points.push(a + (b - a) * s);
            } else if da == 0.0 && points.len() < 2 {
                points.push(a);
            } else if db == 0.0 && points.len() < 2 {
                points.push(b);
            }
        }

        match points.as_slice() {
            [p, q] if p != q => PlaneIntersection::Segment(LineSegment::new(*p, *q)),
            _ => PlaneIntersection::Degenerate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tri() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 2.0),
            Point3::new(0.0, 2.0, 2.0),
        )
    }

    #[test]
    fn test_normal_from_winding() {
        let t = Triangle::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(t.normal.z, 1.0);
        assert_relative_eq!(t.flipped().normal.z, -1.0);
        assert_relative_eq!(t.area(), 0.5);
    }

    #[test]
    fn test_entirely_back_or_front() {
        assert_eq!(tri().intersect_plane(&Plane::horizontal(5.0)), PlaneIntersection::Back);
        assert_eq!(tri().intersect_plane(&Plane::horizontal(-1.0)), PlaneIntersection::Front);
        // Touching from above counts as front.
        assert_eq!(tri().intersect_plane(&Plane::horizontal(0.0)), PlaneIntersection::Front);
    }

    #[test]
    fn test_crossing_segment() {
        match tri().intersect_plane(&Plane::horizontal(1.0)) {
            PlaneIntersection::Segment(s) => {
                assert_relative_eq!(s.a.z, 1.0);
                assert_relative_eq!(s.b.z, 1.0);
                assert_relative_eq!(s.length(), 2f64.sqrt(), epsilon = 1e-12);
            }
            other => panic!("expected segment, got {other:?}"),
        }
    }

    #[test]
    fn test_edge_on_plane_from_below() {
        let t = Triangle::new(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 0.0),
        );
        match t.intersect_plane(&Plane::horizontal(1.0)) {
            PlaneIntersection::Segment(s) => assert_relative_eq!(s.length(), 1.0),
            other => panic!("expected segment, got {other:?}"),
        }
    }

    #[test]
    fn test_single_vertex_touch_is_degenerate() {
        let t = Triangle::new(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert_eq!(t.intersect_plane(&Plane::horizontal(1.0)), PlaneIntersection::Degenerate);
    }
}
