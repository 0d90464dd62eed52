//! Line segments used while assembling rings and infill spans.

use cobuild_kernel_math::{round_point, Point3, PointKey, Tolerance};

/// A directed segment from `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    /// Start point.
    pub a: Point3,
    /// End point.
    pub b: Point3,
}

impl LineSegment {
    /// New segment from `a` to `b`.
    pub fn new(a: Point3, b: Point3) -> Self {
        Self { a, b }
    }

    /// Swap the endpoints in place.
    pub fn flip(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
    }

    /// Copy with swapped endpoints.
    pub fn flipped(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
        }
    }

    /// Pull both endpoints toward each other by `inset` along Y.
    ///
    /// Infill spans run along Y, so this trims them away from the ring they
    /// were cut from. A span shorter than `2 * inset` collapses onto its
    /// midpoint instead of turning inside out.
    pub fn shrink(&mut self, inset: f64) {
        if (self.a.y - self.b.y).abs() < 2.0 * inset {
            let mid = (self.a.y + self.b.y) / 2.0;
            self.a.y = mid;
            self.b.y = mid;
        } else if self.a.y > self.b.y {
            self.a.y -= inset;
            self.b.y += inset;
        } else {
            self.a.y += inset;
            self.b.y -= inset;
        }
    }

    /// Round both endpoints to `places` decimals.
    pub fn simplify(&mut self, places: u32) {
        self.a = round_point(&self.a, places);
        self.b = round_point(&self.b, places);
    }

    /// Rounded copy.
    pub fn simplified(&self, places: u32) -> Self {
        let mut out = *self;
        out.simplify(places);
        out
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    /// Lattice keys of `(a, b)` under `tol`.
    pub fn keys(&self, tol: &Tolerance) -> (PointKey, PointKey) {
        (tol.key(&self.a), tol.key(&self.b))
    }

    /// Crossing of this segment with the vertical plane `X = x`.
    ///
    /// Uses the half-open rule `(a.x < x) != (b.x < x)`, so a vertex lying
    /// exactly on the sweep is counted once by the pair of edges sharing it and
    /// segments parallel to the sweep are never counted. The returned point
    /// keeps the start point's Z.
    pub fn cross_at_x(&self, x: f64) -> Option<Point3> {
        if (self.a.x < x) == (self.b.x < x) {
            return None;
        }
        let dx = self.b.x - self.a.x;
        let t = (x - self.a.x) / dx;
        Some(Point3::new(x, self.a.y + t * (self.b.y - self.a.y), self.a.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flip() {
        let mut s = LineSegment::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        s.flip();
        assert_eq!(s.a, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(s.flipped().a, Point3::origin());
    }

    #[test]
    fn test_shrink_descending_and_ascending() {
        let mut down = LineSegment::new(Point3::new(0.0, 5.0, 0.0), Point3::new(0.0, 1.0, 0.0));
        down.shrink(0.5);
        assert_relative_eq!(down.a.y, 4.5);
        assert_relative_eq!(down.b.y, 1.5);

        let mut up = LineSegment::new(Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 5.0, 0.0));
        up.shrink(0.5);
        assert_relative_eq!(up.a.y, 1.5);
        assert_relative_eq!(up.b.y, 4.5);
    }

    #[test]
    fn test_shrink_short_span_collapses() {
        let mut s = LineSegment::new(Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 1.4, 0.0));
        s.shrink(0.5);
        assert_relative_eq!(s.a.y, 1.2);
        assert_relative_eq!(s.b.y, 1.2);
    }

    #[test]
    fn test_simplify_rounds() {
        let s = LineSegment::new(Point3::new(0.12345, 0.0, 0.0), Point3::new(1.0, 2.00049, 0.0));
        let r = s.simplified(3);
        assert_relative_eq!(r.a.x, 0.123);
        assert_relative_eq!(r.b.y, 2.0);
    }

    #[test]
    fn test_cross_at_x() {
        let s = LineSegment::new(Point3::new(0.0, 0.0, 1.0), Point3::new(2.0, 4.0, 1.0));
        let p = s.cross_at_x(1.0).unwrap();
        assert_relative_eq!(p.y, 2.0);
        assert_relative_eq!(p.z, 1.0);
        assert!(s.cross_at_x(3.0).is_none());

        let vertical = LineSegment::new(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 4.0, 0.0));
        assert!(vertical.cross_at_x(1.0).is_none());
    }
}
