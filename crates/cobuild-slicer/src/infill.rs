//! Solid zig-zag infill of closed rings.
//!
//! The ring is swept with vertical lines `X = x` one inset apart. Each sweep
//! crosses the ring an even number of times; consecutive crossings pair up
//! into spans. Spans with the same index on consecutive sweeps are joined
//! into one zig-zag path until the number of crossings changes.

use cobuild_chunker::Path;
use cobuild_kernel_math::Point3;
use cobuild_kernel_mesh::LineSegment;

/// Sweeps closer than this to the ring's X extremes are dropped.
const EDGE_TOLERANCE: f64 = 1e-9;

/// X positions of the sweep lines over `ring`.
///
/// One line `inset` left of the ring, then lines from the left edge every
/// `inset` while within `inset` of the right edge.
pub fn sweep_lines(ring: &Path, inset: f64) -> Vec<f64> {
    sweeps_over(std::slice::from_ref(ring), inset)
}

fn sweeps_over(rings: &[Path], inset: f64) -> Vec<f64> {
    let extent = rings
        .iter()
        .filter_map(|r| x_extent(&r.points))
        .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)));
    let Some((left, right)) = extent else {
        return Vec::new();
    };
    if !(inset > 0.0) {
        return Vec::new();
    }
    let mut xs = vec![left - inset];
    let mut k = 0u32;
    loop {
        let x = left + f64::from(k) * inset;
        if x > right + inset {
            break;
        }
        xs.push(x);
        k += 1;
    }
    xs
}

/// Crossings of the ring's edges with `X = x`, sorted by Y.
///
/// Each crossing keeps the Z of its edge's start point. Vertical edges never
/// cross, and a sweep within tolerance of the ring's X extremes crosses
/// nothing.
pub fn crossings(points: &[Point3], x: f64) -> Vec<Point3> {
    let Some((left, right)) = x_extent(points) else {
        return Vec::new();
    };
    if (x - left).abs() <= EDGE_TOLERANCE || (x - right).abs() <= EDGE_TOLERANCE {
        return Vec::new();
    }
    let mut out: Vec<Point3> = points
        .windows(2)
        .filter_map(|w| LineSegment::new(w[0], w[1]).cross_at_x(x))
        .collect();
    out.sort_by(|p, q| p.y.total_cmp(&q.y));
    out
}

/// Zig-zag infill paths for `ring`, inset by `inset` from its Y walls.
pub fn generate_infill(ring: &Path, inset: f64) -> Vec<Path> {
    generate_region_infill(std::slice::from_ref(ring), inset)
}

/// Zig-zag infill of the region bounded by all of `rings` together.
///
/// Crossings of every ring are merged on each sweep, so a ring lying inside
/// another one is left unfilled.
pub fn generate_region_infill(rings: &[Path], inset: f64) -> Vec<Path> {
    let mut paths = Vec::new();
    let mut groups: Vec<Vec<LineSegment>> = Vec::new();
    let mut last = 0usize;

    for x in sweeps_over(rings, inset) {
        let mut hits: Vec<Point3> = rings
            .iter()
            .flat_map(|r| crossings(&r.points, x))
            .collect();
        hits.sort_by(|p, q| p.y.total_cmp(&q.y));
        let n = hits.len();
        if n != last && last != 0 {
            paths.extend(groups.drain(..).map(|g| build_path(g, inset)));
        }
        for (i, pair) in hits.chunks_exact(2).enumerate() {
            if i >= groups.len() {
                groups.resize_with(i + 1, Vec::new);
            }
            groups[i].push(LineSegment::new(pair[0], pair[1]));
        }
        last = n;
    }
    paths.extend(groups.into_iter().filter(|g| !g.is_empty()).map(|g| build_path(g, inset)));
    paths
}

/// Join parallel spans into one path, reversing every other span and
/// trimming each by `inset` at both ends.
pub fn build_path(mut spans: Vec<LineSegment>, inset: f64) -> Path {
    let mut points = Vec::with_capacity(spans.len() * 2);
    for (i, span) in spans.iter_mut().enumerate() {
        if i % 2 == 1 {
            span.flip();
        }
        span.shrink(inset);
        points.push(span.a);
        points.push(span.b);
    }
    Path::new(points)
}

/// `ring` followed by its infill. An empty ring fills to nothing.
pub fn fill_ring(ring: &Path, inset: f64) -> Vec<Path> {
    if ring.is_empty() {
        return Vec::new();
    }
    let mut out = vec![ring.clone()];
    out.extend(generate_infill(ring, inset));
    out
}

/// Every non-empty ring of a layer, then the infill of the region they
/// bound together.
pub fn fill_rings(rings: &[Path], inset: f64) -> Vec<Path> {
    let rings: Vec<Path> = rings.iter().filter(|r| !r.is_empty()).cloned().collect();
    let mut out = rings.clone();
    out.extend(generate_region_infill(&rings, inset));
    out
}

fn x_extent(points: &[Point3]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }
    Some(points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.x), hi.max(p.x))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cobuild_kernel_math::Point2;
    use cobuild_kernel_mesh::cap::point_in_polygon;

    fn ring(pts: &[(f64, f64)]) -> Path {
        let mut points: Vec<Point3> = pts.iter().map(|&(x, y)| Point3::new(x, y, 2.0)).collect();
        points.push(points[0]);
        Path::new(points)
    }

    #[test]
    fn test_sweep_lines() {
        let r = ring(&[(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (0.0, 1.0)]);
        let xs = sweep_lines(&r, 0.5);
        assert_eq!(xs, vec![-0.5, 0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
    }

    #[test]
    fn test_square_fills_with_one_zigzag() {
        let r = ring(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        let paths = generate_infill(&r, 0.5);
        assert_eq!(paths.len(), 1);
        let p = &paths[0].points;
        // Sweeps at 0.5, 1.0 and 1.5 each give one span.
        assert_eq!(p.len(), 6);
        assert_relative_eq!(p[0].y, 0.5);
        assert_relative_eq!(p[1].y, 1.5);
        assert_relative_eq!(p[2].y, 1.5);
        assert_relative_eq!(p[3].y, 0.5);
        assert!(p.iter().all(|q| q.z == 2.0));
    }

    #[test]
    fn test_crossing_count_change_splits_paths() {
        // A C shape open toward +X: two crossings left of the slot, four
        // beside it.
        let r = ring(&[
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (3.0, 2.0),
            (3.0, 3.0),
            (0.0, 3.0),
        ]);
        let paths = generate_infill(&r, 0.25);
        assert_eq!(paths.len(), 3);
    }

    /// Inside `outer`, outside every hole and off every edge.
    fn strictly_inside(p: &Point3, outer: &[(f64, f64)], holes: &[&[(f64, f64)]]) -> bool {
        let poly = |pts: &[(f64, f64)]| -> Vec<Point2> {
            pts.iter().map(|&(x, y)| Point2::new(x, y)).collect()
        };
        let q = Point2::new(p.x, p.y);
        let off_edges = |pts: &[(f64, f64)]| {
            let ring = poly(pts);
            (0..ring.len()).all(|i| {
                let (a, b) = (ring[i], ring[(i + 1) % ring.len()]);
                let ab = b - a;
                let t = ((q - a).dot(&ab) / ab.norm_squared()).clamp(0.0, 1.0);
                (a + ab * t - q).norm() > 1e-9
            })
        };
        point_in_polygon(&q, &poly(outer))
            && holes.iter().all(|h| !point_in_polygon(&q, &poly(h)))
            && off_edges(outer)
            && holes.iter().all(|h| off_edges(h))
    }

    #[test]
    fn test_infill_stays_strictly_inside() {
        let square: &[(f64, f64)] = &[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)];
        let ell: &[(f64, f64)] = &[
            (0.0, 0.0),
            (3.1, 0.0),
            (3.1, 1.1),
            (1.1, 1.1),
            (1.1, 3.1),
            (0.0, 3.1),
        ];
        let outer: &[(f64, f64)] = &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)];
        let hole: &[(f64, f64)] = &[(1.1, 1.1), (2.45, 1.1), (2.45, 2.45), (1.1, 2.45)];

        for shape in [square, ell] {
            let paths = generate_infill(&ring(shape), 0.3);
            assert!(!paths.is_empty());
            for p in paths.iter().flat_map(|p| p.points.iter()) {
                assert!(strictly_inside(p, shape, &[]), "{p:?} escapes {shape:?}");
            }
        }

        let layer = fill_rings(&[ring(outer), ring(hole)], 0.3);
        assert_eq!(layer[0], ring(outer));
        assert_eq!(layer[1], ring(hole));
        let infill = &layer[2..];
        assert!(infill.len() >= 3, "fill splits around the hole");
        for p in infill.iter().flat_map(|p| p.points.iter()) {
            assert!(strictly_inside(p, outer, &[hole]), "{p:?} escapes the holed square");
        }
    }

    #[test]
    fn test_short_span_collapses() {
        let spans = vec![LineSegment::new(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.5, 0.0))];
        let p = build_path(spans, 0.5);
        assert_relative_eq!(p.points[0].y, 0.25);
        assert_relative_eq!(p.points[1].y, 0.25);
    }

    #[test]
    fn test_fill_ring_keeps_outline_first() {
        let r = ring(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        let out = fill_ring(&r, 0.5);
        assert_eq!(out[0], r);
        assert!(out.len() > 1);
        assert!(fill_ring(&Path::default(), 0.5).is_empty());
    }
}
