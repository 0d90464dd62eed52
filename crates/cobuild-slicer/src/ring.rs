//! Chaining unordered boundary segments into closed rings.

use std::collections::{BTreeMap, VecDeque};

use cobuild_chunker::Path;
use cobuild_kernel_math::{PointKey, Tolerance};
use cobuild_kernel_mesh::LineSegment;

use crate::error::{Result, SlicerError};

/// Endpoint key → indices of the unconsumed segments touching it.
struct EndpointIndex {
    tol: Tolerance,
    by_key: BTreeMap<PointKey, Vec<usize>>,
}

impl EndpointIndex {
    fn new(segments: &[LineSegment], tol: Tolerance) -> Self {
        let mut by_key: BTreeMap<PointKey, Vec<usize>> = BTreeMap::new();
        for (i, s) in segments.iter().enumerate() {
            let (ka, kb) = s.keys(&tol);
            by_key.entry(ka).or_default().push(i);
            if kb != ka {
                by_key.entry(kb).or_default().push(i);
            }
        }
        Self { tol, by_key }
    }

    /// Largest number of segments meeting at one endpoint.
    fn max_degree(&self) -> usize {
        self.by_key.values().map(Vec::len).max().unwrap_or(0)
    }

    fn first(&self) -> Option<usize> {
        self.by_key.values().next().and_then(|v| v.first().copied())
    }

    fn at(&self, key: &PointKey) -> Option<usize> {
        self.by_key.get(key).and_then(|v| v.first().copied())
    }

    fn remove(&mut self, idx: usize, segment: &LineSegment) {
        let (ka, kb) = segment.keys(&self.tol);
        for key in [ka, kb] {
            if let Some(list) = self.by_key.get_mut(&key) {
                list.retain(|&i| i != idx);
                if list.is_empty() {
                    self.by_key.remove(&key);
                }
            }
        }
    }
}

/// Order `segments` into rings of touching segments.
///
/// Each ring is grown from a seed segment at both ends, flipping segments so
/// that every one starts where the previous one ends. A ring becomes a path
/// of every segment's start plus the last segment's end, so a closed ring
/// repeats its first point. Chains that do not close are kept as open
/// paths; an endpoint shared by more than two segments has no unique
/// chaining and is rejected.
pub fn sort_boundary(segments: &[LineSegment]) -> Result<Vec<Path>> {
    if segments.is_empty() {
        return Ok(Vec::new());
    }
    let mut segs = segments.to_vec();
    let tol = Tolerance::DEFAULT;
    let mut index = EndpointIndex::new(&segs, tol);
    let degree = index.max_degree();
    if degree > 2 {
        return Err(SlicerError::MalformedRing {
            segments: segs.len(),
            degree,
        });
    }
    let mut paths = Vec::new();

    while let Some(seed) = index.first() {
        index.remove(seed, &segs[seed]);
        let mut ring: VecDeque<usize> = VecDeque::from([seed]);

        loop {
            let end = tol.key(&segs[ring[ring.len() - 1]].b);
            let Some(next) = index.at(&end) else { break };
            index.remove(next, &segs[next]);
            if tol.key(&segs[next].a) != end {
                segs[next].flip();
            }
            ring.push_back(next);
        }
        loop {
            let start = tol.key(&segs[ring[0]].a);
            let Some(prev) = index.at(&start) else { break };
            index.remove(prev, &segs[prev]);
            if tol.key(&segs[prev].b) != start {
                segs[prev].flip();
            }
            ring.push_front(prev);
        }

        let mut points: Vec<_> = ring.iter().map(|&i| segs[i].a).collect();
        if let Some(&last) = ring.back() {
            points.push(segs[last].b);
        }
        paths.push(Path::new(points));
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::slice_mesh;
    use cobuild_kernel_math::{Point2, Point3};
    use cobuild_kernel_mesh::shapes::{circle, cuboid, prism};

    fn seg(a: (f64, f64), b: (f64, f64)) -> LineSegment {
        LineSegment::new(Point3::new(a.0, a.1, 1.0), Point3::new(b.0, b.1, 1.0))
    }

    fn square(x0: f64) -> Vec<LineSegment> {
        vec![
            seg((x0, 0.0), (x0 + 1.0, 0.0)),
            seg((x0 + 1.0, 1.0), (x0 + 1.0, 0.0)),
            seg((x0, 1.0), (x0 + 1.0, 1.0)),
            seg((x0, 0.0), (x0, 1.0)),
        ]
    }

    #[test]
    fn test_scrambled_square_closes() {
        let paths = sort_boundary(&square(0.0)).unwrap();
        assert_eq!(paths.len(), 1);
        let p = &paths[0].points;
        assert_eq!(p.len(), 5);
        assert_eq!(p.first(), p.last());
        for w in p.windows(2) {
            assert!((w[1] - w[0]).norm() > 0.5);
        }
    }

    #[test]
    fn test_two_rings() {
        let mut segs = square(0.0);
        segs.extend(square(5.0));
        let paths = sort_boundary(&segs).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.len() == 5));
    }

    #[test]
    fn test_open_chain_is_kept() {
        let segs = vec![seg((0.0, 0.0), (1.0, 0.0)), seg((2.0, 0.0), (1.0, 0.0))];
        let paths = sort_boundary(&segs).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 3);
        assert_eq!(paths[0].points[1], Point3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_empty_boundary() {
        assert!(sort_boundary(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_shared_vertex_is_rejected() {
        // Two squares touching at (1, 1): four segments meet there.
        let mut segs = square(0.0);
        segs.extend([
            seg((1.0, 1.0), (2.0, 1.0)),
            seg((2.0, 1.0), (2.0, 2.0)),
            seg((2.0, 2.0), (1.0, 2.0)),
            seg((1.0, 2.0), (1.0, 1.0)),
        ]);
        assert!(matches!(
            sort_boundary(&segs),
            Err(SlicerError::MalformedRing {
                segments: 8,
                degree: 4
            })
        ));
    }

    fn assert_closed_on(paths: &[Path], z: f64) {
        for p in paths {
            assert_eq!(p.points.first(), p.points.last());
            assert!(p.points.iter().all(|q| (q.z - z).abs() < 1e-9));
        }
    }

    /// Shoelace area of a closed path in XY.
    fn area(path: &Path) -> f64 {
        path.points
            .windows(2)
            .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
            .sum::<f64>()
            .abs()
            / 2.0
    }

    #[test]
    fn test_unit_cube_section_is_one_quad() {
        let cube = cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let layers = slice_mesh(&cube, &[0.5]).unwrap();
        let paths = sort_boundary(&layers[0].segments).unwrap();
        assert_eq!(paths.len(), 1);
        assert_closed_on(&paths, 0.5);
        assert!((area(&paths[0]) - 1.0).abs() < 1e-6);
        for q in &paths[0].points {
            let on_x = q.x.abs() < 1e-9 || (q.x - 1.0).abs() < 1e-9;
            let on_y = q.y.abs() < 1e-9 || (q.y - 1.0).abs() < 1e-9;
            assert!(on_x || on_y, "{q:?} is off the square");
        }
    }

    #[test]
    fn test_cube_with_bore_gives_two_rings() {
        let outer = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let bore = circle(Point2::new(5.0, 5.0), 2.0, 24);
        let block = prism(&outer, &[bore], 0.0, 10.0);
        let layers = slice_mesh(&block, &[5.0]).unwrap();
        let mut paths = sort_boundary(&layers[0].segments).unwrap();
        assert_eq!(paths.len(), 2);
        assert_closed_on(&paths, 5.0);

        paths.sort_by(|a, b| area(a).total_cmp(&area(b)));
        assert!((area(&paths[1]) - 100.0).abs() < 1e-6);
        for q in &paths[0].points {
            let r = ((q.x - 5.0).powi(2) + (q.y - 5.0).powi(2)).sqrt();
            assert!(r <= 2.0 + 1e-3 && r > 1.9, "{q:?} is off the bore");
        }
    }
}
