//! Planar cap triangulation.
//!
//! Cut loops are recovered from plane/triangle crossings, grouped into outer
//! boundaries and holes by nesting depth, joined into a single polygon with
//! bridge edges and ear-clipped.

use std::collections::BTreeMap;

use cobuild_kernel_math::{Point2, Point3, PointKey, Tolerance};

/// Twice-halved shoelace area; positive for counter-clockwise loops.
pub fn signed_area(ring: &[Point2]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let (p, q) = (ring[i], ring[(i + 1) % n]);
        sum += p.x * q.y - q.x * p.y;
    }
    sum * 0.5
}

/// Even-odd containment test.
pub fn point_in_polygon(p: &Point2, ring: &[Point2]) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Triangulate `outer` minus `holes`.
///
/// Indices address the concatenation `outer ++ holes[0] ++ holes[1] ...`.
/// Input orientation is ignored; every output triangle is counter-clockwise.
pub fn triangulate_polygon(outer: &[Point2], holes: &[&[Point2]]) -> Vec<[usize; 3]> {
    if outer.len() < 3 {
        return Vec::new();
    }

    let mut verts: Vec<Point2> = outer.to_vec();
    let mut poly: Vec<usize> = (0..outer.len()).collect();
    if signed_area(outer) < 0.0 {
        poly.reverse();
    }

    let mut hole_loops: Vec<Vec<usize>> = Vec::with_capacity(holes.len());
    for hole in holes {
        let start = verts.len();
        verts.extend_from_slice(hole);
        if hole.len() < 3 {
            continue;
        }
        let mut idx: Vec<usize> = (start..start + hole.len()).collect();
        if signed_area(hole) > 0.0 {
            idx.reverse();
        }
        hole_loops.push(idx);
    }

    // Rightmost holes first so later bridges see the earlier ones as outline.
    hole_loops.sort_by(|a, b| {
        let max_x = |l: &Vec<usize>| l.iter().map(|&i| verts[i].x).fold(f64::MIN, f64::max);
        max_x(b).total_cmp(&max_x(a))
    });

    for h in 0..hole_loops.len() {
        let hole = &hole_loops[h];
        let pending = &hole_loops[h + 1..];
        let Some((hole_pos, poly_pos)) = find_bridge(&verts, &poly, hole, pending) else {
            tracing::warn!(hole_vertices = hole.len(), "no bridge found for hole, skipping it");
            continue;
        };

        let bridge_outer = poly[poly_pos];
        let rotated: Vec<usize> = (0..hole.len())
            .map(|i| hole[(hole_pos + i) % hole.len()])
            .collect();

        let mut merged = Vec::with_capacity(poly.len() + rotated.len() + 2);
        merged.extend_from_slice(&poly[..=poly_pos]);
        merged.extend_from_slice(&rotated);
        merged.push(rotated[0]);
        merged.push(bridge_outer);
        merged.extend_from_slice(&poly[poly_pos + 1..]);
        poly = merged;
    }

    ear_clip(&verts, poly)
}

/// Triangulate a set of closed loops lying in one plane.
///
/// Nesting depth decides the role of each loop: even depth is an outer
/// boundary, odd depth is a hole of its innermost enclosing boundary.
/// Each output corner is `(loop index, vertex index)`.
pub fn triangulate_nested(loops: &[Vec<Point2>]) -> Vec<[(usize, usize); 3]> {
    let areas: Vec<f64> = loops.iter().map(|l| signed_area(l).abs()).collect();
    let usable: Vec<usize> = (0..loops.len())
        .filter(|&i| loops[i].len() >= 3 && areas[i] > 0.0)
        .collect();

    let containers = |i: usize| -> Vec<usize> {
        let sample = loops[i][0];
        usable
            .iter()
            .copied()
            .filter(|&j| j != i && areas[j] > areas[i] && point_in_polygon(&sample, &loops[j]))
            .collect()
    };

    let mut depth = vec![0usize; loops.len()];
    let mut parent: Vec<Option<usize>> = vec![None; loops.len()];
    for &i in &usable {
        let outside = containers(i);
        depth[i] = outside.len();
        parent[i] = outside
            .into_iter()
            .min_by(|&a, &b| areas[a].total_cmp(&areas[b]));
    }

    let mut out = Vec::new();
    for &i in usable.iter().filter(|&&i| depth[i] % 2 == 0) {
        let children: Vec<usize> = usable
            .iter()
            .copied()
            .filter(|&j| depth[j] % 2 == 1 && parent[j] == Some(i))
            .collect();
        let hole_refs: Vec<&[Point2]> = children.iter().map(|&j| loops[j].as_slice()).collect();

        let mut owner = Vec::with_capacity(loops[i].len());
        owner.extend((0..loops[i].len()).map(|v| (i, v)));
        for &j in &children {
            owner.extend((0..loops[j].len()).map(|v| (j, v)));
        }

        for [a, b, c] in triangulate_polygon(&loops[i], &hole_refs) {
            out.push([owner[a], owner[b], owner[c]]);
        }
    }
    out
}

/// Chain undirected segments into closed loops.
///
/// Endpoints are matched by their lattice key under `tol`. Open chains and
/// loops with fewer than three points are dropped.
pub fn chain_loops(segments: &[(Point3, Point3)], tol: &Tolerance) -> Vec<Vec<Point3>> {
    let keys: Vec<(PointKey, PointKey)> = segments
        .iter()
        .map(|(a, b)| (tol.key(a), tol.key(b)))
        .collect();

    let mut index: BTreeMap<PointKey, Vec<usize>> = BTreeMap::new();
    for (i, (ka, kb)) in keys.iter().enumerate() {
        if ka == kb {
            continue;
        }
        index.entry(*ka).or_default().push(i);
        index.entry(*kb).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut loops = Vec::new();
    let mut open = 0usize;

    for seed in 0..segments.len() {
        if used[seed] || keys[seed].0 == keys[seed].1 {
            continue;
        }
        used[seed] = true;
        let (start_key, mut cursor) = keys[seed];
        let mut points = vec![segments[seed].0, segments[seed].1];
        let mut closed = false;

        for _ in 0..segments.len() {
            if cursor == start_key {
                closed = true;
                break;
            }
            let next = index
                .get(&cursor)
                .and_then(|c| c.iter().copied().find(|&s| !used[s]));
            let Some(s) = next else {
                break;
            };
            used[s] = true;
            let (ka, _) = keys[s];
            let (p, k) = if ka == cursor {
                (segments[s].1, keys[s].1)
            } else {
                (segments[s].0, keys[s].0)
            };
            points.push(p);
            cursor = k;
        }

        if closed {
            points.pop();
            if points.len() >= 3 {
                loops.push(points);
            }
        } else {
            open += 1;
        }
    }

    if open > 0 {
        tracing::debug!(open, closed = loops.len(), "discarded open cut chains");
    }
    loops
}

fn find_bridge(
    verts: &[Point2],
    poly: &[usize],
    hole: &[usize],
    pending: &[Vec<usize>],
) -> Option<(usize, usize)> {
    let mut candidates: Vec<(f64, usize, usize)> = Vec::with_capacity(hole.len() * poly.len());
    for (hi, &h) in hole.iter().enumerate() {
        for (pi, &p) in poly.iter().enumerate() {
            candidates.push(((verts[h] - verts[p]).norm_squared(), hi, pi));
        }
    }
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let edges = |ring: &[usize]| -> Vec<(usize, usize)> {
        (0..ring.len())
            .map(|i| (ring[i], ring[(i + 1) % ring.len()]))
            .collect()
    };
    let mut blockers = edges(poly);
    blockers.extend(edges(hole));
    for other in pending {
        blockers.extend(edges(other));
    }

    let clear = |h: usize, p: usize| {
        let (a, b) = (verts[h], verts[p]);
        blockers
            .iter()
            .all(|&(c, d)| !segments_cross(&a, &b, &verts[c], &verts[d]))
    };

    candidates
        .iter()
        .find(|&&(_, hi, pi)| clear(hole[hi], poly[pi]))
        .or_else(|| candidates.first())
        .map(|&(_, hi, pi)| (hi, pi))
}

fn ear_clip(verts: &[Point2], mut remaining: Vec<usize>) -> Vec<[usize; 3]> {
    let mut out = Vec::with_capacity(remaining.len().saturating_sub(2));

    while remaining.len() > 3 {
        let n = remaining.len();
        let mut clipped = false;

        for i in 0..n {
            let prev = (i + n - 1) % n;
            let next = (i + 1) % n;
            let (a, b, c) = (
                verts[remaining[prev]],
                verts[remaining[i]],
                verts[remaining[next]],
            );
            if cross(&a, &b, &c) <= 0.0 {
                continue;
            }
            let blocked = (0..n)
                .filter(|&j| j != prev && j != i && j != next)
                .any(|j| point_in_triangle(&verts[remaining[j]], &a, &b, &c));
            if !blocked {
                out.push([remaining[prev], remaining[i], remaining[next]]);
                remaining.remove(i);
                clipped = true;
                break;
            }
        }

        if clipped {
            continue;
        }

        // Flat vertices contribute no area.
        let flat = (0..n).find(|&i| {
            let prev = (i + n - 1) % n;
            let next = (i + 1) % n;
            cross(
                &verts[remaining[prev]],
                &verts[remaining[i]],
                &verts[remaining[next]],
            )
            .abs()
                < 1e-12
        });
        match flat {
            Some(i) => {
                remaining.remove(i);
            }
            None => {
                tracing::warn!(remaining = n, "ear clipping stalled, closing with a fan");
                for k in 1..n - 1 {
                    out.push([remaining[0], remaining[k], remaining[k + 1]]);
                }
                return out;
            }
        }
    }

    if remaining.len() == 3 {
        let (a, b, c) = (verts[remaining[0]], verts[remaining[1]], verts[remaining[2]]);
        if cross(&a, &b, &c).abs() > 1e-12 {
            out.push([remaining[0], remaining[1], remaining[2]]);
        }
    }
    out
}

fn cross(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn point_in_triangle(p: &Point2, a: &Point2, b: &Point2, c: &Point2) -> bool {
    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;

    let dot00 = v0.dot(&v0);
    let dot01 = v0.dot(&v1);
    let dot02 = v0.dot(&v2);
    let dot11 = v1.dot(&v1);
    let dot12 = v1.dot(&v2);

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < f64::EPSILON {
        return false;
    }
    let u = (dot11 * dot02 - dot01 * dot12) / denom;
    let v = (dot00 * dot12 - dot01 * dot02) / denom;

    let eps = 1e-10;
    u > eps && v > eps && (u + v) < 1.0 - eps
}

/// Proper crossing: the segments intersect at a point interior to both.
fn segments_cross(a: &Point2, b: &Point2, c: &Point2, d: &Point2) -> bool {
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}
