//! Mesh slicing: intersect a chunk with horizontal planes and fill each
//! section.

use rayon::prelude::*;

use cobuild_chunker::{Chunk, Path, Slice};
use cobuild_kernel_math::{Point3, Tolerance};
use cobuild_kernel_mesh::{LineSegment, Plane, PlaneIntersection, TriangleMesh};

use crate::error::{Result, SlicerError};
use crate::infill::fill_rings;
use crate::ring::sort_boundary;
use crate::SliceSettings;

/// Boundary segments of one layer.
#[derive(Debug, Clone)]
pub struct SliceLayer {
    /// Z height of the plane.
    pub z: f64,
    /// Layer index (0 = bottom).
    pub index: usize,
    /// Rounded intersection segments, unordered.
    pub segments: Vec<LineSegment>,
    /// Triangles that straddled the plane without giving a segment.
    pub degenerate: usize,
}

/// Counts from slicing one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceReport {
    /// Layers produced.
    pub layers: usize,
    /// Paths produced, perimeters and infill together.
    pub paths: usize,
    /// Degenerate triangle intersections skipped.
    pub degenerate: usize,
    /// Layers left empty because their boundary did not close.
    pub malformed: usize,
}

impl SliceReport {
    fn absorb(&mut self, other: SliceReport) {
        self.layers += other.layers;
        self.paths += other.paths;
        self.degenerate += other.degenerate;
        self.malformed += other.malformed;
    }
}

/// Plane heights for a mesh spanning `z0..z0 + height`.
///
/// `1 + floor(height / t)` planes at `z0 + i·t`, except the last one, which
/// sits half a layer above the one before it. A mesh thinner than one layer
/// gets a single plane at mid-height.
pub fn layer_heights(z0: f64, height: f64, t: f64) -> Vec<f64> {
    if !(t > 0.0) || !(height >= 0.0) {
        return Vec::new();
    }
    let n = 1 + (height / t).floor() as usize;
    if n == 1 {
        return vec![z0 + height / 2.0];
    }
    (0..n)
        .map(|i| {
            if i == n - 1 {
                z0 + (i as f64 - 1.0) * t + t / 2.0
            } else {
                z0 + i as f64 * t
            }
        })
        .collect()
}

/// Intersect `mesh` with a horizontal plane at each of `heights`.
///
/// Layers are computed in parallel and returned in input order.
pub fn slice_mesh(mesh: &TriangleMesh, heights: &[f64]) -> Result<Vec<SliceLayer>> {
    if mesh.is_empty() {
        return Err(SlicerError::EmptyMesh);
    }
    let places = Tolerance::DEFAULT.round_places;
    let layers = heights
        .par_iter()
        .enumerate()
        .map(|(index, &z)| slice_at_z(mesh, z, index, places))
        .collect();
    Ok(layers)
}

fn slice_at_z(mesh: &TriangleMesh, z: f64, index: usize, places: u32) -> SliceLayer {
    let plane = Plane::horizontal(z);
    let mut segments = Vec::new();
    let mut degenerate = 0;
    for tri in mesh.triangles() {
        let (lo, hi) = tri.z_range();
        if hi < z || lo > z {
            continue;
        }
        match tri.intersect_plane(&plane) {
            PlaneIntersection::Segment(s) => segments.push(s.simplified(places)),
            PlaneIntersection::Degenerate => degenerate += 1,
            PlaneIntersection::Back | PlaneIntersection::Front => {}
        }
    }
    SliceLayer {
        z,
        index,
        segments,
        degenerate,
    }
}

/// Rings and infill for one layer. A boundary that does not close leaves
/// the layer empty.
fn fill_layer(chunk: usize, layer: &SliceLayer, inset: f64) -> (Slice, bool) {
    match sort_boundary(&layer.segments) {
        Ok(rings) => {
            let paths = fill_rings(&rings, inset);
            (Slice { z: layer.z, paths }, false)
        }
        Err(err) => {
            tracing::warn!(chunk, z = layer.z, %err, "skipping layer");
            (
                Slice {
                    z: layer.z,
                    paths: Vec::new(),
                },
                true,
            )
        }
    }
}

/// Slice `chunk` into `chunk.slices`.
///
/// A placeholder chunk gets one slice holding a single-point path at its
/// location, so the robot still travels there.
pub fn slice_chunk(chunk: &mut Chunk, settings: &SliceSettings) -> Result<SliceReport> {
    settings.validate()?;

    let Some(mesh) = chunk.mesh() else {
        let at = chunk.placeholder().unwrap_or_else(Point3::origin);
        chunk.slices = vec![Slice {
            z: at.z,
            paths: vec![Path::single(at)],
        }];
        return Ok(SliceReport {
            layers: 1,
            paths: 1,
            ..SliceReport::default()
        });
    };

    let bounds = mesh.bounds();
    let heights = layer_heights(bounds.min.z, bounds.height(), settings.slice_thickness);
    let layers = slice_mesh(mesh, &heights)?;
    let inset = settings.inset();

    let mut report = SliceReport {
        layers: layers.len(),
        ..SliceReport::default()
    };
    let mut slices = Vec::with_capacity(layers.len());
    for layer in &layers {
        report.degenerate += layer.degenerate;
        let (slice, malformed) = fill_layer(chunk.number, layer, inset);
        report.paths += slice.paths.len();
        report.malformed += usize::from(malformed);
        slices.push(slice);
    }
    if report.degenerate > 0 {
        tracing::warn!(
            chunk = chunk.number,
            count = report.degenerate,
            "skipped degenerate triangle intersections"
        );
    }
    tracing::debug!(
        chunk = chunk.number,
        layers = report.layers,
        paths = report.paths,
        "sliced chunk"
    );
    chunk.slices = slices;
    Ok(report)
}

/// Lowest point over every path of `chunk`.
fn min_path_z(chunk: &Chunk) -> Option<f64> {
    chunk
        .slices
        .iter()
        .flat_map(|s| s.paths.iter())
        .flat_map(|p| p.points.iter())
        .map(|p| p.z)
        .reduce(f64::min)
}

/// Slice every chunk, then shift all paths so the lowest point overall sits
/// at Z = 0. Paths already above zero are not lifted.
#[tracing::instrument(skip_all)]
pub fn slice_chunks<'a>(
    chunks: impl IntoIterator<Item = &'a mut Chunk>,
    settings: &SliceSettings,
) -> Result<SliceReport> {
    let mut chunks: Vec<&mut Chunk> = chunks.into_iter().collect();
    let mut report = SliceReport::default();
    let mut min_z = 0.0f64;
    for chunk in chunks.iter_mut() {
        report.absorb(slice_chunk(chunk, settings)?);
        if let Some(z) = min_path_z(chunk) {
            min_z = min_z.min(z);
        }
    }
    if min_z < 0.0 {
        for chunk in chunks.iter_mut() {
            for slice in &mut chunk.slices {
                slice.z -= min_z;
                for path in &mut slice.paths {
                    path.offset_z(-min_z);
                }
            }
        }
    }
    tracing::info!(
        layers = report.layers,
        paths = report.paths,
        degenerate = report.degenerate,
        malformed = report.malformed,
        shift = -min_z,
        "sliced chunks"
    );
    Ok(report)
}
