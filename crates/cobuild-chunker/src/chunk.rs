//! Chunks: the unit of work handed to one robot.

use cobuild_kernel_math::{Aabb3, Point3};
use cobuild_kernel_mesh::{shapes, TriangleMesh};
use serde::{Deserialize, Serialize};

use crate::toolpath::{ChunkFrame, Command, Slice};

/// Facets used when an alignment feature is turned into a mesh.
const FEATURE_SEGMENTS: usize = 24;

/// What a chunk covers.
#[derive(Debug, Clone)]
pub enum ChunkGeometry {
    /// A non-empty piece of the model.
    Mesh(TriangleMesh),
    /// Nothing to print; the robot only visits this point.
    Placeholder(Point3),
}

impl ChunkGeometry {
    /// `Mesh` unless `mesh` is empty, in which case a placeholder at `fallback`.
    pub fn from_mesh(mesh: TriangleMesh, fallback: Point3) -> Self {
        if mesh.is_empty() {
            ChunkGeometry::Placeholder(fallback)
        } else {
            ChunkGeometry::Mesh(mesh)
        }
    }
}

/// Which side of a layer interface a feature sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Cone standing on top of the lower chunk.
    Peg,
    /// Matching recess in the bottom of the upper chunk.
    Socket,
}

/// An alignment peg or socket at a vertical layer interface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentFeature {
    /// Peg or socket.
    pub kind: FeatureKind,
    /// Centre of the cone base, on the cut plane.
    pub center: Point3,
    /// Base radius.
    pub radius: f64,
    /// Cone height.
    pub height: f64,
    /// Index of the cut the feature straddles.
    pub cut: usize,
}

impl AlignmentFeature {
    /// Peg of base radius `radius` for a cut at `center.z`.
    pub fn peg(center: Point3, radius: f64, cut: usize) -> Self {
        Self {
            kind: FeatureKind::Peg,
            center,
            radius,
            height: 2.0 * radius,
            cut,
        }
    }

    /// Socket receiving a peg of `radius`, enlarged by `fit`.
    pub fn socket(center: Point3, radius: f64, fit: f64, cut: usize) -> Self {
        let radius = radius * fit;
        Self {
            kind: FeatureKind::Socket,
            center,
            radius,
            height: 2.0 * radius,
            cut,
        }
    }

    /// Cone mesh of the feature.
    pub fn mesh(&self) -> TriangleMesh {
        shapes::cone(self.center, self.radius, self.height, FEATURE_SEGMENTS)
    }
}

/// One printable (or placeholder) piece of the model.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Globally unique chunk number.
    pub number: usize,
    /// Chunks that must finish first, sorted and unique.
    pub dependencies: Vec<usize>,
    /// Owning robot.
    pub robot: usize,
    /// Row index: 0 for the origin row, negative south, positive north.
    pub row: i32,
    /// Vertical layer, 0 unless layered.
    pub layer: usize,
    /// Display color.
    pub color: [u8; 3],
    /// Mesh or placeholder.
    pub geometry: ChunkGeometry,
    /// Pegs and sockets at layer interfaces.
    pub alignment: Vec<AlignmentFeature>,
    /// Toolpaths, filled by the slicer.
    pub slices: Vec<Slice>,
    /// Robot program, filled by the simulator.
    pub commands: Vec<Command>,
    /// Simulation frames, filled by the simulator.
    pub frame_data: Vec<ChunkFrame>,
}

impl Chunk {
    /// Chunk `number` covering `geometry`.
    pub fn new(number: usize, geometry: ChunkGeometry) -> Self {
        Self {
            number,
            dependencies: Vec::new(),
            robot: 0,
            row: 0,
            layer: 0,
            color: [255, 255, 255],
            geometry,
            alignment: Vec::new(),
            slices: Vec::new(),
            commands: Vec::new(),
            frame_data: Vec::new(),
        }
    }

    /// Add one prerequisite.
    pub fn add_dependency(&mut self, number: usize) {
        if let Err(pos) = self.dependencies.binary_search(&number) {
            self.dependencies.insert(pos, number);
        }
    }

    /// Add several prerequisites.
    pub fn add_dependencies(&mut self, numbers: impl IntoIterator<Item = usize>) {
        for n in numbers {
            self.add_dependency(n);
        }
    }

    /// Whether there is nothing to print.
    pub fn is_empty(&self) -> bool {
        match &self.geometry {
            ChunkGeometry::Mesh(mesh) => mesh.is_empty(),
            ChunkGeometry::Placeholder(_) => true,
        }
    }

    /// The mesh, unless this is a placeholder.
    pub fn mesh(&self) -> Option<&TriangleMesh> {
        match &self.geometry {
            ChunkGeometry::Mesh(mesh) => Some(mesh),
            ChunkGeometry::Placeholder(_) => None,
        }
    }

    /// The placeholder point, if any.
    pub fn placeholder(&self) -> Option<Point3> {
        match &self.geometry {
            ChunkGeometry::Mesh(_) => None,
            ChunkGeometry::Placeholder(p) => Some(*p),
        }
    }

    /// Bounds of the mesh, or a degenerate box at the placeholder.
    pub fn bounds(&self) -> Aabb3 {
        match &self.geometry {
            ChunkGeometry::Mesh(mesh) => mesh.bounds(),
            ChunkGeometry::Placeholder(p) => Aabb3::new(*p, *p),
        }
    }

    /// Display name.
    pub fn name(&self) -> String {
        format!("Machine {} Chunk {}", self.robot, self.number)
    }

    /// Peg meshes to print on top of this chunk.
    pub fn peg_meshes(&self) -> impl Iterator<Item = TriangleMesh> + '_ {
        self.alignment
            .iter()
            .filter(|f| f.kind == FeatureKind::Peg)
            .map(AlignmentFeature::mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cobuild_kernel_mesh::shapes::cuboid;

    #[test]
    fn test_dependencies_stay_sorted_and_unique() {
        let mut c = Chunk::new(7, ChunkGeometry::Placeholder(Point3::origin()));
        c.add_dependencies([5, 2, 5, 3]);
        c.add_dependency(2);
        assert_eq!(c.dependencies, vec![2, 3, 5]);
    }

    #[test]
    fn test_empty_mesh_becomes_placeholder() {
        let g = ChunkGeometry::from_mesh(TriangleMesh::new(), Point3::new(1.0, 2.0, 0.0));
        let c = Chunk::new(0, g);
        assert!(c.is_empty());
        assert_eq!(c.placeholder(), Some(Point3::new(1.0, 2.0, 0.0)));

        let solid = cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let c = Chunk::new(1, ChunkGeometry::from_mesh(solid, Point3::origin()));
        assert!(!c.is_empty());
        assert!(c.mesh().is_some());
    }

    #[test]
    fn test_socket_is_enlarged() {
        let peg = AlignmentFeature::peg(Point3::new(0.0, 0.0, 10.0), 2.0, 0);
        let socket = AlignmentFeature::socket(Point3::new(0.0, 0.0, 10.0), 2.0, 1.15, 0);
        assert_relative_eq!(peg.height, 4.0);
        assert_relative_eq!(socket.radius, 2.3);
        assert_relative_eq!(socket.height, 4.6);
    }

    #[test]
    fn test_peg_mesh_sits_on_cut() {
        let mut c = Chunk::new(0, ChunkGeometry::Placeholder(Point3::origin()));
        c.alignment
            .push(AlignmentFeature::peg(Point3::new(1.0, 1.0, 5.0), 1.0, 0));
        c.alignment
            .push(AlignmentFeature::socket(Point3::new(1.0, 1.0, 5.0), 1.0, 1.15, 0));
        let pegs: Vec<TriangleMesh> = c.peg_meshes().collect();
        assert_eq!(pegs.len(), 1);
        let b = pegs[0].bounds();
        assert_relative_eq!(b.min.z, 5.0);
        assert_relative_eq!(b.max.z, 7.0);
    }
}
