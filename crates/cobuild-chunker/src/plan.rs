//! A finished chunk plan: robots with their queues, plus layer information.

use std::collections::{BTreeMap, HashMap};

use cobuild_kernel_math::Point3;

use crate::chunk::{AlignmentFeature, Chunk};
use crate::error::{ChunkerError, Result};
use crate::graph::DependencyGraph;
use crate::robot::Robot;

/// Output of chunking.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    /// Robots, indexed by robot number.
    pub robots: Vec<Robot>,
    /// Top Z of each vertical layer, bottom first. One entry when the model
    /// was not layered.
    pub layer_tops: Vec<f64>,
}

impl ChunkPlan {
    /// Plan over `robots` with a single layer ending at `top`.
    pub fn new(robots: Vec<Robot>, top: f64) -> Self {
        Self {
            robots,
            layer_tops: vec![top],
        }
    }

    /// All chunks, robot by robot.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.robots.iter().flat_map(|r| r.chunks.iter())
    }

    /// Total number of chunks.
    pub fn chunk_count(&self) -> usize {
        self.robots.iter().map(|r| r.chunks.len()).sum()
    }

    /// Chunk with `number`.
    pub fn chunk(&self, number: usize) -> Option<&Chunk> {
        self.chunks().find(|c| c.number == number)
    }

    /// Dependency graph of every chunk.
    pub fn graph(&self) -> Result<DependencyGraph> {
        DependencyGraph::from_chunks(self.chunks())
    }

    /// Fail on duplicate numbers, unknown prerequisites, cycles, or a chunk
    /// queued on a robot other than the one it names.
    pub fn validate(&self) -> Result<()> {
        for (owner, robot) in self.robots.iter().enumerate() {
            for chunk in &robot.chunks {
                if chunk.robot != owner {
                    return Err(ChunkerError::RobotMismatch {
                        chunk: chunk.number,
                        named: chunk.robot,
                        owner,
                    });
                }
            }
        }
        self.graph()?.validate()
    }

    /// Reorder every robot's queue to follow one global topological order.
    ///
    /// A robot then never waits on a chunk behind it in its own queue, and
    /// no set of robots can wait on each other.
    pub fn order_queues(&mut self) -> Result<()> {
        let order = self.graph()?.topological_order()?;
        let rank: HashMap<usize, usize> = order.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        for robot in &mut self.robots {
            robot
                .chunks
                .sort_by_key(|c| rank.get(&c.number).copied().unwrap_or(usize::MAX));
        }
        Ok(())
    }

    /// Chunk numbers per robot in queue order.
    pub fn machine_chunks(&self) -> Vec<Vec<usize>> {
        self.robots
            .iter()
            .map(|r| r.chunks.iter().map(|c| c.number).collect())
            .collect()
    }

    /// Prerequisites per chunk.
    pub fn dependencies(&self) -> BTreeMap<usize, Vec<usize>> {
        self.chunks()
            .map(|c| (c.number, c.dependencies.clone()))
            .collect()
    }

    /// Placeholder location per empty chunk.
    pub fn empty_chunks(&self) -> BTreeMap<usize, Point3> {
        self.chunks()
            .filter_map(|c| c.placeholder().map(|p| (c.number, p)))
            .collect()
    }

    /// Layer index → top Z.
    pub fn layer_information(&self) -> BTreeMap<usize, f64> {
        self.layer_tops.iter().copied().enumerate().collect()
    }

    /// Alignment features per chunk, for chunks that have any.
    pub fn alignment_features(&self) -> BTreeMap<usize, Vec<AlignmentFeature>> {
        self.chunks()
            .filter(|c| !c.alignment.is_empty())
            .map(|c| (c.number, c.alignment.clone()))
            .collect()
    }

    /// Number of vertical layers.
    pub fn layer_count(&self) -> usize {
        self.layer_tops.len()
    }
}
