//! Chunk dependency graph.

use std::collections::{BTreeMap, BTreeSet};

use crate::chunk::Chunk;
use crate::error::{ChunkerError, Result};

/// Chunk number → prerequisites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    deps: BTreeMap<usize, Vec<usize>>,
}

impl DependencyGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph of `chunks`, failing on a repeated chunk number.
    pub fn from_chunks<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> Result<Self> {
        let mut graph = Self::new();
        for chunk in chunks {
            graph.insert(chunk.number, chunk.dependencies.clone())?;
        }
        Ok(graph)
    }

    /// Add a node.
    pub fn insert(&mut self, number: usize, dependencies: Vec<usize>) -> Result<()> {
        if self.deps.contains_key(&number) {
            return Err(ChunkerError::DuplicateChunk(number));
        }
        self.deps.insert(number, dependencies);
        Ok(())
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.deps.len()
    }

    /// Whether the graph has no chunks.
    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    /// Prerequisites of `number`.
    pub fn prerequisites(&self, number: usize) -> Option<&[usize]> {
        self.deps.get(&number).map(Vec::as_slice)
    }

    /// Iterate `(chunk, prerequisites)` in chunk order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.deps.iter().map(|(&n, d)| (n, d.as_slice()))
    }

    /// Check that every prerequisite exists and there is no cycle.
    pub fn validate(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// Kahn order, lowest ready chunk number first.
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        let mut indegree: BTreeMap<usize, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (&n, deps) in &self.deps {
            let unique: BTreeSet<usize> = deps.iter().copied().collect();
            for &d in &unique {
                if !self.deps.contains_key(&d) {
                    return Err(ChunkerError::MissingDependency {
                        chunk: n,
                        dependency: d,
                    });
                }
                dependents.entry(d).or_default().push(n);
            }
            indegree.insert(n, unique.len());
        }

        let mut ready: BTreeSet<usize> = indegree
            .iter()
            .filter(|(_, &k)| k == 0)
            .map(|(&n, _)| n)
            .collect();
        let mut order = Vec::with_capacity(self.deps.len());
        while let Some(n) = ready.pop_first() {
            order.push(n);
            for &m in dependents.get(&n).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(k) = indegree.get_mut(&m) {
                    *k -= 1;
                    if *k == 0 {
                        ready.insert(m);
                    }
                }
            }
        }

        if order.len() < self.deps.len() {
            let placed: BTreeSet<usize> = order.iter().copied().collect();
            let stuck = self.deps.keys().filter(|n| !placed.contains(n)).copied().collect();
            return Err(ChunkerError::DependencyCycle(stuck));
        }
        Ok(order)
    }
}
