//! Critical-path estimate of a schedule's length.

use std::collections::{BTreeMap, HashMap};

use cobuild_chunker::{Chunk, Robot};

use crate::error::{Result, SimError};

/// Length of a schedule in frames, ignoring robot contention.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionEstimate {
    /// Frames until the last chunk finishes.
    pub frames: usize,
    /// Chunk ending the critical path.
    pub critical_chunk: Option<usize>,
    /// Earliest finishing frame per chunk.
    pub finish: BTreeMap<usize, usize>,
}

/// Estimate how many frames printing `robots` takes.
///
/// A chunk finishes `frame_data.len()` frames after the last of its
/// dependencies does. The estimate is the latest finish over all chunks.
pub fn estimate_execution_time(robots: &[Robot]) -> Result<ExecutionEstimate> {
    let network: HashMap<usize, &Chunk> = robots
        .iter()
        .flat_map(|r| r.chunks.iter())
        .map(|c| (c.number, c))
        .collect();

    let mut finish: HashMap<usize, usize> = HashMap::new();
    for &number in network.keys() {
        finish_time(number, &network, &mut finish)?;
    }

    let mut estimate = ExecutionEstimate {
        finish: finish.into_iter().collect(),
        ..ExecutionEstimate::default()
    };
    if let Some((&chunk, &frames)) = estimate.finish.iter().max_by_key(|&(_, &f)| f) {
        estimate.frames = frames;
        estimate.critical_chunk = Some(chunk);
    }
    Ok(estimate)
}

/// Finish time of `start`, memoized in `finish`.
///
/// Walks the dependencies with an explicit stack so deep chains do not
/// overflow.
fn finish_time(
    start: usize,
    network: &HashMap<usize, &Chunk>,
    finish: &mut HashMap<usize, usize>,
) -> Result<usize> {
    if let Some(&t) = finish.get(&start) {
        return Ok(t);
    }
    let mut stack = vec![(start, false)];
    let mut on_path: Vec<usize> = Vec::new();

    while let Some((number, expanded)) = stack.pop() {
        if finish.contains_key(&number) {
            continue;
        }
        let chunk = network[&number];
        if expanded {
            on_path.retain(|&n| n != number);
            let deps = chunk
                .dependencies
                .iter()
                .map(|d| finish.get(d).copied().unwrap_or(0))
                .max()
                .unwrap_or(0);
            finish.insert(number, chunk.frame_data.len() + deps);
            continue;
        }
        if on_path.contains(&number) {
            return Err(SimError::DependencyCycle { chunk: number });
        }
        on_path.push(number);
        stack.push((number, true));
        for &dep in &chunk.dependencies {
            if !network.contains_key(&dep) {
                return Err(SimError::MissingDependency {
                    chunk: number,
                    dependency: dep,
                });
            }
            if on_path.contains(&dep) {
                return Err(SimError::DependencyCycle { chunk: dep });
            }
            if !finish.contains_key(&dep) {
                stack.push((dep, false));
            }
        }
    }
    Ok(finish.get(&start).copied().unwrap_or(0))
}
