//! Lock-step scheduling of several robots over their chunk queues.
//!
//! Every tick each unfinished robot either advances one frame of its current
//! chunk or waits because a prerequisite chunk is not finished yet. Empty
//! chunks never wait. A robot that runs out of frames finishes the chunk and
//! moves on to the next one in its queue.

use std::collections::HashSet;

use cobuild_chunker::{Material, Robot};
use cobuild_kernel_math::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// What a robot did during the last tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotState {
    /// Moved on to the next frame of its chunk.
    Advancing,
    /// Blocked on an unfinished dependency.
    Waiting,
    /// Queue exhausted.
    Finished,
}

/// Position and heading of one robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    /// Robot id.
    pub number: usize,
    /// Tool location.
    pub location: Point3,
    /// Heading about Z (radians).
    pub rotation: f64,
}

impl MachineSnapshot {
    fn of(robot: &Robot) -> Self {
        Self {
            number: robot.number(),
            location: robot.last_location,
            rotation: robot.params.rotation,
        }
    }
}

/// All robots after one tick, and the material printed during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    /// One snapshot per robot, in robot order.
    pub machines: Vec<MachineSnapshot>,
    /// Material completed this tick.
    pub materials: Vec<Material>,
}

/// Result of a scheduling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationTrace {
    /// Robots before the first tick.
    pub start: Vec<MachineSnapshot>,
    /// One frame per tick.
    pub frames: Vec<TraceFrame>,
    /// Chunk numbers in completion order.
    pub finished_chunks: Vec<usize>,
}

impl SimulationTrace {
    /// Number of ticks.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

#[derive(Debug, Clone)]
struct Cursor {
    chunk: usize,
    datum: usize,
    state: RobotState,
}

/// Runs the robots' chunk queues against each other.
#[derive(Debug)]
pub struct Scheduler<'a> {
    robots: &'a mut [Robot],
    cursors: Vec<Cursor>,
    finished: HashSet<usize>,
    finished_chunks: Vec<usize>,
    tick: usize,
}

impl<'a> Scheduler<'a> {
    /// Park every robot at its home and point it at its first chunk.
    pub fn new(robots: &'a mut [Robot]) -> Self {
        let cursors = robots
            .iter_mut()
            .map(|robot| {
                robot.last_location = robot.home();
                Cursor {
                    chunk: 0,
                    datum: 0,
                    state: if robot.chunks.is_empty() {
                        RobotState::Finished
                    } else {
                        RobotState::Advancing
                    },
                }
            })
            .collect();
        Self {
            robots,
            cursors,
            finished: HashSet::new(),
            finished_chunks: Vec::new(),
            tick: 0,
        }
    }

    /// Schedule `robots` to completion.
    ///
    /// Chunk frames must already be generated. Fails with
    /// [`SimError::Deadlock`] as soon as a tick passes in which no robot
    /// advances while some robot still waits.
    #[tracing::instrument(skip_all, fields(robots = robots.len()))]
    pub fn run(robots: &mut [Robot]) -> Result<SimulationTrace> {
        let mut scheduler = Scheduler::new(robots);
        let start = scheduler.snapshot();
        let mut frames = Vec::new();
        while !scheduler.is_finished() {
            frames.push(scheduler.tick()?);
            if scheduler.tick % 100 == 0 {
                tracing::debug!(tick = scheduler.tick, "scheduling");
            }
        }
        tracing::info!(
            frames = frames.len(),
            chunks = scheduler.finished_chunks.len(),
            "schedule complete"
        );
        Ok(SimulationTrace {
            start,
            frames,
            finished_chunks: scheduler.finished_chunks,
        })
    }

    /// Whether every robot has worked through its queue.
    pub fn is_finished(&self) -> bool {
        self.cursors.iter().all(|c| c.state == RobotState::Finished)
    }

    /// State of each robot after the last tick.
    pub fn states(&self) -> Vec<RobotState> {
        self.cursors.iter().map(|c| c.state).collect()
    }

    /// Current position of every robot.
    pub fn snapshot(&self) -> Vec<MachineSnapshot> {
        self.robots.iter().map(MachineSnapshot::of).collect()
    }

    /// Advance every robot that can move by one frame.
    pub fn tick(&mut self) -> Result<TraceFrame> {
        self.tick += 1;
        let mut materials = Vec::new();
        let mut advanced = false;

        for (robot, cursor) in self.robots.iter_mut().zip(self.cursors.iter_mut()) {
            if cursor.state == RobotState::Finished {
                continue;
            }
            let Some(chunk) = robot.chunks.get(cursor.chunk) else {
                cursor.state = RobotState::Finished;
                continue;
            };
            let ready =
                chunk.is_empty() || chunk.dependencies.iter().all(|d| self.finished.contains(d));
            if !ready {
                cursor.state = RobotState::Waiting;
                continue;
            }
            cursor.state = RobotState::Advancing;
            advanced = true;
            cursor.datum += 1;

            if let Some(frame) = chunk.frame_data.get(cursor.datum) {
                robot.last_location = frame.location;
                materials.extend(frame.materials.iter().cloned());
                continue;
            }

            self.finished.insert(chunk.number);
            self.finished_chunks.push(chunk.number);
            tracing::debug!(
                robot = robot.params.number,
                chunk = chunk.number,
                tick = self.tick,
                "chunk finished"
            );
            cursor.chunk += 1;
            cursor.datum = 0;
            match robot.chunks.get(cursor.chunk) {
                None => cursor.state = RobotState::Finished,
                Some(next) if next.is_empty() => {
                    let target = next.frame_data.get(1).or_else(|| next.frame_data.first());
                    if let Some(frame) = target {
                        robot.last_location = frame.location;
                    }
                }
                Some(_) => {}
            }
        }

        if !advanced {
            let waiting: Vec<usize> = self
                .robots
                .iter()
                .zip(&self.cursors)
                .filter(|(_, c)| c.state == RobotState::Waiting)
                .filter_map(|(r, c)| r.chunks.get(c.chunk).map(|chunk| chunk.number))
                .collect();
            if !waiting.is_empty() {
                return Err(SimError::Deadlock {
                    tick: self.tick,
                    waiting,
                });
            }
        }

        Ok(TraceFrame {
            machines: self.snapshot(),
            materials,
        })
    }
}
